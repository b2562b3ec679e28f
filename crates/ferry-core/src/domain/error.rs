//! Error model: context-local error objects and their portable copies.
//!
//! Errors follow the same two-family split as values: a [`LocalError`] is an
//! error object living in one isolate; a [`PortableError`] is its
//! context-independent copy, produced by the external-copy service before an
//! error crosses an isolate boundary and materialized back on the other side.
//!
//! Materialization always produces a *fresh* error instance: `identity` is a
//! per-instance ULID, so the thrown object's identity demonstrably never
//! crosses a boundary, only its content does.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use super::stack::StackTrace;
use super::value::PortableValue;

/// An error object belonging to one isolate.
///
/// Mirrors the usual runtime error shape: a `name` ("Error", "RangeError",
/// ...), a `message`, and an optional rendered `stack`. Thrown values that
/// are not error objects (a bare string, a number) are represented with
/// `object == false`; stack chaining is skipped for those.
#[derive(Debug, Clone)]
pub struct LocalError {
    name: String,
    message: String,
    stack: Option<String>,
    object: bool,
    identity: Ulid,
}

impl LocalError {
    fn make(name: impl Into<String>, message: impl Into<String>, object: bool) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            stack: None,
            object,
            identity: Ulid::new(),
        }
    }

    /// A generic error object.
    pub fn error(message: impl Into<String>) -> Self {
        Self::make("Error", message, true)
    }

    /// A range error object.
    pub fn range_error(message: impl Into<String>) -> Self {
        Self::make("RangeError", message, true)
    }

    /// A type error object.
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::make("TypeError", message, true)
    }

    /// A thrown value that is not an error object.
    pub fn thrown_value(value: PortableValue) -> Self {
        let rendered = value.json().to_string();
        Self::make("", rendered, false)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn stack(&self) -> Option<&str> {
        self.stack.as_deref()
    }

    /// Per-instance identity. Two materializations of the same portable copy
    /// compare unequal here.
    pub fn identity(&self) -> Ulid {
        self.identity
    }

    pub fn is_object(&self) -> bool {
        self.object
    }

    /// Replace the stack with the given snapshot (no-op for non-objects).
    ///
    /// Used when an error is raised in the caller isolate itself and the
    /// call-site snapshot *is* its stack.
    pub fn attach_stack(&mut self, trace: &StackTrace) {
        if !self.object || trace.is_empty() {
            return;
        }
        self.stack = Some(trace.render());
    }

    /// Append the snapshot below the existing stack (no-op for non-objects).
    ///
    /// Used when an error arrives from another isolate and the call-site
    /// snapshot extends whatever stack it already carries.
    pub fn chain_stack(&mut self, trace: &StackTrace) {
        if !self.object || trace.is_empty() {
            return;
        }
        self.stack = Some(match self.stack.take() {
            Some(existing) => format!("{existing}\n    {}", trace.render()),
            None => trace.render(),
        });
    }

    pub(crate) fn set_stack(&mut self, stack: Option<String>) {
        self.stack = stack;
    }
}

impl std::fmt::Display for LocalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.name.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.name, self.message)
        }
    }
}

impl std::error::Error for LocalError {}

/// The externalized form of a thrown value.
///
/// `Object` carries the fields of an error object; `Value` carries the
/// portable copy of a non-object throw. Only `Object` errors take part in
/// stack chaining.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum PortableError {
    Object {
        name: String,
        message: String,
        stack: Option<String>,
    },
    Value(PortableValue),
}

impl PortableError {
    /// Copy a local error's content out into the portable form.
    pub fn of(error: &LocalError) -> Self {
        if error.is_object() {
            PortableError::Object {
                name: error.name().to_string(),
                message: error.message().to_string(),
                stack: error.stack().map(str::to_string),
            }
        } else {
            PortableError::Value(PortableValue::new(
                serde_json::from_str(error.message())
                    .unwrap_or_else(|_| serde_json::Value::String(error.message().to_string())),
            ))
        }
    }

    /// Materialize a fresh local error from the portable form.
    pub fn to_local(&self) -> LocalError {
        match self {
            PortableError::Object { name, message, stack } => {
                let mut error = LocalError::make(name.clone(), message.clone(), true);
                error.set_stack(stack.clone());
                error
            }
            PortableError::Value(value) => LocalError::thrown_value(value.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(LocalError::error("boom"), "Error")]
    #[case(LocalError::range_error("bad"), "RangeError")]
    #[case(LocalError::type_error("nope"), "TypeError")]
    fn constructors_set_name(#[case] error: LocalError, #[case] name: &str) {
        assert_eq!(error.name(), name);
        assert!(error.is_object());
        assert!(error.stack().is_none());
    }

    #[test]
    fn display_includes_name_and_message() {
        let e = LocalError::range_error("bad");
        assert_eq!(e.to_string(), "RangeError: bad");
    }

    #[test]
    fn thrown_value_is_not_an_object() {
        let e = LocalError::thrown_value(PortableValue::new(serde_json::json!("oops")));
        assert!(!e.is_object());

        // chaining is a no-op for non-objects
        let mut e = e;
        e.chain_stack(&StackTrace::from_frames(vec!["at x".to_string()]));
        assert!(e.stack().is_none());
    }

    #[test]
    fn attach_replaces_and_chain_appends() {
        let site = StackTrace::from_frames(vec!["at caller (isolate-A)".to_string()]);

        let mut attached = LocalError::error("boom");
        attached.attach_stack(&site);
        assert_eq!(attached.stack(), Some("at caller (isolate-A)"));

        let mut chained = LocalError::error("boom");
        chained.set_stack(Some("at worker (isolate-B)".to_string()));
        chained.chain_stack(&site);
        let stack = chained.stack().unwrap();
        assert!(stack.starts_with("at worker (isolate-B)"));
        assert!(stack.contains("at caller (isolate-A)"));
    }

    #[test]
    fn materialized_copy_has_fresh_identity() {
        let original = LocalError::range_error("bad");
        let copy = PortableError::of(&original).to_local();

        assert_eq!(copy.name(), "RangeError");
        assert_eq!(copy.message(), "bad");
        assert_ne!(copy.identity(), original.identity());
    }

    #[test]
    fn portable_error_roundtrips_non_object_values() {
        let thrown = LocalError::thrown_value(PortableValue::new(serde_json::json!(42)));
        let back = PortableError::of(&thrown).to_local();
        assert!(!back.is_object());
        assert_eq!(back.message(), "42");
    }
}
