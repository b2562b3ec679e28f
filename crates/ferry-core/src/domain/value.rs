//! Value model: context-local values and their portable copies.
//!
//! This module is architecture-agnostic: it does not assume queues, threads,
//! or any particular isolate implementation. It only defines the "shape" of
//! the two value families the protocol moves around:
//!
//! - [`PortableValue`] is context-independent. It may be carried across
//!   threads and isolate boundaries freely and is the only form in which
//!   data ever crosses an isolate boundary.
//! - [`LocalValue`] belongs to exactly one isolate (its *home*). It is the
//!   form values take while an isolate is working with them. Opening a local
//!   value inside the wrong isolate is a programming error, not a recoverable
//!   condition.

use serde::{Deserialize, Serialize};

use super::ids::IsolateId;

/// A context-independent deep copy of a value.
///
/// Produced by the external-copy service when a value needs to leave its
/// isolate. Internally this is JSON; richer representations would slot in
/// behind the same type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortableValue(serde_json::Value);

impl PortableValue {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn json(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn into_json(self) -> serde_json::Value {
        self.0
    }
}

impl From<serde_json::Value> for PortableValue {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

/// A value owned by one isolate.
///
/// `home` records which isolate the value belongs to. [`LocalValue::open_in`]
/// is the checked accessor used while executing inside an isolate;
/// [`LocalValue::peek`] allows read-only inspection from anywhere (tests,
/// diagnostics). Mutation and transport always go through the external-copy
/// service, never through this type.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalValue {
    home: IsolateId,
    value: serde_json::Value,
}

impl LocalValue {
    pub fn new(home: IsolateId, value: serde_json::Value) -> Self {
        Self { home, value }
    }

    /// The isolate this value belongs to.
    pub fn home(&self) -> IsolateId {
        self.home
    }

    /// Checked access: valid only inside the home isolate.
    ///
    /// # Panics
    /// Panics when `at` is not the home isolate. That situation is a bug in
    /// the caller (a value leaked across an isolate boundary by reference).
    pub fn open_in(&self, at: IsolateId) -> &serde_json::Value {
        assert!(
            at == self.home,
            "local value belonging to {} opened inside {}",
            self.home,
            at,
        );
        &self.value
    }

    /// Read-only inspection without a home check.
    pub fn peek(&self) -> &serde_json::Value {
        &self.value
    }
}
