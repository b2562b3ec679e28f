//! InvokeTask - 名前付き Operation を 3 フェーズタスクとして呼び出す
//!
//! 入力は呼び出し元で portable 形式にエンコードされ、phase2 で対象 isolate
//! の registry から Operation を引いて実行、出力は phase3 で呼び出し元の
//! 値として materialize されます。

use serde::Serialize;

use crate::domain::{LocalError, LocalValue, PortableValue};
use crate::isolate::{ContextScope, IsolateHolder};
use crate::protocol::{PendingResult, ThreePhaseTask, run_async, run_ignored, run_sync};
use crate::typed::codec::{CodecError, PayloadCodec};

/// A three-phase task that invokes a named operation in the target isolate.
pub struct InvokeTask {
    name: String,
    input: Option<PortableValue>,
    output: Option<PortableValue>,
}

impl InvokeTask {
    /// Encode `input` (in the caller) and prepare the invocation.
    pub fn new<In: Serialize>(name: &str, input: &In) -> Result<Self, CodecError> {
        Ok(Self {
            name: name.to_string(),
            input: Some(PayloadCodec::encode(input)?),
            output: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl ThreePhaseTask for InvokeTask {
    fn phase2(&mut self, scope: &ContextScope<'_>) -> Result<(), LocalError> {
        let input = self.input.take().expect("phase2 ran twice");
        let Some(op) = scope.operation(&self.name) else {
            return Err(LocalError::type_error(format!(
                "no remote operation named '{}'",
                self.name
            )));
        };
        self.output = Some(op.invoke(scope, &input)?);
        Ok(())
    }

    fn phase3(self: Box<Self>, scope: &ContextScope<'_>) -> Result<LocalValue, LocalError> {
        let Some(output) = self.output else {
            return Err(LocalError::error("operation produced no output"));
        };
        Ok(scope.copier().copy_in(&output, scope.isolate_id()))
    }
}

/// Invoke a named operation asynchronously.
pub fn invoke_async<In: Serialize>(
    name: &str,
    input: &In,
    scope: &ContextScope<'_>,
    target: &IsolateHolder,
) -> Result<PendingResult, LocalError> {
    let task = InvokeTask::new(name, input).map_err(|e| LocalError::type_error(e.to_string()))?;
    run_async(task, scope, target)
}

/// Invoke a named operation on the calling thread.
pub fn invoke_sync<In: Serialize>(
    name: &str,
    input: &In,
    scope: &ContextScope<'_>,
    target: &IsolateHolder,
) -> Result<LocalValue, LocalError> {
    let task = InvokeTask::new(name, input).map_err(|e| LocalError::type_error(e.to_string()))?;
    run_sync(task, scope, target)
}

/// Invoke a named operation, discarding the result.
pub fn invoke_ignored<In: Serialize>(
    name: &str,
    input: &In,
    scope: &ContextScope<'_>,
    target: &IsolateHolder,
) -> Result<(), LocalError> {
    let task = InvokeTask::new(name, input).map_err(|e| LocalError::type_error(e.to_string()))?;
    run_ignored(task, scope, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use serde::{Deserialize, Serialize};

    use crate::isolate::Platform;
    use crate::typed::registry::{OpRegistry, Operation};

    const WAIT: Duration = Duration::from_secs(5);

    #[derive(Debug, Serialize, Deserialize)]
    struct AddInput {
        a: i64,
        b: i64,
    }

    struct Add;

    impl Operation for Add {
        const NAME: &'static str = "math.add.v1";
        type Input = AddInput;
        type Output = i64;

        fn run(&self, _scope: &ContextScope<'_>, input: AddInput) -> Result<i64, LocalError> {
            Ok(input.a + input.b)
        }
    }

    struct Remember;

    impl Operation for Remember {
        const NAME: &'static str = "state.remember.v1";
        type Input = serde_json::Value;
        type Output = ();

        fn run(
            &self,
            scope: &ContextScope<'_>,
            input: serde_json::Value,
        ) -> Result<(), LocalError> {
            scope.global_set("remembered", input);
            Ok(())
        }
    }

    struct Refuse;

    impl Operation for Refuse {
        const NAME: &'static str = "always.refuse.v1";
        type Input = ();
        type Output = ();

        fn run(&self, _scope: &ContextScope<'_>, _input: ()) -> Result<(), LocalError> {
            Err(LocalError::range_error("refused"))
        }
    }

    fn ops() -> OpRegistry {
        let mut registry = OpRegistry::new();
        registry.register(Add).unwrap();
        registry.register(Remember).unwrap();
        registry.register(Refuse).unwrap();
        registry
    }

    #[test]
    fn invoke_async_resolves_with_the_operation_output() {
        let platform = Platform::new();
        let caller = platform.primary().get().unwrap();
        let worker = platform.spawn_isolate_with_ops("worker", ops()).unwrap();

        let pending = caller
            .enter(|scope| invoke_async(Add::NAME, &AddInput { a: 2, b: 3 }, scope, &worker))
            .unwrap();

        let value = pending.wait_timeout(&caller, WAIT).unwrap().unwrap();
        assert_eq!(value.peek(), &serde_json::json!(5));
        assert_eq!(value.home(), caller.id());
    }

    #[test]
    fn invoke_sync_returns_the_operation_output() {
        let platform = Platform::new();
        let caller = platform.primary().get().unwrap();
        let worker = platform.spawn_isolate_with_ops("worker", ops()).unwrap();

        let value = caller
            .enter(|scope| invoke_sync(Add::NAME, &AddInput { a: 20, b: 22 }, scope, &worker))
            .unwrap();
        assert_eq!(value.peek(), &serde_json::json!(42));
    }

    #[test]
    fn unknown_operation_rejects_with_a_type_error() {
        let platform = Platform::new();
        let caller = platform.primary().get().unwrap();
        let worker = platform.spawn_isolate("worker").unwrap();

        let pending = caller
            .enter(|scope| invoke_async("no.such.op.v1", &(), scope, &worker))
            .unwrap();

        let error = pending.wait_timeout(&caller, WAIT).unwrap().unwrap_err();
        assert_eq!(error.name(), "TypeError");
        assert!(error.message().contains("no.such.op.v1"));
    }

    #[test]
    fn operation_errors_cross_the_boundary_as_copies() {
        let platform = Platform::new();
        let caller = platform.primary().get().unwrap();
        let worker = platform.spawn_isolate_with_ops("worker", ops()).unwrap();

        let pending = caller
            .enter(|scope| invoke_async(Refuse::NAME, &(), scope, &worker))
            .unwrap();

        let error = pending.wait_timeout(&caller, WAIT).unwrap().unwrap_err();
        assert_eq!(error.name(), "RangeError");
        assert_eq!(error.message(), "refused");
        assert!(error.stack().unwrap().contains("default"));
    }

    #[test]
    fn invoke_ignored_still_runs_the_operation() {
        let platform = Platform::new();
        let caller = platform.primary().get().unwrap();
        let worker = platform.spawn_isolate_with_ops("worker", ops()).unwrap();

        caller
            .enter(|scope| invoke_ignored(Remember::NAME, &serde_json::json!("noted"), scope, &worker))
            .unwrap();

        // observe through a second, awaited invocation
        let pending = caller
            .enter(|scope| invoke_async(Add::NAME, &AddInput { a: 0, b: 0 }, scope, &worker))
            .unwrap();
        pending.wait_timeout(&caller, WAIT).unwrap().unwrap();

        let remembered = worker
            .get()
            .unwrap()
            .enter(|scope| scope.global_get("remembered"));
        assert_eq!(remembered, Some(serde_json::json!("noted")));
    }
}
