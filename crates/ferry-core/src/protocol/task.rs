//! ThreePhaseTask - クロス isolate 操作の 3 フェーズ契約
//!
//! 1 回のクロス isolate 呼び出し = 1 つのタスク。タスクは常にどれか 1 つの
//! runner が排他的に所有し、フェーズ間で所有権ごと受け渡されます。
//!
//! - `phase1`: 呼び出し元 isolate で同期実行（セットアップ）。失敗は
//!   呼び出し元へ同期的に伝播し、何もスケジュールされない。
//! - `phase2`: 対象 isolate の中で実行。対象から見れば同期。
//! - `phase3`: 呼び出し元 isolate に戻って同期実行し、最終結果を生む。
//!   `self: Box<Self>` を消費するので、タスクは finalization の後に
//!   構造的に破棄される。

use crate::domain::{LocalError, LocalValue};
use crate::isolate::ContextScope;

/// The three-phase contract implemented once per concrete operation.
pub trait ThreePhaseTask: Send + 'static {
    /// Setup, in the caller isolate. Defaults to a no-op.
    fn phase1(&mut self, scope: &ContextScope<'_>) -> Result<(), LocalError> {
        let _ = scope;
        Ok(())
    }

    /// The work, inside the target isolate.
    fn phase2(&mut self, scope: &ContextScope<'_>) -> Result<(), LocalError>;

    /// Finalization, back in the caller isolate; produces the result value.
    fn phase3(self: Box<Self>, scope: &ContextScope<'_>) -> Result<LocalValue, LocalError>;
}

type SetupFn = Box<dyn FnOnce(&ContextScope<'_>) -> Result<(), LocalError> + Send>;
type WorkFn = Box<dyn FnOnce(&ContextScope<'_>) -> Result<(), LocalError> + Send>;
type FinishFn = Box<dyn FnOnce(&ContextScope<'_>) -> Result<LocalValue, LocalError> + Send>;

/// A task assembled from closures.
///
/// 小さな呼び出しやテストのための形。フェーズ間で状態を受け渡したい場合は
/// `Arc<Mutex<...>>` を両方のクロージャに move する。
///
/// # 使用例
/// ```ignore
/// let task = FnTask::new(|scope| {
///     scope.global_set("warmed_up", serde_json::json!(true));
///     Ok(())
/// })
/// .with_finish(|scope| Ok(scope.local_value(serde_json::json!("done"))));
/// ```
pub struct FnTask {
    setup: Option<SetupFn>,
    work: Option<WorkFn>,
    finish: Option<FinishFn>,
}

impl FnTask {
    /// A task whose phase2 runs `work`.
    pub fn new(
        work: impl FnOnce(&ContextScope<'_>) -> Result<(), LocalError> + Send + 'static,
    ) -> Self {
        Self {
            setup: None,
            work: Some(Box::new(work)),
            finish: None,
        }
    }

    pub fn with_setup(
        mut self,
        setup: impl FnOnce(&ContextScope<'_>) -> Result<(), LocalError> + Send + 'static,
    ) -> Self {
        self.setup = Some(Box::new(setup));
        self
    }

    /// Phase3 body. Without one, the task finalizes to a null value.
    pub fn with_finish(
        mut self,
        finish: impl FnOnce(&ContextScope<'_>) -> Result<LocalValue, LocalError> + Send + 'static,
    ) -> Self {
        self.finish = Some(Box::new(finish));
        self
    }
}

impl ThreePhaseTask for FnTask {
    fn phase1(&mut self, scope: &ContextScope<'_>) -> Result<(), LocalError> {
        match self.setup.take() {
            Some(setup) => setup(scope),
            None => Ok(()),
        }
    }

    fn phase2(&mut self, scope: &ContextScope<'_>) -> Result<(), LocalError> {
        let work = self.work.take().expect("phase2 ran twice");
        work(scope)
    }

    fn phase3(mut self: Box<Self>, scope: &ContextScope<'_>) -> Result<LocalValue, LocalError> {
        match self.finish.take() {
            Some(finish) => finish(scope),
            None => Ok(scope.local_value(serde_json::Value::Null)),
        }
    }
}
