//! Protocol - 3 フェーズ・クロス isolate タスクプロトコル
//!
//! 呼び出し元 isolate の中で phase1 を同期実行してタスクと remote-handle
//! bundle を組み立て、呼び出しの種類に応じて 3 つの runner のどれかに
//! 渡します:
//!
//! - [`run_async`]: phase2 を対象のキューに積み、settle は finisher 経由
//! - [`run_ignored`]: 結果を誰も待たない縮退版
//! - [`run_sync`]: 呼び出しスレッド上で完結（デッドロック保護つき）
//!
//! phase2 は常に対象 isolate の中、phase3 は常に呼び出し元 isolate の中で
//! 実行され、pending result はちょうど 1 回 settle されます。

pub mod pending;
pub mod task;

mod callee_info;
mod ignored;
mod runner;
mod sync;

pub use self::pending::{PendingResult, ResultResolver, Settlement, pending_pair};
pub use self::sync::run_sync;
pub use self::task::{FnTask, ThreePhaseTask};

use crate::domain::LocalError;
use crate::isolate::{ContextScope, IsolateHolder};

use self::callee_info::CalleeInfo;
use self::ignored::Phase2RunnerIgnored;
use self::runner::Phase2Runner;

/// Start an asynchronous cross-isolate task.
///
/// phase1 runs here, synchronously; its error returns without scheduling
/// anything. After that the call cannot fail synchronously anymore: even a
/// target disposed before phase2 surfaces as a rejection of the returned
/// pending result, never as an error here.
pub fn run_async(
    task: impl ThreePhaseTask,
    scope: &ContextScope<'_>,
    target: &IsolateHolder,
) -> Result<PendingResult, LocalError> {
    let mut task: Box<dyn ThreePhaseTask> = Box::new(task);
    task.phase1(scope)?;

    let (resolver, pending) = pending_pair();
    let info = CalleeInfo::new(scope, resolver);
    let runner = Phase2Runner::new(task, info);
    // A refused schedule drops the runner, which delivers the orphan
    // rejection through the caller queue.
    target.schedule_task(Box::new(runner), false, false);
    Ok(pending)
}

/// Start a fire-and-forget cross-isolate task (no result, no phase3).
pub fn run_ignored(
    task: impl ThreePhaseTask,
    scope: &ContextScope<'_>,
    target: &IsolateHolder,
) -> Result<(), LocalError> {
    let mut task: Box<dyn ThreePhaseTask> = Box::new(task);
    task.phase1(scope)?;

    target.schedule_task(Box::new(Phase2RunnerIgnored::new(task)), false, false);
    Ok(())
}
