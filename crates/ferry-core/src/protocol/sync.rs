//! run_sync - 呼び出しスレッド上で完結する同期パス
//!
//! スケジューラを介さず、呼び出したスレッドをロック取得 + phase2 +（成功
//! 時）phase3 の間ブロックします。分岐は 3 つ:
//!
//! 1. 対象への参照が死んでいる → 即座に失敗（何も走らない）
//! 2. 対象 = 現在 entered している isolate → phase2 を直接実行
//!    （self-call shortcut。ロックもデッドロック検査もなし）
//! 3. 別の生きている isolate → まずデッドロック保護。primary thread 以外
//!    からの同期クロス呼び出しは拒否する。その後 executor lock を取り、
//!    再帰取得（このスレッドが既に対象のロックを保持）なら epilogue を
//!    スキップして phase2 を実行。phase2 が投げたら external copy 経由で
//!    呼び出し元に materialize し、新しく捕ったスタックを連結して throw。

use crate::domain::{LocalError, LocalValue, PortableError};
use crate::isolate::{ContextScope, IsolateHolder};
use crate::protocol::task::ThreePhaseTask;

const UNKNOWN: &str = "An exception was thrown but could not be copied between isolates";

/// Run the whole protocol on the calling thread.
///
/// The returned value is phase3's result; every error branch surfaces as a
/// returned `LocalError` in the caller isolate (the synchronous analogue of
/// a thrown exception).
pub fn run_sync(
    task: impl ThreePhaseTask,
    scope: &ContextScope<'_>,
    target: &IsolateHolder,
) -> Result<LocalValue, LocalError> {
    let mut task: Box<dyn ThreePhaseTask> = Box::new(task);
    task.phase1(scope)?;

    let Some(second) = target.get() else {
        return Err(LocalError::error("Isolated is disposed"));
    };

    if second.id() == scope.isolate_id() {
        // Shortcut when calling into the currently entered isolate. This
        // avoids the deadlock protection below.
        task.phase2(scope)?;
    } else {
        // Deadlock protection
        if !second.is_primary_thread() {
            return Err(LocalError::error(
                "Calling a synchronous ferry function from within an asynchronous ferry function is not allowed.",
            ));
        }

        // Run phase2 under the executor lock and externalize errors.
        // The stash is needed because the lock is still up inside the scope.
        let is_recursive = second.executor_lock().held_by_current_thread();
        let mut failure: Option<Option<PortableError>> = None;
        second.enter(|target_scope| match task.phase2(target_scope) {
            Ok(()) => {
                if !is_recursive {
                    target_scope.task_epilogue();
                }
            }
            Err(error) => {
                failure = Some(target_scope.copier().copy_out_error(&error));
            }
        });

        if let Some(portable) = failure {
            // Throw to the outer isolate.
            let mut error = match portable {
                Some(portable) => scope.copier().copy_in_error(&portable),
                None => LocalError::error(UNKNOWN),
            };
            error.chain_stack(&scope.capture_stack());
            return Err(error);
        }
    }

    // Final phase
    task.phase3(scope)
}
