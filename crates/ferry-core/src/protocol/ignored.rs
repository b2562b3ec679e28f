//! Phase2RunnerIgnored - fire-and-forget 縮退版
//!
//! 誰も結果を待っていない操作のための runner。pending result も
//! CalleeInfo も phase3 もありません。phase2 のエラーは捨てます。成功時の
//! task epilogue だけは非同期パスと同じように走ります。

use crate::isolate::{ContextScope, ScheduledUnit};
use crate::protocol::task::ThreePhaseTask;

pub(crate) struct Phase2RunnerIgnored {
    task: Box<dyn ThreePhaseTask>,
}

impl Phase2RunnerIgnored {
    pub(crate) fn new(task: Box<dyn ThreePhaseTask>) -> Self {
        Self { task }
    }
}

impl ScheduledUnit for Phase2RunnerIgnored {
    fn run(self: Box<Self>, scope: &ContextScope<'_>) {
        let mut task = self.task;
        if task.phase2(scope).is_ok() {
            scope.task_epilogue();
        }
    }
}
