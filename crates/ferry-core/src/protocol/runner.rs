//! Phase2Runner - 非同期パスの状態機械
//!
//! 対象 isolate のキュー上で phase2 を走らせ、成功・失敗いずれかの
//! finisher を呼び出し元 isolate のキューへ送り返します。finisher の
//! スケジュールは low_priority = false / during_shutdown = true で行います。
//! settle を運ぶタスクは呼び出し元が teardown 中でも走らなければならない
//! ためです。
//!
//! 終端は 3 つ、どれも pending result をちょうど 1 回 settle します:
//!
//! 1. phase2 成功 → success finisher が phase3 を実行して resolve
//!    （phase3 が投げたら呼び出し時点のスタックを付けて reject）
//! 2. phase2 失敗 → エラーを external copy にして failure finisher が
//!    呼び出し元で materialize し、スタックを連結して reject
//! 3. runner が一度も走らずに破棄された（対象 isolate の disposal）→
//!    orphan finisher が "Isolate is disposed" で reject
//!
//! `did_run` は phase2 の実行**前**に立てます。phase2 の最中に disposal が
//! 起きても orphan パスは発火しません。orphan は phase2 が始まらなかった
//! 場合だけのものです。

use crate::domain::{LocalError, PortableError};
use crate::isolate::{ContextScope, IsolateHolder, ScheduledUnit};
use crate::protocol::callee_info::CalleeInfo;
use crate::protocol::task::ThreePhaseTask;

const DISPOSED: &str = "Isolate is disposed";
const UNKNOWN: &str = "An exception was thrown but could not be copied between isolates";

/// Send a finisher home. Refusal drops the finisher, which drops the
/// resolver, which the caller observes as a dropped pending result.
fn schedule_finisher(holder: &IsolateHolder, finisher: Box<dyn ScheduledUnit>) {
    holder.schedule_task(finisher, false, true);
}

/// Runs phase2 inside the target isolate.
pub(crate) struct Phase2Runner {
    task: Option<Box<dyn ThreePhaseTask>>,
    info: Option<CalleeInfo>,
    did_run: bool,
}

impl Phase2Runner {
    pub(crate) fn new(task: Box<dyn ThreePhaseTask>, info: CalleeInfo) -> Self {
        Self {
            task: Some(task),
            info: Some(info),
            did_run: false,
        }
    }
}

impl ScheduledUnit for Phase2Runner {
    fn run(mut self: Box<Self>, scope: &ContextScope<'_>) {
        self.did_run = true;
        let mut task = self.task.take().expect("phase2 runner reused");
        let info = self.info.take().expect("phase2 runner reused");

        match task.phase2(scope) {
            Ok(()) => {
                scope.task_epilogue();
                let holder = info.holder();
                schedule_finisher(&holder, Box::new(Phase3Success { task, info }));
            }
            Err(error) => {
                let error = scope.copier().copy_out_error(&error);
                let holder = info.holder();
                schedule_finisher(&holder, Box::new(Phase3Failure { _task: task, info, error }));
            }
        }
    }
}

impl Drop for Phase2Runner {
    fn drop(&mut self) {
        if self.did_run {
            return;
        }
        // The task never got to run. Schedule the rejection back in the
        // caller isolate instead of silently dropping the pending result.
        let (Some(task), Some(info)) = (self.task.take(), self.info.take()) else {
            return;
        };
        let holder = info.holder();
        schedule_finisher(&holder, Box::new(Phase3Orphan { _task: task, info }));
    }
}

/// Runs in the caller isolate when phase2 succeeded.
struct Phase3Success {
    task: Box<dyn ThreePhaseTask>,
    info: CalleeInfo,
}

impl ScheduledUnit for Phase3Success {
    fn run(self: Box<Self>, scope: &ContextScope<'_>) {
        let Phase3Success { task, mut info } = *self;
        // Revive the handles rooted in this isolate.
        let resolver = info.take_resolver(scope);
        let stack = info.stack(scope);
        let _callback = info.callback_scope();
        match task.phase3(scope) {
            Ok(value) => resolver.resolve(value),
            Err(mut error) => {
                error.attach_stack(&stack);
                resolver.reject(error);
            }
        }
        scope.run_microtasks();
    }
}

/// Runs in the caller isolate when phase2 threw.
struct Phase3Failure {
    _task: Box<dyn ThreePhaseTask>,
    info: CalleeInfo,
    error: Option<PortableError>,
}

impl ScheduledUnit for Phase3Failure {
    fn run(self: Box<Self>, scope: &ContextScope<'_>) {
        let Phase3Failure { _task, mut info, error } = *self;
        let resolver = info.take_resolver(scope);
        let stack = info.stack(scope);
        let _callback = info.callback_scope();
        let mut rejection = match error {
            Some(portable) => scope.copier().copy_in_error(&portable),
            None => LocalError::error(UNKNOWN),
        };
        rejection.chain_stack(&stack);
        resolver.reject(rejection);
        scope.run_microtasks();
    }
}

/// Runs in the caller isolate when the target was disposed before phase2.
struct Phase3Orphan {
    _task: Box<dyn ThreePhaseTask>,
    info: CalleeInfo,
}

impl ScheduledUnit for Phase3Orphan {
    fn run(self: Box<Self>, scope: &ContextScope<'_>) {
        let Phase3Orphan { _task, mut info } = *self;
        let resolver = info.take_resolver(scope);
        let stack = info.stack(scope);
        let _callback = info.callback_scope();
        let mut error = LocalError::error(DISPOSED);
        error.attach_stack(&stack);
        resolver.reject(error);
        scope.run_microtasks();
    }
}
