//! CalleeInfo - 呼び出し元へ帰るための remote-handle bundle
//!
//! スレッドホップを生き延びて、後で呼び出し元 isolate の中で revive される
//! 3 つの参照を束ねます: settle すべき resolver、呼び出し元への re-entry
//! handle（holder）、呼び出し時点のスタックスナップショット。
//!
//! 生成時に呼び出し元の async hooks から async 操作 ID を取得し、破棄時に
//! 解放します。primary isolate 以外では hooks が no-op なので、このブラケットは
//! 配線によって primary だけのものになります。

use std::sync::Arc;

use crate::domain::{AsyncOpId, StackTrace};
use crate::isolate::{ContextScope, IsolateHolder, RemoteHandle};
use crate::ports::{AsyncHooks, CallbackScope};
use crate::protocol::pending::ResultResolver;

/// The durable references rooted in the caller isolate.
struct Remotes {
    holder: IsolateHolder,
    resolver: Option<RemoteHandle<ResultResolver>>,
    stack: RemoteHandle<StackTrace>,
}

/// Everything a finisher needs to settle the pending result back home.
///
/// Owned exclusively by the active runner and transferred together with the
/// task descriptor.
pub(crate) struct CalleeInfo {
    remotes: Remotes,
    hooks: Arc<dyn AsyncHooks>,
    async_op: Option<AsyncOpId>,
}

impl CalleeInfo {
    /// Build in the caller isolate: capture the stack, root the resolver,
    /// and open the async-operation bracket.
    pub(crate) fn new(scope: &ContextScope<'_>, resolver: ResultResolver) -> Self {
        let hooks = scope.hooks();
        let async_op = hooks.init();
        Self {
            remotes: Remotes {
                holder: scope.holder(),
                resolver: Some(RemoteHandle::new(scope, resolver)),
                stack: RemoteHandle::new(scope, scope.capture_stack()),
            },
            hooks,
            async_op,
        }
    }

    /// The re-entry handle for the caller isolate.
    pub(crate) fn holder(&self) -> IsolateHolder {
        self.remotes.holder.clone()
    }

    /// Revive the resolver; valid only inside the caller isolate.
    pub(crate) fn take_resolver(&mut self, scope: &ContextScope<'_>) -> ResultResolver {
        self.remotes
            .resolver
            .take()
            .expect("pending result already taken")
            .into_inner(scope)
    }

    /// The call-site snapshot; valid only inside the caller isolate.
    pub(crate) fn stack(&self, scope: &ContextScope<'_>) -> StackTrace {
        self.remotes.stack.get(scope).clone()
    }

    /// Open the re-entry helper around the body that settles the pending
    /// result. Open it after the error handling is in place, not before.
    pub(crate) fn callback_scope(&self) -> CallbackScope<'_> {
        CallbackScope::open(self.hooks.as_ref(), self.async_op)
    }
}

impl Drop for CalleeInfo {
    fn drop(&mut self) {
        if let Some(id) = self.async_op.take() {
            self.hooks.destroy(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isolate::Platform;
    use crate::ports::{HookEventKind, RecordingHooks, SystemClock};
    use crate::protocol::pending::pending_pair;

    #[test]
    fn brackets_an_async_operation_on_the_primary_isolate() {
        let hooks = Arc::new(RecordingHooks::new(SystemClock));
        let platform = Platform::builder().hooks(hooks.clone()).build();
        let env = platform.primary().get().unwrap();

        let (resolver, _pending) = pending_pair();
        let info = env.enter(|scope| CalleeInfo::new(scope, resolver));
        drop(info);

        let kinds: Vec<_> = hooks.events().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![HookEventKind::Init, HookEventKind::Destroy]);
    }

    #[test]
    fn secondary_isolates_skip_instrumentation() {
        let hooks = Arc::new(RecordingHooks::new(SystemClock));
        let platform = Platform::builder().hooks(hooks.clone()).build();
        let worker = platform.spawn_isolate("worker").unwrap().get().unwrap();

        let (resolver, _pending) = pending_pair();
        let info = worker.enter(|scope| CalleeInfo::new(scope, resolver));
        drop(info);

        // the recording hooks are wired to the primary isolate only
        assert!(hooks.events().is_empty());
    }

    #[test]
    fn resolver_revives_only_in_the_caller_isolate() {
        let platform = Platform::new();
        let env = platform.primary().get().unwrap();

        let (resolver, mut pending) = pending_pair();
        let mut info = env.enter(|scope| CalleeInfo::new(scope, resolver));

        let resolver = env.enter(|scope| info.take_resolver(scope));
        env.enter(|scope| resolver.resolve(scope.local_value(serde_json::json!(1))));
        assert!(pending.try_settle().unwrap().is_ok());
    }
}
