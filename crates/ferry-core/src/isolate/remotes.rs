//! RemoteHandle - isolate に根を張る cross-thread 参照
//!
//! Isolate の中で作られた値を、スレッド境界を越えて持ち運ぶための opaque
//! handle です。handle 自体はどこへでも運べますが、中身に触れるのは home
//! isolate が current なときだけです。それ以外の場所での dereference は
//! 回復可能なエラーではなく、プログラミング契約違反（panic）です。

use crate::domain::IsolateId;
use crate::isolate::environment::ContextScope;

/// A durable reference to a value rooted in one isolate.
pub struct RemoteHandle<T: Send> {
    home: IsolateId,
    inner: T,
}

impl<T: Send> RemoteHandle<T> {
    /// Root `inner` in the isolate the scope is entered into.
    pub fn new(scope: &ContextScope<'_>, inner: T) -> Self {
        Self {
            home: scope.isolate_id(),
            inner,
        }
    }

    pub fn home(&self) -> IsolateId {
        self.home
    }

    /// Dereference inside the home isolate.
    ///
    /// # Panics
    /// Panics when the scope belongs to a different isolate.
    pub fn get(&self, scope: &ContextScope<'_>) -> &T {
        self.check(scope);
        &self.inner
    }

    /// Take the value back out, inside the home isolate.
    pub fn into_inner(self, scope: &ContextScope<'_>) -> T {
        self.check(scope);
        self.inner
    }

    fn check(&self, scope: &ContextScope<'_>) {
        assert!(
            scope.isolate_id() == self.home,
            "remote handle belonging to {} dereferenced inside {}",
            self.home,
            scope.isolate_id(),
        );
    }
}
