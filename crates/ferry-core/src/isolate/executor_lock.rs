//! Executor lock: exclusive, recursion-aware entry into an isolate.
//!
//! Entering an isolate from an arbitrary thread requires exclusive
//! possession of it. The lock is re-entrant-aware: the thread that already
//! holds it may acquire it again without deadlocking itself (the guard then
//! reports the acquisition as recursive), while a different thread waits.
//!
//! The synchronous call path uses [`ExecutorLock::held_by_current_thread`]
//! *before* locking to decide whether a cross-isolate call is a recursive
//! one (recursive acquisitions skip the task epilogue).

use std::sync::{Condvar, Mutex};
use std::thread::{self, ThreadId};

struct LockState {
    owner: Option<ThreadId>,
    depth: u32,
}

pub(crate) struct ExecutorLock {
    state: Mutex<LockState>,
    cv: Condvar,
}

impl ExecutorLock {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(LockState {
                owner: None,
                depth: 0,
            }),
            cv: Condvar::new(),
        }
    }

    /// Acquire the lock, blocking if another thread holds it.
    pub(crate) fn lock(&self) -> ExecutorGuard<'_> {
        let me = thread::current().id();
        let mut st = self.state.lock().expect("executor lock poisoned");
        if st.owner == Some(me) {
            st.depth += 1;
            return ExecutorGuard {
                lock: self,
                recursive: true,
            };
        }
        while st.owner.is_some() {
            st = self.cv.wait(st).expect("executor lock poisoned");
        }
        st.owner = Some(me);
        st.depth = 1;
        ExecutorGuard {
            lock: self,
            recursive: false,
        }
    }

    pub(crate) fn held_by_current_thread(&self) -> bool {
        let st = self.state.lock().expect("executor lock poisoned");
        st.owner == Some(thread::current().id())
    }
}

pub(crate) struct ExecutorGuard<'a> {
    lock: &'a ExecutorLock,
    recursive: bool,
}

impl ExecutorGuard<'_> {
    #[cfg(test)]
    pub(crate) fn is_recursive(&self) -> bool {
        self.recursive
    }
}

impl Drop for ExecutorGuard<'_> {
    fn drop(&mut self) {
        let mut st = self.lock.state.lock().expect("executor lock poisoned");
        st.depth -= 1;
        if st.depth == 0 {
            st.owner = None;
            drop(st);
            self.lock.cv.notify_one();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::mpsc;

    #[test]
    fn same_thread_recursion_does_not_deadlock() {
        let lock = ExecutorLock::new();

        let outer = lock.lock();
        assert!(!outer.is_recursive());
        assert!(lock.held_by_current_thread());

        let inner = lock.lock();
        assert!(inner.is_recursive());

        drop(inner);
        assert!(lock.held_by_current_thread());

        drop(outer);
        assert!(!lock.held_by_current_thread());
    }

    #[test]
    fn other_thread_waits_for_release() {
        let lock = Arc::new(ExecutorLock::new());
        let (tx, rx) = mpsc::channel::<&'static str>();

        let guard = lock.lock();

        let worker = {
            let lock = Arc::clone(&lock);
            let tx = tx.clone();
            std::thread::spawn(move || {
                tx.send("waiting").unwrap();
                let _guard = lock.lock();
                tx.send("acquired").unwrap();
            })
        };

        assert_eq!(rx.recv().unwrap(), "waiting");
        // worker must not acquire while we hold the lock
        assert!(
            rx.recv_timeout(std::time::Duration::from_millis(100))
                .is_err()
        );

        drop(guard);
        assert_eq!(rx.recv().unwrap(), "acquired");
        worker.join().unwrap();
    }
}
