//! IsolateHolder - isolate への weak で revivable な参照
//!
//! Holder は ownership edge ではありません。`get()` は isolate が既に
//! disposed なら `None` を返します。スケジューリングだけは disposed 後も
//! `during_shutdown` 付きのユニットに限って通ります（約束の settle を
//! teardown 中にも届けるため）。

use std::sync::{Arc, Mutex};

use crate::domain::IsolateId;
use crate::isolate::environment::IsolateEnvironment;
use crate::isolate::queue::ScheduledUnit;

pub(crate) struct HolderInner {
    id: IsolateId,
    env: Mutex<Option<Arc<IsolateEnvironment>>>,
}

/// A clone-able, cross-thread handle to one isolate.
#[derive(Clone)]
pub struct IsolateHolder {
    inner: Arc<HolderInner>,
}

impl IsolateHolder {
    pub(crate) fn new(env: Arc<IsolateEnvironment>) -> Self {
        let inner = Arc::new(HolderInner {
            id: env.id(),
            env: Mutex::new(Some(Arc::clone(&env))),
        });
        env.attach_holder(Arc::downgrade(&inner));
        Self { inner }
    }

    pub(crate) fn from_inner(inner: Arc<HolderInner>) -> Self {
        Self { inner }
    }

    pub fn id(&self) -> IsolateId {
        self.inner.id
    }

    /// A live reference, or `None` once the isolate is disposed.
    pub fn get(&self) -> Option<Arc<IsolateEnvironment>> {
        self.raw().filter(|env| !env.is_disposed())
    }

    /// The environment regardless of disposal state. Scheduling goes through
    /// this so that `during_shutdown` units still reach a draining queue.
    fn raw(&self) -> Option<Arc<IsolateEnvironment>> {
        self.inner.env.lock().expect("holder poisoned").clone()
    }

    /// Post a unit onto the isolate's queue.
    ///
    /// Returns `false` when the unit was not accepted; the unit is dropped
    /// here, which is what lets a discarded runner deliver its orphan
    /// rejection.
    pub fn schedule_task(
        &self,
        unit: Box<dyn ScheduledUnit>,
        low_priority: bool,
        during_shutdown: bool,
    ) -> bool {
        let Some(env) = self.raw() else {
            drop(unit);
            return false;
        };
        match env.queue().push(unit, low_priority, during_shutdown) {
            Ok(()) => {
                env.stats_cells()
                    .scheduled
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                true
            }
            Err(refused) => {
                drop(refused);
                env.stats_cells()
                    .discarded
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                false
            }
        }
    }

    /// Dispose the isolate: `get()` starts returning `None`, the queue stops
    /// accepting normal work, and the servicer drains what is left. Queued
    /// units that never ran observe this through their `Drop`. Idempotent.
    pub fn dispose(&self) {
        if let Some(env) = self.raw() {
            env.mark_disposed();
            env.queue().close();
        }
    }
}
