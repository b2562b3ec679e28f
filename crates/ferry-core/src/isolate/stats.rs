//! Per-isolate bookkeeping counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// A snapshot of one isolate's counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IsolateStats {
    /// Units accepted onto the task queue.
    pub scheduled: u64,

    /// Tasks that ran their epilogue (successful phase2 completions).
    pub completed: u64,

    /// Units discarded without running (disposal drain or refused push).
    pub discarded: u64,

    /// Microtasks executed.
    pub microtasks: u64,
}

/// Live counters; snapshot via [`StatsCells::snapshot`].
#[derive(Debug, Default)]
pub(crate) struct StatsCells {
    pub(crate) scheduled: AtomicU64,
    pub(crate) completed: AtomicU64,
    pub(crate) discarded: AtomicU64,
    pub(crate) microtasks: AtomicU64,
}

impl StatsCells {
    pub(crate) fn snapshot(&self) -> IsolateStats {
        IsolateStats {
            scheduled: self.scheduled.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            microtasks: self.microtasks.load(Ordering::Relaxed),
        }
    }
}
