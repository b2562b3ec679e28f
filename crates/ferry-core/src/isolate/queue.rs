//! Task queue: two priority lanes plus close/drain semantics.
//!
//! Each isolate owns one of these. Secondary isolates have a dedicated
//! service thread blocking on [`TaskQueue::next`]; the primary isolate is
//! pumped from the thread that created the platform.
//!
//! Disposal contract:
//! - After `close()`, only units scheduled with `during_shutdown = true`
//!   still run; everything else is handed back to the servicer as a discard.
//! - Discarded units are *returned*, never dropped under the queue lock.
//!   Dropping a unit can schedule follow-up work (the orphan rejection), and
//!   that follow-up may target this very queue, so the drop must happen
//!   outside the lock.
//! - Once the queue is closed and empty it reports `Terminated`; from then
//!   on every push is refused.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use crate::isolate::environment::ContextScope;

/// A unit of work posted to an isolate's queue.
///
/// The queue takes exclusive ownership; once enqueued, the enqueuing code
/// must not touch the unit again. A unit that is discarded without running
/// observes that through its own `Drop`.
pub trait ScheduledUnit: Send + 'static {
    fn run(self: Box<Self>, scope: &ContextScope<'_>);
}

struct Entry {
    unit: Box<dyn ScheduledUnit>,
    during_shutdown: bool,
}

struct QueueState {
    normal: VecDeque<Entry>,
    low: VecDeque<Entry>,
    closed: bool,
    terminated: bool,
}

/// What the servicer should do next.
pub(crate) enum Step {
    /// Run this unit inside the isolate.
    Run(Box<dyn ScheduledUnit>),

    /// Disposal drain: drop `discards` (outside the queue lock), then run
    /// `run` if present.
    Drain {
        discards: Vec<Box<dyn ScheduledUnit>>,
        run: Option<Box<dyn ScheduledUnit>>,
    },

    /// Nothing arrived within the wait budget.
    Idle,

    /// Closed and empty; the servicer can stop.
    Terminated,
}

pub(crate) struct TaskQueue {
    state: Mutex<QueueState>,
    cv: Condvar,
}

impl TaskQueue {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                normal: VecDeque::new(),
                low: VecDeque::new(),
                closed: false,
                terminated: false,
            }),
            cv: Condvar::new(),
        }
    }

    /// Post a unit. `Err` hands the unit back when the queue refuses it
    /// (closed without `during_shutdown`, or already terminated); the caller
    /// drops it, which lets the unit's own teardown logic fire.
    pub(crate) fn push(
        &self,
        unit: Box<dyn ScheduledUnit>,
        low_priority: bool,
        during_shutdown: bool,
    ) -> Result<(), Box<dyn ScheduledUnit>> {
        {
            let mut st = self.state.lock().expect("task queue poisoned");
            if st.terminated || (st.closed && !during_shutdown) {
                return Err(unit);
            }
            let entry = Entry {
                unit,
                during_shutdown,
            };
            if low_priority {
                st.low.push_back(entry);
            } else {
                st.normal.push_back(entry);
            }
        }
        self.cv.notify_all();
        Ok(())
    }

    /// Wait for the next step. `wait = None` blocks until work or close;
    /// `wait = Some(d)` reports `Idle` after roughly `d` without work.
    pub(crate) fn next(&self, wait: Option<Duration>) -> Step {
        let mut st = self.state.lock().expect("task queue poisoned");
        loop {
            if st.closed {
                let mut discards = Vec::new();
                let mut run = None;
                while let Some(entry) = Self::pop(&mut st) {
                    if entry.during_shutdown {
                        run = Some(entry.unit);
                        break;
                    }
                    discards.push(entry.unit);
                }
                if run.is_none() && discards.is_empty() {
                    st.terminated = true;
                    return Step::Terminated;
                }
                return Step::Drain { discards, run };
            }

            if let Some(entry) = Self::pop(&mut st) {
                return Step::Run(entry.unit);
            }

            match wait {
                Some(timeout) => {
                    let (guard, result) = self
                        .cv
                        .wait_timeout(st, timeout)
                        .expect("task queue poisoned");
                    st = guard;
                    if result.timed_out() {
                        if st.closed {
                            continue;
                        }
                        if let Some(entry) = Self::pop(&mut st) {
                            return Step::Run(entry.unit);
                        }
                        return Step::Idle;
                    }
                }
                None => {
                    st = self.cv.wait(st).expect("task queue poisoned");
                }
            }
        }
    }

    fn pop(st: &mut QueueState) -> Option<Entry> {
        st.normal.pop_front().or_else(|| st.low.pop_front())
    }

    /// Stop accepting normal work and wake the servicer for the drain.
    pub(crate) fn close(&self) {
        {
            let mut st = self.state.lock().expect("task queue poisoned");
            st.closed = true;
        }
        self.cv.notify_all();
    }

    #[cfg(test)]
    fn is_terminated(&self) -> bool {
        self.state.lock().unwrap().terminated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Inert;

    impl ScheduledUnit for Inert {
        fn run(self: Box<Self>, _scope: &ContextScope<'_>) {}
    }

    /// Flags its cell when dropped; only scheduled where it never runs.
    struct DropProbe(Arc<AtomicBool>);

    impl ScheduledUnit for DropProbe {
        fn run(self: Box<Self>, _scope: &ContextScope<'_>) {}
    }

    impl Drop for DropProbe {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn normal_lane_runs_before_low_priority() {
        let q = TaskQueue::new();
        q.push(Box::new(Inert), true, false).ok().unwrap();
        q.push(Box::new(Inert), false, false).ok().unwrap();

        // two units ready, low lane must come second
        assert!(matches!(q.next(Some(Duration::from_millis(10))), Step::Run(_)));
        assert!(matches!(q.next(Some(Duration::from_millis(10))), Step::Run(_)));
        assert!(matches!(q.next(Some(Duration::from_millis(10))), Step::Idle));
    }

    #[test]
    fn close_discards_normal_units_and_keeps_shutdown_units() {
        let q = TaskQueue::new();
        let dropped = Arc::new(AtomicBool::new(false));

        q.push(Box::new(DropProbe(dropped.clone())), false, false)
            .ok()
            .unwrap();
        q.push(Box::new(Inert), false, true).ok().unwrap();
        q.close();

        match q.next(None) {
            Step::Drain { discards, run } => {
                assert_eq!(discards.len(), 1);
                assert!(run.is_some());
                drop(discards);
            }
            _ => panic!("expected drain step"),
        }
        assert!(dropped.load(Ordering::SeqCst));

        assert!(matches!(q.next(None), Step::Terminated));
        assert!(q.is_terminated());
    }

    #[test]
    fn push_after_close_requires_during_shutdown() {
        let q = TaskQueue::new();
        q.close();

        assert!(q.push(Box::new(Inert), false, false).is_err());
        assert!(q.push(Box::new(Inert), false, true).is_ok());
    }

    #[test]
    fn push_after_termination_is_refused() {
        let q = TaskQueue::new();
        q.close();
        assert!(matches!(q.next(None), Step::Terminated));

        assert!(q.push(Box::new(Inert), false, true).is_err());
    }
}
