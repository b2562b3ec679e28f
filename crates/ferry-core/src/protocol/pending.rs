//! Pending result: the promise half of a cross-isolate call.
//!
//! [`pending_pair`] creates a resolver/result pair. The resolver travels to
//! wherever settlement happens (inside a finisher, in the caller isolate);
//! `resolve` and `reject` consume it, so a pending result settles exactly
//! once by construction. The receiving side either pumps the caller isolate
//! until settlement ([`PendingResult::wait_timeout`]) or awaits the result
//! when something else services the caller isolate's queue.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use tokio::sync::oneshot;

use crate::domain::{LocalError, LocalValue};
use crate::isolate::IsolateEnvironment;

/// The terminal outcome delivered to the caller.
pub type Settlement = Result<LocalValue, LocalError>;

const DROPPED: &str = "Pending result was dropped before settlement";

/// Create a linked resolver/result pair.
pub fn pending_pair() -> (ResultResolver, PendingResult) {
    let (tx, rx) = oneshot::channel();
    (ResultResolver { tx }, PendingResult { rx })
}

/// Settles the pending result. Consumed on use: settling twice is not
/// expressible.
pub struct ResultResolver {
    tx: oneshot::Sender<Settlement>,
}

impl ResultResolver {
    pub fn resolve(self, value: LocalValue) {
        let _ = self.tx.send(Ok(value));
    }

    pub fn reject(self, error: LocalError) {
        let _ = self.tx.send(Err(error));
    }
}

/// The caller's view of an in-flight cross-isolate task.
#[derive(Debug)]
pub struct PendingResult {
    rx: oneshot::Receiver<Settlement>,
}

impl PendingResult {
    /// Non-blocking check. `Some` at most once; a dropped resolver surfaces
    /// as a rejection.
    pub fn try_settle(&mut self) -> Option<Settlement> {
        match self.rx.try_recv() {
            Ok(settlement) => Some(settlement),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(LocalError::error(DROPPED))),
        }
    }

    /// Pump `caller` (the isolate whose queue delivers the finishers) until
    /// this result settles or `timeout` elapses.
    pub fn wait_timeout(
        mut self,
        caller: &Arc<IsolateEnvironment>,
        timeout: Duration,
    ) -> Option<Settlement> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(settlement) = self.try_settle() {
                return Some(settlement);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let budget = (deadline - now).min(Duration::from_millis(20));
            caller.pump(budget);
        }
    }
}

impl Future for PendingResult {
    type Output = Settlement;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        Pin::new(&mut this.rx)
            .poll(cx)
            .map(|result| result.unwrap_or_else(|_| Err(LocalError::error(DROPPED))))
    }
}
