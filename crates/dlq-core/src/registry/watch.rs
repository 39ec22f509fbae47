//! Subscriber handles for per-task and aggregate status.

use tokio::sync::watch;

use crate::aggregate::AggregateStatus;
use crate::task::TaskState;

/// Stream of one key's states. Starts at the state current at subscription
/// and follows every later change; a removed key reads as `NotStarted`, and a
/// re-enqueued key continues on the same stream.
#[derive(Debug, Clone)]
pub struct StatusWatch {
    rx: watch::Receiver<TaskState>,
}

impl StatusWatch {
    pub(super) fn new(rx: watch::Receiver<TaskState>) -> Self {
        Self { rx }
    }

    pub fn current(&self) -> TaskState {
        *self.rx.borrow()
    }

    /// Wait for the next change. Returns `None` once the registry is gone.
    /// Intermediate values may be skipped if the subscriber falls behind.
    pub async fn changed(&mut self) -> Option<TaskState> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }

    /// Wait until the state satisfies `f` (checked against the current value first).
    pub async fn wait_for(&mut self, mut f: impl FnMut(TaskState) -> bool) -> Option<TaskState> {
        let state = self.rx.wait_for(|s| f(*s)).await.ok()?;
        Some(*state)
    }
}

/// Stream of aggregate snapshots, recomputed on every registry mutation.
#[derive(Debug, Clone)]
pub struct AggregateWatch {
    rx: watch::Receiver<AggregateStatus>,
}

impl AggregateWatch {
    pub(super) fn new(rx: watch::Receiver<AggregateStatus>) -> Self {
        Self { rx }
    }

    pub fn current(&self) -> AggregateStatus {
        *self.rx.borrow()
    }

    /// Wait for the next change. Returns `None` once the registry is gone.
    pub async fn changed(&mut self) -> Option<AggregateStatus> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }

    /// Wait until every tracked task succeeded (`succeeded == total`).
    ///
    /// Stopping here is the observer's choice; the stream itself keeps going.
    pub async fn wait_until_complete(&mut self) -> Option<AggregateStatus> {
        let status = self.rx.wait_for(|s| s.is_complete()).await.ok()?;
        Some(*status)
    }
}
