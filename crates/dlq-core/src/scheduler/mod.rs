//! Task scheduler.
//!
//! Accepts enqueue/cancel commands, admits at most one live task per key,
//! runs each task behind the shared admission gate, and exposes per-key and
//! aggregate status streams backed by the registry.

mod execute;
mod progress;

use std::sync::Arc;

use tracing::Instrument;

use crate::aggregate::AggregateStatus;
use crate::config::DlqConfig;
use crate::control::{CancelRequest, TaskControl};
use crate::gate::AdmissionGate;
use crate::registry::{AggregateWatch, StatusWatch, TaskRegistry};
use crate::task::{TaskKey, TaskState};
use crate::work::{SimulatedTransfer, WorkUnit};

use execute::TaskContext;

pub use progress::ProgressReporter;

/// Admission-controlled scheduler for unique-keyed tasks. Cheap to clone;
/// clones share the same registry, gate and tasks.
pub struct Scheduler<W: WorkUnit = SimulatedTransfer> {
    registry: Arc<TaskRegistry>,
    gate: Arc<AdmissionGate>,
    control: Arc<TaskControl>,
    work: Arc<W>,
}

impl<W: WorkUnit> Clone for Scheduler<W> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            gate: Arc::clone(&self.gate),
            control: Arc::clone(&self.control),
            work: Arc::clone(&self.work),
        }
    }
}

impl Scheduler<SimulatedTransfer> {
    /// Scheduler running simulated transfers sized from `cfg`.
    pub fn from_config(cfg: &DlqConfig) -> Self {
        Self::with_work(cfg.max_concurrent_tasks, SimulatedTransfer::from_config(cfg))
    }
}

impl<W: WorkUnit> Scheduler<W> {
    /// Scheduler with `capacity` gate slots running `work` for every task.
    pub fn with_work(capacity: usize, work: W) -> Self {
        Self {
            registry: Arc::new(TaskRegistry::new()),
            gate: Arc::new(AdmissionGate::new(capacity)),
            control: Arc::new(TaskControl::new()),
            work: Arc::new(work),
        }
    }

    /// Start a task for `key` unless one is already live (then this is a
    /// no-op). Returns true if a new task was admitted. A key whose previous
    /// task is terminal starts a fresh cycle. Must be called inside a tokio
    /// runtime.
    pub fn enqueue(&self, key: impl Into<TaskKey>) -> bool {
        let key = key.into();
        let admitted = self.control.admit_and_spawn(
            key.clone(),
            || self.registry.begin(&key),
            |generation, cancel| {
                let span = tracing::debug_span!("task", key = %key, generation);
                let ctx = TaskContext {
                    key: key.clone(),
                    generation,
                    registry: Arc::clone(&self.registry),
                    gate: Arc::clone(&self.gate),
                    control: Arc::clone(&self.control),
                    work: Arc::clone(&self.work),
                };
                execute::run_task(ctx, cancel).instrument(span)
            },
        );
        match admitted {
            Some(generation) => {
                tracing::debug!(key = %key, generation, "enqueued");
                true
            }
            None => {
                tracing::debug!(key = %key, "already live; keeping existing task");
                false
            }
        }
    }

    /// Enqueue each key independently. Returns how many were admitted;
    /// deduplicated keys are not an error.
    pub fn enqueue_all<I, K>(&self, keys: I) -> usize
    where
        I: IntoIterator<Item = K>,
        K: Into<TaskKey>,
    {
        keys.into_iter()
            .map(|k| self.enqueue(k))
            .filter(|admitted| *admitted)
            .count()
    }

    /// Cancel the live task for `key` and wait until it has released its
    /// slot and been removed. Returns false (no-op) if nothing was live.
    /// Concurrent callers for the same key all wait for the same cleanup.
    pub async fn cancel(&self, key: &str) -> bool {
        if self.registry.get(key).is_terminal() {
            return false;
        }
        match self.control.request_cancel(key) {
            CancelRequest::NotLive => false,
            CancelRequest::Signalled(done) => {
                tracing::debug!(key, "cancel requested");
                done.cancelled().await;
                true
            }
        }
    }

    /// Cancel every live task, clear the registry, and wait for all in-flight
    /// tasks to finish, so no slot is held when this returns. No enqueue can
    /// slip in between draining the tasks and clearing the registry.
    pub async fn delete_all(&self) {
        let done = self.control.cancel_all(|| self.registry.clear());
        tracing::info!(tasks = done.len(), "delete all");
        for d in done {
            d.cancelled().await;
        }
    }

    /// Current state of `key` (`NotStarted` if unknown).
    pub fn status(&self, key: &str) -> TaskState {
        self.registry.get(key)
    }

    pub fn aggregate(&self) -> AggregateStatus {
        self.registry.aggregate()
    }

    pub fn observe_status(&self, key: impl Into<TaskKey>) -> StatusWatch {
        self.registry.subscribe(&key.into())
    }

    pub fn observe_aggregate(&self) -> AggregateWatch {
        self.registry.subscribe_aggregate()
    }

    /// Tasks currently in `Running`.
    pub fn running_count(&self) -> usize {
        self.registry.running_count()
    }

    /// Spawned tasks that have not finished yet (queued or running).
    pub fn live_count(&self) -> usize {
        self.control.len()
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }
}
