//! Work units: the body a task runs once it holds a gate slot.
//!
//! The transfer itself is abstract. [`SimulatedTransfer`] stands in for a
//! real download: a fixed number of progress steps with a randomized delay,
//! checking for cancellation at every step boundary.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;

use crate::config::DlqConfig;
use crate::scheduler::ProgressReporter;
use crate::task::TaskKey;

/// Why a work unit stopped before finishing.
#[derive(Debug, thiserror::Error)]
pub enum WorkError {
    /// The cancellation token fired.
    #[error("cancelled")]
    Cancelled,
    /// The transfer failed; the task ends as `Failed`.
    #[error("transfer failed: {0}")]
    Failed(String),
}

/// Body of a task. Implementations should report progress through
/// `progress` and return `WorkError::Cancelled` soon after `cancel` fires.
pub trait WorkUnit: Send + Sync + 'static {
    fn run(
        &self,
        key: &TaskKey,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<(), WorkError>> + Send;
}

/// Simulated download: `step_count` steps, each followed by the same random
/// delay drawn once per run from `[delay_min, delay_max]`.
#[derive(Debug, Clone)]
pub struct SimulatedTransfer {
    step_count: u32,
    delay_min: Duration,
    delay_max: Duration,
}

impl SimulatedTransfer {
    pub fn new(step_count: u32, delay_min: Duration, delay_max: Duration) -> Self {
        Self {
            step_count: step_count.max(1),
            delay_min: delay_min.min(delay_max),
            delay_max: delay_max.max(delay_min),
        }
    }

    pub fn from_config(cfg: &DlqConfig) -> Self {
        Self::new(
            cfg.step_count,
            Duration::from_millis(cfg.step_delay_min_ms),
            Duration::from_millis(cfg.step_delay_max_ms),
        )
    }

    pub fn step_count(&self) -> u32 {
        self.step_count
    }

    fn pick_delay(&self) -> Duration {
        let min_ms = self.delay_min.as_millis() as u64;
        let max_ms = self.delay_max.as_millis() as u64;
        if min_ms >= max_ms {
            return self.delay_min;
        }
        Duration::from_millis(rand::rng().random_range(min_ms..=max_ms))
    }
}

impl Default for SimulatedTransfer {
    fn default() -> Self {
        Self::from_config(&DlqConfig::default())
    }
}

impl WorkUnit for SimulatedTransfer {
    fn run(
        &self,
        key: &TaskKey,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<(), WorkError>> + Send {
        let delay = self.pick_delay();
        let steps = self.step_count;
        async move {
            for step in 0..steps {
                if cancel.is_cancelled() {
                    return Err(WorkError::Cancelled);
                }
                let fraction = step as f32 / steps as f32;
                progress.report(fraction);
                tracing::debug!(key = %key, progress = fraction, "download progress");
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(WorkError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            Ok(())
        }
    }
}
