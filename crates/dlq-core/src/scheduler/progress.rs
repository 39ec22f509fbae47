//! Progress reporting from a work unit into the registry.

use std::sync::Arc;

use crate::registry::TaskRegistry;
use crate::task::{TaskKey, TaskState};

/// Handle given to a work unit so it can publish `Running(progress)`.
///
/// Writes carry the task's generation, so a reporter that outlives its task
/// instance cannot touch a newer one.
pub struct ProgressReporter {
    registry: Arc<TaskRegistry>,
    key: TaskKey,
    generation: u64,
}

impl ProgressReporter {
    pub(crate) fn new(registry: Arc<TaskRegistry>, key: TaskKey, generation: u64) -> Self {
        Self {
            registry,
            key,
            generation,
        }
    }

    /// Publish `fraction` (clamped to [0.0, 1.0]). Returns false if the task
    /// no longer owns its entry.
    pub fn report(&self, fraction: f32) -> bool {
        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        self.registry
            .update(&self.key, self.generation, TaskState::Running(fraction))
    }
}
