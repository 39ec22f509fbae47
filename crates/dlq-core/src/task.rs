//! Task identity and state values.
//!
//! A task is nothing more than a key plus its current [`TaskState`]; the
//! authoritative state lives in the [`TaskRegistry`](crate::registry::TaskRegistry).

use std::borrow::Borrow;
use std::fmt;

/// Caller-supplied identifier of a task, stable for the task's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskKey(String);

impl TaskKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for TaskKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&String> for TaskKey {
    fn from(key: &String) -> Self {
        Self(key.clone())
    }
}

impl Borrow<str> for TaskKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// State of one task. `Succeeded`, `Cancelled` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TaskState {
    /// Never requested, removed, or admitted but still waiting for a gate slot.
    #[default]
    NotStarted,
    /// Holding a gate slot; fraction complete in [0.0, 1.0].
    Running(f32),
    Succeeded,
    Cancelled,
    /// The work unit reported an error.
    Failed,
}

impl TaskState {
    /// Fraction complete in [0.0, 1.0].
    pub fn progress(self) -> f32 {
        match self {
            TaskState::Running(p) => p.clamp(0.0, 1.0),
            TaskState::Succeeded => 1.0,
            TaskState::NotStarted | TaskState::Cancelled | TaskState::Failed => 0.0,
        }
    }

    /// Whole percent (truncated), e.g. for "42%" labels.
    pub fn percent(self) -> u32 {
        (self.progress() * 100.0) as u32
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Succeeded | TaskState::Cancelled | TaskState::Failed
        )
    }

    pub fn is_running(self) -> bool {
        matches!(self, TaskState::Running(_))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::NotStarted => "not_started",
            TaskState::Running(_) => "running",
            TaskState::Succeeded => "succeeded",
            TaskState::Cancelled => "cancelled",
            TaskState::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Running(_) => write!(f, "running ({}%)", self.percent()),
            other => f.write_str(other.as_str()),
        }
    }
}
