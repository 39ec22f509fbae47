//! Aggregate status: succeeded / total over every tracked task.
//!
//! Always derived from a registry snapshot; never stored on its own.

use std::fmt;

use crate::task::TaskState;

/// Summed view of the registry (e.g. for "downloading 3 / 10").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AggregateStatus {
    pub succeeded: usize,
    pub total: usize,
}

impl AggregateStatus {
    pub const EMPTY: AggregateStatus = AggregateStatus {
        succeeded: 0,
        total: 0,
    };

    /// Counts `Succeeded` entries over all entries.
    pub fn from_states<'a, I>(states: I) -> Self
    where
        I: IntoIterator<Item = &'a TaskState>,
    {
        let mut status = Self::EMPTY;
        for state in states {
            status.total += 1;
            if *state == TaskState::Succeeded {
                status.succeeded += 1;
            }
        }
        status
    }

    /// Fraction succeeded in [0.0, 1.0] (0 when nothing is tracked).
    pub fn progress(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        self.succeeded as f32 / self.total as f32
    }

    /// True when every tracked task succeeded. An empty registry counts as complete.
    pub fn is_complete(&self) -> bool {
        self.succeeded == self.total
    }
}

impl fmt::Display for AggregateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.succeeded, self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_only_succeeded() {
        let states = [
            TaskState::Succeeded,
            TaskState::Running(0.4),
            TaskState::NotStarted,
            TaskState::Succeeded,
            TaskState::Failed,
        ];
        let status = AggregateStatus::from_states(&states);
        assert_eq!(status, AggregateStatus { succeeded: 2, total: 5 });
        assert!((status.progress() - 0.4).abs() < 1e-6);
        assert!(!status.is_complete());
    }

    #[test]
    fn empty_has_zero_progress() {
        let status = AggregateStatus::from_states(std::iter::empty::<&TaskState>());
        assert_eq!(status, AggregateStatus::EMPTY);
        assert_eq!(status.progress(), 0.0);
        assert!(status.is_complete());
        assert_eq!(status.to_string(), "0 / 0");
    }
}
