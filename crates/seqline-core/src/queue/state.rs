//! Task and queue state machines.

use serde::{Deserialize, Serialize};

/// State of a record while it sits in the pending queue.
///
/// State transitions:
/// - Queued -> Running -> (settled, removed from the queue)
///
/// Only the head can be Running, and at most one record is Running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Waiting behind the head.
    Queued,

    /// Action invoked, outcome not settled yet.
    Running,
}

impl TaskState {
    pub fn is_running(self) -> bool {
        matches!(self, TaskState::Running)
    }
}

/// Whole-queue state.
///
/// - Idle -> Running on enqueue
/// - Running -> Running when the head settles and more records remain
/// - Running -> Idle when the head settles and nothing remains
///
/// If the head is abandoned because its runtime shut down, records behind it
/// keep the queue Running until the next enqueue starts them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Idle,
    Running,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_running_is_running() {
        assert!(TaskState::Running.is_running());
        assert!(!TaskState::Queued.is_running());
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&QueueStatus::Idle).unwrap();
        assert_eq!(json, "\"idle\"");
    }
}
