use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::completion::SettleState;
use crate::ids::TaskId;
use crate::queue::TaskState;

/// Pending records by state, plus lifetime settlement totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub queued: usize,
    pub running: usize,
    pub fulfilled: u64,
    pub rejected: u64,
    pub panicked: u64,
    /// Dropped unsettled because their runtime shut down mid-task.
    pub abandoned: u64,
}

impl QueueCounts {
    pub fn pending(&self) -> usize {
        self.queued + self.running
    }

    pub fn settled(&self) -> u64 {
        self.fulfilled + self.rejected + self.panicked + self.abandoned
    }

    pub(crate) fn record_settlement(&mut self, state: SettleState) {
        match state {
            SettleState::Fulfilled => self.fulfilled += 1,
            SettleState::Rejected => self.rejected += 1,
            SettleState::Panicked => self.panicked += 1,
            SettleState::Abandoned => self.abandoned += 1,
            SettleState::Pending => {}
        }
    }
}

/// Point-in-time view of one pending record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub state: TaskState,
    /// Time spent queued before the action was invoked (so far, if still queued).
    pub waited: Duration,
    pub running_for: Option<Duration>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settlement_totals_accumulate() {
        let mut counts = QueueCounts::default();
        counts.record_settlement(SettleState::Fulfilled);
        counts.record_settlement(SettleState::Rejected);
        counts.record_settlement(SettleState::Rejected);
        counts.record_settlement(SettleState::Abandoned);
        counts.record_settlement(SettleState::Pending);

        assert_eq!(counts.fulfilled, 1);
        assert_eq!(counts.rejected, 2);
        assert_eq!(counts.abandoned, 1);
        assert_eq!(counts.settled(), 4);
        assert_eq!(counts.pending(), 0);
    }
}
