//! Task identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a task record, unique within one queue.
///
/// Ids are handed out in enqueue order starting at 1, so comparing two ids
/// from the same queue also compares their execution order.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(u64);

impl TaskId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_task_prefix() {
        assert_eq!(TaskId::new(7).to_string(), "task-7");
    }

    #[test]
    fn ordering_follows_allocation() {
        assert!(TaskId::new(1) < TaskId::new(2));
    }
}
