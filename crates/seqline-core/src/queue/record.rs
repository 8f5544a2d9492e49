//! Task record: one submitted task while it is pending.

use std::time::Instant;

use serde_json::Value;

use super::TaskState;
use crate::action::Invocable;
use crate::completion::Settler;
use crate::ids::TaskId;
use crate::observability::TaskSnapshot;

/// The parts of a task the run step consumes.
pub(crate) struct Job<T, E> {
    pub action: Invocable<T, E>,
    pub arguments: Vec<Value>,
    pub settler: Settler<T, E>,
}

/// A task in the pending queue.
///
/// The job is taken out exactly once, when the record becomes the running
/// head; the record itself stays at the head until its handle is settled.
pub(crate) struct TaskRecord<T, E> {
    pub id: TaskId,
    pub state: TaskState,
    job: Option<Job<T, E>>,
    pub enqueued_at: Instant,
    pub started_at: Option<Instant>,
}

impl<T, E> TaskRecord<T, E> {
    pub fn new(id: TaskId, job: Job<T, E>) -> Self {
        Self {
            id,
            state: TaskState::Queued,
            job: Some(job),
            enqueued_at: Instant::now(),
            started_at: None,
        }
    }

    /// Mark as running and hand out the job. `None` if already started.
    pub fn start(&mut self) -> Option<Job<T, E>> {
        let job = self.job.take()?;
        self.state = TaskState::Running;
        self.started_at = Some(Instant::now());
        Some(job)
    }

    pub fn snapshot(&self, now: Instant) -> TaskSnapshot {
        let waited = self
            .started_at
            .unwrap_or(now)
            .saturating_duration_since(self.enqueued_at);
        TaskSnapshot {
            id: self.id,
            state: self.state,
            waited,
            running_for: self
                .started_at
                .map(|started| now.saturating_duration_since(started)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::completion;

    fn record(id: u64) -> TaskRecord<(), ()> {
        let task_id = TaskId::new(id);
        let (settler, _completion) = completion::pair(task_id);
        let action = Action::from_fn(|_| async { Ok(()) }).resolve(None).unwrap();
        TaskRecord::new(
            task_id,
            Job {
                action,
                arguments: Vec::new(),
                settler,
            },
        )
    }

    #[test]
    fn new_record_is_queued() {
        let record = record(1);
        assert_eq!(record.state, TaskState::Queued);
        assert!(record.started_at.is_none());
    }

    #[test]
    fn start_hands_out_the_job_once() {
        let mut record = record(1);
        assert!(record.start().is_some());
        assert_eq!(record.state, TaskState::Running);
        assert!(record.started_at.is_some());
        assert!(record.start().is_none());
    }

    #[test]
    fn snapshot_reports_running_duration_only_once_started() {
        let mut record = record(3);
        let snapshot = record.snapshot(Instant::now());
        assert_eq!(snapshot.id, TaskId::new(3));
        assert!(snapshot.running_for.is_none());

        let _job = record.start();
        let snapshot = record.snapshot(Instant::now());
        assert_eq!(snapshot.state, TaskState::Running);
        assert!(snapshot.running_for.is_some());
    }
}
