//! The sequential task queue.
//!
//! Tasks run one at a time in enqueue order. There is no background worker:
//! the first task is invoked from inside `enqueue`, and every later task is
//! invoked from the settlement continuation of the task before it.
//!
//! If the runtime driving the head shuts down before the head settles, the
//! head is abandoned and removed. Records behind it stay queued and the next
//! `enqueue` on a live runtime starts the oldest of them.

mod record;
mod state;

pub use state::{QueueStatus, TaskState};

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tracing::{debug, warn};

use self::record::{Job, TaskRecord};
use crate::action::Action;
use crate::builder::TaskQueueBuilder;
use crate::completion::{self, Completion, SettleState, Settlement, Settler};
use crate::error::EnqueueError;
use crate::ids::TaskId;
use crate::observability::{QueueCounts, TaskSnapshot};
use crate::registry::ActionRegistry;

pub(crate) const DEFAULT_QUEUE_NAME: &str = "seqline";

/// A FIFO queue that runs at most one task at a time.
///
/// Cloning is cheap and every clone drives the same queue. Tasks keep
/// draining even after the last clone is dropped.
///
/// ```ignore
/// let queue = TaskQueue::<i64, String>::new();
/// let sum = queue.enqueue_fn(
///     |args| async move { Ok(args.iter().filter_map(Value::as_i64).sum()) },
///     Some(json!([2, 3])),
/// )?;
/// assert_eq!(sum.await, Ok(5));
/// ```
pub struct TaskQueue<T, E> {
    inner: Arc<Inner<T, E>>,
}

impl<T, E> Clone for TaskQueue<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<T, E> {
    name: String,
    registry: Option<Arc<ActionRegistry<T, E>>>,
    tasks: Mutex<PendingTasks<T, E>>,
    idle: Notify,
}

/// Guarded by `Inner::tasks`. The lock is never held across an `.await`
/// and never held while an action is invoked.
struct PendingTasks<T, E> {
    /// Head is the running (or about to run) record.
    pending: VecDeque<TaskRecord<T, E>>,
    next_task_id: u64,
    /// Lifetime settlement totals; `queued` / `running` stay zero here.
    settled: QueueCounts,
}

impl<T, E> PendingTasks<T, E> {
    fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            next_task_id: 1,
            settled: QueueCounts::default(),
        }
    }

    fn allocate_task_id(&mut self) -> TaskId {
        let id = TaskId::new(self.next_task_id);
        self.next_task_id += 1;
        id
    }

    /// Start the head unless it is already running.
    fn start_head(&mut self) -> Option<(TaskId, Job<T, E>)> {
        let head = self.pending.front_mut()?;
        if head.state.is_running() {
            return None;
        }
        let id = head.id;
        head.start().map(|job| (id, job))
    }
}

impl<T, E> TaskQueue<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// A new, idle queue without an action registry.
    pub fn new() -> Self {
        Self::from_parts(DEFAULT_QUEUE_NAME.to_string(), None)
    }

    /// A new, idle queue that resolves [`Action::Named`] through `registry`.
    pub fn with_registry(registry: Arc<ActionRegistry<T, E>>) -> Self {
        Self::from_parts(DEFAULT_QUEUE_NAME.to_string(), Some(registry))
    }

    pub fn builder() -> TaskQueueBuilder<T, E> {
        TaskQueueBuilder::new()
    }

    pub(crate) fn from_parts(name: String, registry: Option<Arc<ActionRegistry<T, E>>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                registry,
                tasks: Mutex::new(PendingTasks::new()),
                idle: Notify::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn registry(&self) -> Option<&Arc<ActionRegistry<T, E>>> {
        self.inner.registry.as_ref()
    }

    /// Submit a task and get a handle to its outcome.
    ///
    /// Validation happens before anything is queued: an action that does not
    /// resolve fails with [`EnqueueError::InvalidTask`], arguments that are
    /// not a JSON array fail with [`EnqueueError::InvalidArguments`].
    /// `None` and `Some(Value::Null)` both mean "no arguments". Other scalars
    /// are rejected, falsy ones (`false`, `0`, `""`) included: only a missing
    /// or null value reads as "no arguments".
    ///
    /// If the queue was idle the action is invoked before this returns.
    /// Otherwise the task waits behind the records already pending; if none
    /// of them is running (their runtime shut down), the oldest is started
    /// here. Safe to call from inside a running task.
    pub fn enqueue(
        &self,
        action: Action<T, E>,
        arguments: Option<Value>,
    ) -> Result<Completion<T, E>, EnqueueError> {
        let action = action.resolve(self.inner.registry.as_deref())?;
        let arguments = match arguments {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items,
            Some(_) => return Err(EnqueueError::InvalidArguments),
        };
        let runtime = Handle::try_current().map_err(|_| EnqueueError::NoRuntime)?;

        let (task_id, handle, start) = {
            let mut tasks = self.inner.lock();
            let task_id = tasks.allocate_task_id();
            let (settler, handle) = completion::pair(task_id);
            tasks.pending.push_back(TaskRecord::new(
                task_id,
                Job {
                    action,
                    arguments,
                    settler,
                },
            ));

            // A running head continues the chain itself. Without one (the
            // queue was empty, or the head was abandoned) the oldest record
            // starts here.
            let start = tasks.start_head();
            (task_id, handle, start)
        };

        debug!(
            queue = %self.inner.name,
            %task_id,
            immediate = start.as_ref().is_some_and(|(head_id, _)| *head_id == task_id),
            "task enqueued"
        );

        if let Some((head_id, job)) = start {
            self.inner.run(runtime, head_id, job);
        }
        Ok(handle)
    }

    /// Enqueue a one-off closure.
    pub fn enqueue_fn<F, Fut>(
        &self,
        f: F,
        arguments: Option<Value>,
    ) -> Result<Completion<T, E>, EnqueueError>
    where
        F: FnOnce(Vec<Value>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.enqueue(Action::from_fn(f), arguments)
    }

    /// Enqueue an action registered under `name`.
    pub fn enqueue_named(
        &self,
        name: &str,
        arguments: Option<Value>,
    ) -> Result<Completion<T, E>, EnqueueError> {
        self.enqueue(Action::named(name), arguments)
    }

    pub fn status(&self) -> QueueStatus {
        if self.is_idle() {
            QueueStatus::Idle
        } else {
            QueueStatus::Running
        }
    }

    /// Number of pending records, the running head included.
    pub fn len(&self) -> usize {
        self.inner.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().pending.is_empty()
    }

    pub fn is_idle(&self) -> bool {
        self.is_empty()
    }

    pub fn counts(&self) -> QueueCounts {
        let tasks = self.inner.lock();
        let mut counts = tasks.settled.clone();
        for record in &tasks.pending {
            if record.state.is_running() {
                counts.running += 1;
            } else {
                counts.queued += 1;
            }
        }
        counts
    }

    /// Pending records in execution order.
    pub fn snapshot(&self) -> Vec<TaskSnapshot> {
        let now = Instant::now();
        let tasks = self.inner.lock();
        tasks
            .pending
            .iter()
            .map(|record| record.snapshot(now))
            .collect()
    }

    /// Wait until the queue has drained. Returns at once if already idle.
    pub async fn idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }
}

impl<T, E> Default for TaskQueue<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> fmt::Debug for TaskQueue<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("name", &self.inner.name)
            .field("pending", &self.inner.lock().pending.len())
            .finish()
    }
}

impl<T, E> Inner<T, E> {
    fn lock(&self) -> MutexGuard<'_, PendingTasks<T, E>> {
        // Nothing panics while holding the lock, so a poisoned guard is still consistent.
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The head's runtime went away before it settled: mark its handle
    /// abandoned and remove it. Records behind it wait for the next
    /// `enqueue`, since there is no runtime here to start them on.
    fn abandon_head(&self, task_id: TaskId, settler: Settler<T, E>) {
        drop(settler);
        warn!(queue = %self.name, %task_id, "task abandoned, its runtime shut down before it settled");

        let drained = {
            let mut tasks = self.lock();
            if tasks.pending.front().is_some_and(|record| record.id == task_id) {
                tasks.pending.pop_front();
            }
            tasks.settled.record_settlement(SettleState::Abandoned);
            tasks.pending.is_empty()
        };

        if drained {
            debug!(queue = %self.name, "queue idle");
            self.idle.notify_waiters();
        }
    }
}

/// The running head, owned by the task that drives it.
///
/// Dropped without settling (the runtime shut down and dropped the task,
/// polled or not) it abandons the head instead of leaving it in place.
struct RunningHead<T, E> {
    inner: Arc<Inner<T, E>>,
    runtime: Handle,
    task_id: TaskId,
    settler: Option<Settler<T, E>>,
}

impl<T, E> RunningHead<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn settle(mut self, settlement: Settlement<T, E>) {
        if let Some(settler) = self.settler.take() {
            self.inner
                .settle_head(self.runtime.clone(), self.task_id, settler, settlement);
        }
    }
}

impl<T, E> Drop for RunningHead<T, E> {
    fn drop(&mut self) {
        if let Some(settler) = self.settler.take() {
            self.inner.abandon_head(self.task_id, settler);
        }
    }
}

impl<T, E> Inner<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Run step: invoke the head's action and settle it once it completes.
    fn run(self: &Arc<Self>, runtime: Handle, task_id: TaskId, job: Job<T, E>) {
        let Job {
            action,
            arguments,
            settler,
        } = job;
        debug!(queue = %self.name, %task_id, arguments = arguments.len(), "task started");

        // A panic while invoking still has to settle the record.
        let invoked = panic::catch_unwind(AssertUnwindSafe(move || action.invoke(arguments)));

        // Built outside the async block so it is dropped, and the head
        // abandoned, even if the task is never polled.
        let head = RunningHead {
            inner: Arc::clone(self),
            runtime: runtime.clone(),
            task_id,
            settler: Some(settler),
        };
        runtime.spawn(async move {
            let settlement = match invoked {
                // Polled in its own task so a panic surfaces as a JoinError.
                Ok(future) => match head.runtime.spawn(future).await {
                    Ok(Ok(value)) => Settlement::Fulfilled(value),
                    Ok(Err(error)) => Settlement::Rejected(error),
                    Err(join_error) => match join_error.try_into_panic() {
                        Ok(payload) => Settlement::Panicked(payload),
                        // Cancelled by runtime shutdown; dropping `head` abandons it.
                        Err(_) => return,
                    },
                },
                Err(payload) => Settlement::Panicked(payload),
            };
            head.settle(settlement);
        });
    }

    /// Settle the head's handle, remove the head, start the next one.
    ///
    /// Nothing in here can fail; the caller's handle only ever sees the
    /// task's own outcome.
    fn settle_head(
        self: &Arc<Self>,
        runtime: Handle,
        task_id: TaskId,
        settler: Settler<T, E>,
        settlement: Settlement<T, E>,
    ) {
        let outcome = settlement.state();
        if outcome == SettleState::Panicked {
            warn!(queue = %self.name, %task_id, "task panicked");
        }
        if !settler.settle(settlement) {
            debug!(queue = %self.name, %task_id, "completion handle dropped before settlement");
        }
        debug!(queue = %self.name, %task_id, ?outcome, "task settled");

        let next = {
            let mut tasks = self.lock();
            let head = tasks.pending.pop_front();
            debug_assert_eq!(head.map(|record| record.id), Some(task_id));
            tasks.settled.record_settlement(outcome);
            tasks.start_head()
        };

        match next {
            Some((next_id, job)) => self.run(runtime, next_id, job),
            None => {
                debug!(queue = %self.name, "queue idle");
                self.idle.notify_waiters();
            }
        }
    }
}
