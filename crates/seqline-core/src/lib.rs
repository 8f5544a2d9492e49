//! seqline-core
//!
//! A sequential task runner: tasks are submitted with `enqueue`, run one at a
//! time in strict FIFO order, and each submission gets its own completion
//! handle carrying exactly the value or error the task produced.
//!
//! # Modules
//! - **queue**: `TaskQueue`, the run step and its state machine
//! - **completion**: `Completion` / `Settler`, the settlable handle
//! - **action**: what can be enqueued (closures, shared handlers, names)
//! - **registry**: named actions
//! - **builder**: `TaskQueueBuilder` and `QueueConfig`
//! - **observability**: counters and snapshots
//! - **error**: error types

pub mod action;
pub mod builder;
pub mod completion;
pub mod error;
pub mod ids;
pub mod observability;
pub mod queue;
pub mod registry;

pub use action::{Action, ActionHandler, TaskFuture};
pub use builder::{BuildError, QueueConfig, TaskQueueBuilder};
pub use completion::{Completion, SettleState, Settler};
pub use error::{EnqueueError, RegistryError};
pub use ids::TaskId;
pub use observability::{QueueCounts, TaskSnapshot};
pub use queue::{QueueStatus, TaskQueue, TaskState};
pub use registry::ActionRegistry;
