//! Completion handles: the settlable future returned by `enqueue`.
//!
//! A handle is split in two halves created together by [`pair`]:
//! - [`Settler`] stays with the queue and is consumed by the single
//!   `fulfill` / `reject` call, so a handle can never settle twice. Dropping
//!   it unsettled marks the handle [`SettleState::Abandoned`].
//! - [`Completion`] goes to the caller. It is a plain `Future`, so it can be
//!   awaited directly or combined with `tokio::join!`, `tokio::try_join!` and
//!   `tokio::select!`.

use std::any::Any;
use std::future::Future;
use std::panic;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::task::{Context, Poll};

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::ids::TaskId;

/// Settlement state of a completion handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettleState {
    Pending,
    Fulfilled,
    Rejected,
    Panicked,
    /// The settler went away unsettled (its runtime shut down mid-task).
    Abandoned,
}

impl SettleState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => SettleState::Fulfilled,
            2 => SettleState::Rejected,
            3 => SettleState::Panicked,
            4 => SettleState::Abandoned,
            _ => SettleState::Pending,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            SettleState::Pending => 0,
            SettleState::Fulfilled => 1,
            SettleState::Rejected => 2,
            SettleState::Panicked => 3,
            SettleState::Abandoned => 4,
        }
    }

    pub fn is_settled(self) -> bool {
        !matches!(self, SettleState::Pending)
    }
}

/// What a task finished with.
pub(crate) enum Settlement<T, E> {
    Fulfilled(T),
    Rejected(E),
    Panicked(Box<dyn Any + Send + 'static>),
}

impl<T, E> Settlement<T, E> {
    pub(crate) fn state(&self) -> SettleState {
        match self {
            Settlement::Fulfilled(_) => SettleState::Fulfilled,
            Settlement::Rejected(_) => SettleState::Rejected,
            Settlement::Panicked(_) => SettleState::Panicked,
        }
    }
}

/// Create a connected settler / completion pair for `task_id`.
pub fn pair<T, E>(task_id: TaskId) -> (Settler<T, E>, Completion<T, E>) {
    let (tx, rx) = oneshot::channel();
    let state = Arc::new(AtomicU8::new(SettleState::Pending.as_u8()));
    (
        Settler {
            task_id,
            state: Arc::clone(&state),
            tx: Some(tx),
        },
        Completion { task_id, state, rx },
    )
}

/// Producer half of a completion handle.
pub struct Settler<T, E> {
    task_id: TaskId,
    state: Arc<AtomicU8>,
    tx: Option<oneshot::Sender<Settlement<T, E>>>,
}

impl<T, E> Settler<T, E> {
    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Fulfil the handle with `value`.
    ///
    /// Returns `false` when the caller already dropped its [`Completion`].
    pub fn fulfill(self, value: T) -> bool {
        self.settle(Settlement::Fulfilled(value))
    }

    /// Reject the handle with `error`, passed through untouched.
    pub fn reject(self, error: E) -> bool {
        self.settle(Settlement::Rejected(error))
    }

    pub(crate) fn settle(mut self, settlement: Settlement<T, E>) -> bool {
        self.state.store(settlement.state().as_u8(), Ordering::Release);
        self.tx
            .take()
            .is_some_and(|tx| tx.send(settlement).is_ok())
    }
}

impl<T, E> Drop for Settler<T, E> {
    fn drop(&mut self) {
        if self.tx.is_some() {
            self.state
                .store(SettleState::Abandoned.as_u8(), Ordering::Release);
        }
    }
}

/// Consumer half of a completion handle.
///
/// Resolves to exactly the `Ok` / `Err` the task produced. If the task
/// panicked, awaiting the handle resumes that panic in the awaiting task.
#[must_use = "a completion does nothing unless awaited; dropping it does not cancel the task"]
pub struct Completion<T, E> {
    task_id: TaskId,
    state: Arc<AtomicU8>,
    rx: oneshot::Receiver<Settlement<T, E>>,
}

impl<T, E> Completion<T, E> {
    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Current settlement state, without consuming the handle.
    pub fn state(&self) -> SettleState {
        SettleState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_settled(&self) -> bool {
        self.state().is_settled()
    }
}

impl<T, E> Future for Completion<T, E> {
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(Settlement::Fulfilled(value))) => Poll::Ready(Ok(value)),
            Poll::Ready(Ok(Settlement::Rejected(error))) => Poll::Ready(Err(error)),
            Poll::Ready(Ok(Settlement::Panicked(payload))) => panic::resume_unwind(payload),
            // Abandoned: the runtime driving the queue shut down mid-task.
            Poll::Ready(Err(_)) => panic!("{} was dropped before it settled", this.task_id),
        }
    }
}

impl<T, E> std::fmt::Debug for Completion<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("task_id", &self.task_id)
            .field("state", &self.state())
            .finish()
    }
}
