//! Actions: the callable half of a task.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::EnqueueError;
use crate::registry::ActionRegistry;

/// The future an invoked action hands back to the queue.
pub type TaskFuture<T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'static>>;

type OnceFn<T, E> = Box<dyn FnOnce(Vec<Value>) -> TaskFuture<T, E> + Send + 'static>;

/// A reusable action, typically registered under a name.
///
/// ```ignore
/// struct Add;
///
/// #[async_trait]
/// impl ActionHandler<i64, String> for Add {
///     async fn handle(&self, arguments: Vec<Value>) -> Result<i64, String> {
///         Ok(arguments.iter().filter_map(Value::as_i64).sum())
///     }
/// }
/// ```
#[async_trait]
pub trait ActionHandler<T, E>: Send + Sync {
    async fn handle(&self, arguments: Vec<Value>) -> Result<T, E>;
}

/// Adapts a plain closure into an [`ActionHandler`].
pub(crate) struct FnHandler<F> {
    f: F,
}

impl<F> FnHandler<F> {
    pub(crate) fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<T, E, F, Fut> ActionHandler<T, E> for FnHandler<F>
where
    T: Send + 'static,
    E: Send + 'static,
    F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    async fn handle(&self, arguments: Vec<Value>) -> Result<T, E> {
        (self.f)(arguments).await
    }
}

/// What a caller hands to `enqueue`.
pub enum Action<T, E> {
    /// A one-off closure, consumed when the task runs.
    Once(OnceFn<T, E>),
    /// A shared handler, invoked through its `Arc`.
    Shared(Arc<dyn ActionHandler<T, E>>),
    /// A name to look up in the queue's registry at enqueue time.
    Named(String),
}

impl<T, E> Action<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: FnOnce(Vec<Value>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Action::Once(Box::new(move |arguments: Vec<Value>| {
            Box::pin(f(arguments)) as TaskFuture<T, E>
        }))
    }

    pub fn from_handler(handler: Arc<dyn ActionHandler<T, E>>) -> Self {
        Action::Shared(handler)
    }

    pub fn named(name: impl Into<String>) -> Self {
        Action::Named(name.into())
    }

    /// Resolve to something that can be invoked.
    ///
    /// A name that is not registered (or a queue without a registry) is not
    /// callable and yields [`EnqueueError::InvalidTask`].
    pub(crate) fn resolve(
        self,
        registry: Option<&ActionRegistry<T, E>>,
    ) -> Result<Invocable<T, E>, EnqueueError> {
        match self {
            Action::Once(f) => Ok(Invocable::Once(f)),
            Action::Shared(handler) => Ok(Invocable::Shared(handler)),
            Action::Named(name) => registry
                .and_then(|registry| registry.get(&name))
                .cloned()
                .map(Invocable::Shared)
                .ok_or(EnqueueError::InvalidTask),
        }
    }
}

impl<T, E> fmt::Debug for Action<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Once(_) => f.write_str("Action::Once(..)"),
            Action::Shared(_) => f.write_str("Action::Shared(..)"),
            Action::Named(name) => write!(f, "Action::Named({name:?})"),
        }
    }
}

/// A resolved action, ready for the run step.
pub(crate) enum Invocable<T, E> {
    Once(OnceFn<T, E>),
    Shared(Arc<dyn ActionHandler<T, E>>),
}

impl<T, E> Invocable<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Call the action. Closures run their synchronous prefix here; the
    /// returned future carries the rest.
    pub(crate) fn invoke(self, arguments: Vec<Value>) -> TaskFuture<T, E> {
        match self {
            Invocable::Once(f) => f(arguments),
            Invocable::Shared(handler) => {
                Box::pin(async move { handler.handle(arguments).await })
            }
        }
    }
}

impl<T, E> fmt::Debug for Invocable<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invocable::Once(_) => f.write_str("Invocable::Once(..)"),
            Invocable::Shared(_) => f.write_str("Invocable::Shared(..)"),
        }
    }
}
