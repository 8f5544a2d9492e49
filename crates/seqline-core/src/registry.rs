use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use serde_json::Value;

use crate::action::{ActionHandler, FnHandler};
use crate::error::RegistryError;

/// Registry of named actions (name -> handler).
///
/// Design:
/// - Built during initialization (mutable).
/// - Shared with queues as `Arc<ActionRegistry<_, _>>` afterwards (immutable).
pub struct ActionRegistry<T, E> {
    handlers: HashMap<String, Arc<dyn ActionHandler<T, E>>>,
}

impl<T, E> ActionRegistry<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler under `name`. Names are unique.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        handler: Arc<dyn ActionHandler<T, E>>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.handlers.contains_key(&name) {
            return Err(RegistryError::DuplicateAction(name));
        }
        self.handlers.insert(name, handler);
        Ok(())
    }

    /// Register a closure under `name`.
    pub fn register_fn<F, Fut>(&mut self, name: impl Into<String>, f: F) -> Result<(), RegistryError>
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.register(name, Arc::new(FnHandler::new(f)))
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ActionHandler<T, E>>> {
        self.handlers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<T, E> Default for ActionRegistry<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sum(arguments: Vec<Value>) -> impl Future<Output = Result<i64, String>> + Send {
        async move { Ok(arguments.iter().filter_map(Value::as_i64).sum()) }
    }

    #[test]
    fn register_rejects_duplicates() {
        let mut reg = ActionRegistry::<i64, String>::new();
        reg.register_fn("sum", sum).unwrap();

        let err = reg.register_fn("sum", sum).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateAction("sum".to_string()));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn names_are_sorted() {
        let mut reg = ActionRegistry::<i64, String>::new();
        reg.register_fn("zeta", sum).unwrap();
        reg.register_fn("alpha", sum).unwrap();

        assert_eq!(reg.names(), vec!["alpha".to_string(), "zeta".to_string()]);
        assert!(reg.contains("alpha"));
        assert!(!reg.contains("beta"));
    }

    #[test]
    fn new_registry_is_empty() {
        let reg = ActionRegistry::<i64, String>::default();
        assert!(reg.is_empty());
        assert!(reg.get("sum").is_none());
    }

    #[tokio::test]
    async fn registered_closure_is_callable_repeatedly() {
        let mut reg = ActionRegistry::<i64, String>::new();
        reg.register_fn("sum", sum).unwrap();

        let handler = reg.get("sum").unwrap();
        assert_eq!(handler.handle(vec![json!(2), json!(3)]).await, Ok(5));
        assert_eq!(handler.handle(vec![json!(4)]).await, Ok(4));
    }
}
