//! TaskQueueBuilder - queue construction with start-up validation.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::queue::{DEFAULT_QUEUE_NAME, TaskQueue};
use crate::registry::ActionRegistry;

/// Plain-data queue settings, loadable with serde.
///
/// ```ignore
/// let config: QueueConfig = serde_json::from_str(r#"{"name": "uploads", "expected_actions": ["put"]}"#)?;
/// let queue = TaskQueueBuilder::from_config(config).registry(registry).build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Attached to every log event of the queue.
    #[serde(default = "default_name")]
    pub name: String,

    /// Action names that must be registered before the queue is built.
    #[serde(default)]
    pub expected_actions: Vec<String>,
}

fn default_name() -> String {
    DEFAULT_QUEUE_NAME.to_string()
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            expected_actions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("Missing actions: {0:?}. These actions were expected but not registered.")]
    MissingActions(Vec<String>),
}

/// Builds a [`TaskQueue`].
///
/// # Fail-fast
/// - `expect_actions()` lists names the queue will be asked to run
/// - `build()` checks that every one of them is in the registry
/// - missing names are reported together as `BuildError::MissingActions`
pub struct TaskQueueBuilder<T, E> {
    name: String,
    registry: Option<Arc<ActionRegistry<T, E>>>,
    expected_actions: Vec<String>,
}

impl<T, E> TaskQueueBuilder<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub fn new() -> Self {
        Self::from_config(QueueConfig::default())
    }

    pub fn from_config(config: QueueConfig) -> Self {
        Self {
            name: config.name,
            registry: None,
            expected_actions: config.expected_actions,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn registry(mut self, registry: Arc<ActionRegistry<T, E>>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn expect_actions(mut self, names: &[&str]) -> Self {
        self.expected_actions
            .extend(names.iter().map(|name| name.to_string()));
        self
    }

    pub fn build(self) -> Result<TaskQueue<T, E>, BuildError> {
        let missing: BTreeSet<String> = self
            .expected_actions
            .iter()
            .filter(|name| {
                !self
                    .registry
                    .as_ref()
                    .is_some_and(|registry| registry.contains(name))
            })
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(BuildError::MissingActions(missing.into_iter().collect()));
        }

        Ok(TaskQueue::from_parts(self.name, self.registry))
    }
}

impl<T, E> Default for TaskQueueBuilder<T, E>
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
    use serde_json::Value;

    fn registry() -> Arc<ActionRegistry<i64, String>> {
        let mut registry = ActionRegistry::new();
        registry
            .register_fn("sum", |args: Vec<Value>| async move {
                Ok(args.iter().filter_map(Value::as_i64).sum())
            })
            .unwrap();
        Arc::new(registry)
    }

    #[test]
    fn test_build_success() {
        let queue = TaskQueueBuilder::new()
            .name("math")
            .registry(registry())
            .expect_actions(&["sum"])
            .build()
            .unwrap();
        assert_eq!(queue.name(), "math");
        assert!(queue.registry().is_some());
    }

    #[test]
    fn test_build_missing_actions() {
        let result = TaskQueueBuilder::new()
            .registry(registry())
            .expect_actions(&["sum", "product", "product"])
            .build();
        assert!(matches!(
            result,
            Err(BuildError::MissingActions(missing)) if missing == vec!["product".to_string()]
        ));
    }

    #[test]
    fn test_build_expectations_without_registry() {
        let result = TaskQueueBuilder::<i64, String>::new()
            .expect_actions(&["sum"])
            .build();
        assert!(matches!(result, Err(BuildError::MissingActions(_))));
    }

    #[test]
    fn test_build_defaults() {
        let queue = TaskQueueBuilder::<i64, String>::default().build().unwrap();
        assert_eq!(queue.name(), "seqline");
        assert!(queue.is_idle());
    }

    #[test]
    fn config_fills_defaults() {
        let config: QueueConfig = serde_json::from_str(r#"{"expected_actions": ["sum"]}"#).unwrap();
        assert_eq!(config.name, "seqline");
        assert_eq!(config.expected_actions, vec!["sum".to_string()]);

        let queue = TaskQueueBuilder::from_config(config)
            .registry(registry())
            .build()
            .unwrap();
        assert_eq!(queue.name(), "seqline");
    }
}
