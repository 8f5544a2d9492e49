use thiserror::Error;

/// Returned synchronously from `enqueue`. The queue is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnqueueError {
    /// The action does not resolve to something callable.
    #[error("Please provide a function to enqueue.")]
    InvalidTask,

    /// Arguments were given but are not a JSON array.
    #[error("Please provide task arguments as an array to enqueue.")]
    InvalidArguments,

    #[error("no tokio runtime is available to drive the queue")]
    NoRuntime,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("action '{0}' is already registered")]
    DuplicateAction(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages_are_exact() {
        assert_eq!(
            EnqueueError::InvalidTask.to_string(),
            "Please provide a function to enqueue."
        );
        assert_eq!(
            EnqueueError::InvalidArguments.to_string(),
            "Please provide task arguments as an array to enqueue."
        );
    }

    #[test]
    fn duplicate_action_names_the_action() {
        let err = RegistryError::DuplicateAction("add".to_string());
        assert!(err.to_string().contains("'add'"));
    }
}
