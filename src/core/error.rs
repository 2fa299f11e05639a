//! Error types for task and executor operations.

use std::sync::Arc;

use thiserror::Error;

/// Result alias used by task bodies and typed result retrieval.
pub type TaskResult<T = ()> = Result<T, TaskError>;

/// Failure outcome captured on a task.
///
/// The error is stored on the task before the `Failed` state becomes
/// observable and handed out to every waiter that asks, so the payload is
/// shared rather than owned.
#[derive(Debug, Clone, Error)]
pub enum TaskError {
    /// The task body returned an error.
    #[error("task failed: {0}")]
    Failed(Arc<anyhow::Error>),
    /// The task body panicked; the panic message is preserved.
    #[error("task panicked: {0}")]
    Panicked(String),
    /// The task was canceled before it could run.
    #[error("task canceled")]
    Canceled,
}

impl TaskError {
    /// Build a `Failed` error from a plain message.
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(Arc::new(anyhow::Error::msg(msg.into())))
    }

    /// True when this error reports cancellation rather than a failure.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }
}

impl From<anyhow::Error> for TaskError {
    fn from(err: anyhow::Error) -> Self {
        Self::Failed(Arc::new(err))
    }
}

/// Errors produced when constructing an executor.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The OS refused to spawn a worker thread.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_display_carries_message() {
        let err = TaskError::failed("disk on fire");
        assert_eq!(err.to_string(), "task failed: disk on fire");
        assert!(!err.is_canceled());
    }

    #[test]
    fn test_canceled_display() {
        let err = TaskError::Canceled;
        assert_eq!(err.to_string(), "task canceled");
        assert!(err.is_canceled());
    }

    #[test]
    fn test_from_anyhow() {
        let err: TaskError = anyhow::anyhow!("context missing").into();
        assert!(err.to_string().contains("context missing"));
    }

    #[test]
    fn test_clone_shares_payload() {
        let err = TaskError::failed("shared");
        let other = err.clone();
        assert_eq!(err.to_string(), other.to_string());
    }
}
