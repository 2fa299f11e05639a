//! Executor configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default number of worker threads: the CPU count.
fn default_worker_count() -> usize {
    num_cpus::get()
}

/// Default thread stack size: 2MB.
fn default_thread_stack_size() -> usize {
    2 * 1024 * 1024
}

/// Default pause after re-enqueueing a not-yet-ready task, in microseconds.
fn default_requeue_pause_us() -> u64 {
    50
}

/// Configuration for the [`Executor`](crate::core::Executor).
///
/// # Example
///
/// ```rust
/// use gantry::config::ExecutorConfig;
///
/// let config = ExecutorConfig::new()
///     .with_worker_count(4)
///     .with_requeue_pause_us(100);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Number of worker threads.
    ///
    /// Default: `num_cpus::get()`.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Stack size per worker thread in bytes.
    ///
    /// Default: 2MB (2 * 1024 * 1024 bytes).
    #[serde(default = "default_thread_stack_size")]
    pub thread_stack_size: usize,

    /// Pause after a worker re-enqueues a task it could not run, in
    /// microseconds. Bounds the busy-poll when the queue holds only
    /// not-yet-ready tasks; zero disables the pause.
    ///
    /// Default: 50.
    #[serde(default = "default_requeue_pause_us")]
    pub requeue_pause_us: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            thread_stack_size: default_thread_stack_size(),
            requeue_pause_us: default_requeue_pause_us(),
        }
    }
}

impl ExecutorConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of worker threads.
    #[must_use]
    pub fn with_worker_count(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    /// Set the thread stack size.
    #[must_use]
    pub fn with_thread_stack_size(mut self, size: usize) -> Self {
        self.thread_stack_size = size;
        self
    }

    /// Set the re-enqueue pause in microseconds.
    #[must_use]
    pub fn with_requeue_pause_us(mut self, pause_us: u64) -> Self {
        self.requeue_pause_us = pause_us;
        self
    }

    /// Get the re-enqueue pause as a `Duration`.
    #[must_use]
    pub fn requeue_pause(&self) -> Duration {
        Duration::from_micros(self.requeue_pause_us)
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.worker_count == 0 {
            return Err("worker_count must be greater than 0".into());
        }
        if self.thread_stack_size < 64 * 1024 {
            return Err("thread_stack_size must be at least 64KB".into());
        }
        Ok(())
    }

    /// Parse a configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: ExecutorConfig =
            serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ExecutorConfig::default();
        assert!(config.worker_count > 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let config = ExecutorConfig::new()
            .with_worker_count(3)
            .with_thread_stack_size(128 * 1024)
            .with_requeue_pause_us(200);
        assert_eq!(config.worker_count, 3);
        assert_eq!(config.thread_stack_size, 128 * 1024);
        assert_eq!(config.requeue_pause(), Duration::from_micros(200));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let config = ExecutorConfig::new().with_worker_count(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tiny_stack_rejected() {
        let config = ExecutorConfig::new().with_thread_stack_size(1024);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_json_with_defaults() {
        let config = ExecutorConfig::from_json_str(r#"{"worker_count": 2}"#).unwrap();
        assert_eq!(config.worker_count, 2);
        assert_eq!(config.thread_stack_size, 2 * 1024 * 1024);
        assert_eq!(config.requeue_pause_us, 50);
    }

    #[test]
    fn test_from_json_rejects_invalid() {
        assert!(ExecutorConfig::from_json_str(r#"{"worker_count": 0}"#).is_err());
        assert!(ExecutorConfig::from_json_str("not json").is_err());
    }
}
