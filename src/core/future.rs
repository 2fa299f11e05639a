//! Typed result-bearing tasks.

use std::sync::Arc;

use parking_lot::Mutex;

use super::error::{TaskError, TaskResult};
use super::task::{Task, TaskCore, TaskState};

type Producer<T> = Box<dyn FnOnce() -> TaskResult<T> + Send>;

/// A task whose body computes a value of type `T`, retrievable via
/// [`Future::get`] once the task finishes.
///
/// The result slot is populated before the `Completed` state becomes
/// observable, so a waiter that sees `Completed` always sees the value.
pub struct Future<T> {
    core: TaskCore,
    producer: Mutex<Option<Producer<T>>>,
    result: Mutex<Option<T>>,
}

impl<T: Send + 'static> Future<T> {
    /// Wrap a one-shot producer in a shareable future handle.
    ///
    /// The future is inert until submitted to an executor (or driven with
    /// [`Task::try_execute`] directly).
    pub fn new<F>(producer: F) -> Arc<Self>
    where
        F: FnOnce() -> TaskResult<T> + Send + 'static,
    {
        Arc::new(Self {
            core: TaskCore::new(),
            producer: Mutex::new(Some(Box::new(producer))),
            result: Mutex::new(None),
        })
    }
}

impl<T: Clone + Send + 'static> Future<T> {
    /// Block until the future finishes, then return its outcome.
    ///
    /// Returns the computed value on completion, the captured error on
    /// failure, and [`TaskError::Canceled`] when the task was canceled
    /// before it could run.
    pub fn get(&self) -> TaskResult<T> {
        self.wait();
        match self.state() {
            TaskState::Completed => self
                .result
                .lock()
                .as_ref()
                .cloned()
                .ok_or_else(|| TaskError::failed("result missing after completion")),
            TaskState::Failed => Err(self
                .error()
                .unwrap_or_else(|| TaskError::failed("error missing after failure"))),
            _ => Err(TaskError::Canceled),
        }
    }
}

impl<T: Send + 'static> Task for Future<T> {
    fn core(&self) -> &TaskCore {
        &self.core
    }

    fn run(&self) -> TaskResult {
        let producer = self
            .producer
            .lock()
            .take()
            .ok_or_else(|| TaskError::failed("future body already consumed"))?;
        let value = producer()?;
        *self.result.lock() = Some(value);
        Ok(())
    }
}
