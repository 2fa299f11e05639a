//! Worker pool driving the cancellable queue, plus the futures combinators.
//!
//! Workers follow a polling re-enqueue discipline: a popped task whose gates
//! are still closed goes back onto the shared queue rather than blocking the
//! worker. Progress on gated tasks therefore relies on other queue traffic or
//! on the gates opening; a bounded pause after an unproductive attempt keeps
//! the idle spin in check without changing semantics.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::ExecutorConfig;

use super::error::{ExecutorError, TaskError, TaskResult};
use super::future::Future;
use super::queue::CancellableQueue;
use super::task::{Task, TaskHandle};

/// Thread-pool task executor.
///
/// Owns a fixed-size pool of worker threads and a single shared dispatch
/// queue. Dropping the executor initiates shutdown and joins all workers.
pub struct Executor {
    queue: Arc<CancellableQueue<TaskHandle>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Executor {
    /// Spawn the worker pool described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::InvalidConfig`] when validation fails and
    /// [`ExecutorError::Spawn`] when the OS refuses a worker thread.
    pub fn new(config: ExecutorConfig) -> Result<Self, ExecutorError> {
        config.validate().map_err(ExecutorError::InvalidConfig)?;

        let queue = Arc::new(CancellableQueue::new());
        let workers = spawn_pool(&config, &queue)?;

        info!(worker_count = config.worker_count, "executor started");

        Ok(Self {
            queue,
            workers: Mutex::new(workers),
        })
    }

    /// Hand a pending task to the worker pool.
    ///
    /// When the executor is shutting down the task is canceled instead of
    /// admitted. Tasks that are no longer pending are ignored. Readiness
    /// edges must be fully wired before this call.
    pub fn submit(&self, task: TaskHandle) {
        if self.queue.is_canceled() {
            task.cancel();
            return;
        }
        if !task.is_pending() {
            return;
        }
        if !self.queue.push(Arc::clone(&task)) {
            // Shutdown raced the admission check.
            task.cancel();
        }
    }

    /// Stop admitting tasks and let the queue drain.
    ///
    /// Already-enqueued tasks are still popped by workers and may run to
    /// completion if their gates are open; submissions from here on are
    /// canceled.
    pub fn start_shutdown(&self) {
        debug!(queued = self.queue.len(), "executor shutdown requested");
        self.queue.cancel();
    }

    /// Join all worker threads. Safe to call more than once.
    pub fn wait_shutdown(&self) {
        let workers: Vec<_> = self.workers.lock().drain(..).collect();
        for handle in workers {
            let name = handle.thread().name().unwrap_or("worker").to_string();
            if handle.join().is_err() {
                warn!(worker = %name, "worker thread panicked");
            }
        }
    }

    /// Submit a computation and return a future for its value.
    pub fn invoke<T, F>(&self, body: F) -> Arc<Future<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> TaskResult<T> + Send + 'static,
    {
        let future = Future::new(body);
        self.submit(as_handle(&future));
        future
    }

    /// Submit a computation gated on `input` finishing (with any outcome).
    ///
    /// The body is free to capture `input` and inspect its result itself.
    pub fn then<U, T, F>(&self, input: &Arc<Future<T>>, body: F) -> Arc<Future<U>>
    where
        U: Send + 'static,
        T: Send + 'static,
        F: FnOnce() -> TaskResult<U> + Send + 'static,
    {
        let future = Future::new(body);
        future.add_dependency(as_handle(input));
        self.submit(as_handle(&future));
        future
    }

    /// Gather every input's value once all of them have finished.
    ///
    /// Values arrive in input order. If any input failed or was canceled,
    /// the first such error encountered in input order is surfaced instead.
    pub fn when_all<T>(&self, inputs: Vec<Arc<Future<T>>>) -> Arc<Future<Vec<T>>>
    where
        T: Clone + Send + 'static,
    {
        let gathered = inputs.clone();
        let future = Future::new(move || {
            let mut values = Vec::with_capacity(gathered.len());
            for input in &gathered {
                values.push(input.get()?);
            }
            Ok(values)
        });
        for input in &inputs {
            future.add_dependency(as_handle(input));
        }
        self.submit(as_handle(&future));
        future
    }

    /// Resolve with the first input to finish.
    pub fn when_first<T>(&self, inputs: Vec<Arc<Future<T>>>) -> Arc<Future<T>>
    where
        T: Clone + Send + 'static,
    {
        let gathered = inputs.clone();
        let future = Future::new(move || {
            for input in &gathered {
                if input.is_finished() {
                    return input.get();
                }
            }
            match gathered.first() {
                Some(input) => input.get(),
                None => Err(TaskError::failed("when_first requires at least one input")),
            }
        });
        for input in &inputs {
            future.add_trigger(as_handle(input));
        }
        self.submit(as_handle(&future));
        future
    }

    /// Gather the values of whichever inputs have finished by `deadline`.
    ///
    /// The aggregate carries no edges on its inputs, only a time gate, so
    /// it fires at the deadline (or later, depending on worker scheduling)
    /// and reports the subset finished by then, in input order.
    pub fn when_all_before_deadline<T>(
        &self,
        inputs: Vec<Arc<Future<T>>>,
        deadline: Instant,
    ) -> Arc<Future<Vec<T>>>
    where
        T: Clone + Send + 'static,
    {
        let future = Future::new(move || {
            let mut values = Vec::new();
            for input in &inputs {
                if input.is_finished() {
                    values.push(input.get()?);
                }
            }
            Ok(values)
        });
        future.set_time_trigger(deadline);
        self.submit(as_handle(&future));
        future
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        self.start_shutdown();
        self.wait_shutdown();
    }
}

/// Build an executor with `num_threads` workers and default settings.
///
/// # Errors
///
/// Propagates construction failures from [`Executor::new`].
pub fn make_thread_pool_executor(num_threads: usize) -> Result<Arc<Executor>, ExecutorError> {
    let config = ExecutorConfig::new().with_worker_count(num_threads);
    Ok(Arc::new(Executor::new(config)?))
}

fn as_handle<T: Send + 'static>(future: &Arc<Future<T>>) -> TaskHandle {
    Arc::clone(future) as TaskHandle
}

/// Spawn the full worker pool, unwinding on partial failure.
///
/// Each worker holds its own reference to the queue. On a spawn failure
/// midway the queue must be canceled and the workers already running must
/// be joined, or they stay parked in `pop` with no shutdown path: the
/// `Executor` carrying the `Drop` cleanup never comes into existence.
fn spawn_pool(
    config: &ExecutorConfig,
    queue: &Arc<CancellableQueue<TaskHandle>>,
) -> Result<Vec<JoinHandle<()>>, ExecutorError> {
    let mut workers = Vec::with_capacity(config.worker_count);
    for worker_id in 0..config.worker_count {
        match spawn_worker(
            worker_id,
            Arc::clone(queue),
            config.requeue_pause(),
            config.thread_stack_size,
        ) {
            Ok(handle) => workers.push(handle),
            Err(err) => {
                warn!(worker_id, error = %err, "worker spawn failed, unwinding pool");
                queue.cancel();
                for handle in workers {
                    let _ = handle.join();
                }
                return Err(ExecutorError::Spawn(err));
            }
        }
    }
    Ok(workers)
}

fn spawn_worker(
    worker_id: usize,
    queue: Arc<CancellableQueue<TaskHandle>>,
    requeue_pause: Duration,
    stack_size: usize,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("gantry-worker-{worker_id}"))
        .stack_size(stack_size)
        .spawn(move || {
            debug!(worker_id, "worker started");
            while let Some(task) = queue.pop() {
                if task.is_canceled() {
                    continue;
                }
                task.try_execute();
                if task.is_finished() {
                    continue;
                }
                if queue.push(Arc::clone(&task)) {
                    if !requeue_pause.is_zero() {
                        thread::sleep(requeue_pause);
                    }
                } else {
                    // Shutdown refused the re-enqueue; release the waiters.
                    task.cancel();
                }
            }
            debug!(worker_id, "worker exiting");
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::task::ClosureTask;

    #[test]
    fn test_invoke_runs_on_pool() {
        let executor = make_thread_pool_executor(2).unwrap();
        let future = executor.invoke(|| Ok(11));
        assert_eq!(future.get().unwrap(), 11);
    }

    #[test]
    fn test_submit_after_shutdown_cancels() {
        let executor = make_thread_pool_executor(1).unwrap();
        executor.start_shutdown();
        let task = ClosureTask::new(|| Ok(()));
        executor.submit(Arc::clone(&task) as Arc<dyn Task>);
        assert!(task.is_canceled());
        executor.wait_shutdown();
    }

    #[test]
    fn test_non_pending_submission_ignored() {
        let executor = make_thread_pool_executor(1).unwrap();
        let task = ClosureTask::new(|| Ok(()));
        task.cancel();
        executor.submit(Arc::clone(&task) as Arc<dyn Task>);
        assert!(task.is_canceled());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ExecutorConfig::new().with_worker_count(0);
        assert!(matches!(
            Executor::new(config),
            Err(ExecutorError::InvalidConfig(_))
        ));
    }
}
