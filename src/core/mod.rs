//! Core task machinery: dispatch queue, state machine, futures, executor.

pub mod error;
pub mod executor;
pub mod future;
pub mod queue;
pub mod task;

pub use error::{ExecutorError, TaskError, TaskResult};
pub use executor::{make_thread_pool_executor, Executor};
pub use future::Future;
pub use queue::CancellableQueue;
pub use task::{ClosureTask, Task, TaskCore, TaskHandle, TaskState};
