//! # Gantry
//!
//! An in-process task execution engine: a thread-pool-backed scheduler that
//! runs user-supplied computations under a readiness model combining
//! dependency completion, trigger (first-of) completion, and absolute time
//! gates.
//!
//! ## Modules
//!
//! - [`core`](crate::core) - the cancellable dispatch queue, the task state
//!   machine, typed futures, and the executor with its combinators
//! - [`config`](crate::config) - executor configuration
//! - [`util`](crate::util) - telemetry helpers
//!
//! ## Examples
//!
//! ### Running a computation
//!
//! ```
//! use gantry::make_thread_pool_executor;
//!
//! let executor = make_thread_pool_executor(2).expect("spawn pool");
//! let answer = executor.invoke(|| Ok(21 * 2));
//! assert_eq!(answer.get().unwrap(), 42);
//! ```
//!
//! ### Composing tasks
//!
//! ```
//! use gantry::{make_thread_pool_executor, Task};
//!
//! let executor = make_thread_pool_executor(2).expect("spawn pool");
//!
//! let first = executor.invoke(|| Ok(7));
//! let second = executor.then(&first, || Ok("ready"));
//! assert_eq!(second.get().unwrap(), "ready");
//! assert!(first.is_completed());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod core;
pub mod util;

// Re-export main types for convenience
pub use crate::config::ExecutorConfig;
pub use crate::core::{
    make_thread_pool_executor, CancellableQueue, ClosureTask, Executor, ExecutorError, Future,
    Task, TaskCore, TaskError, TaskHandle, TaskResult, TaskState,
};
