//! Task state machine: readiness evaluation, atomic lifecycle, error capture,
//! and completion signaling.
//!
//! Every task embeds a [`TaskCore`]: an atomic state plus a mutex over the
//! readiness edges and the captured error, with a condition variable for
//! waiters. Implementations of [`Task`] supply only the body; the lifecycle
//! machinery lives here.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Condvar, Mutex};
use tracing::debug;

use super::error::{TaskError, TaskResult};

/// Lifecycle state of a task.
///
/// Transitions form a DAG: `Pending -> {Running, Canceled}` and
/// `Running -> {Completed, Failed}`. The three terminal states are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Not yet started; the only state from which execution or cancellation
    /// can begin.
    Pending,
    /// The body is executing. Cancellation is a no-op from here on.
    Running,
    /// The body returned successfully.
    Completed,
    /// The body returned an error or panicked.
    Failed,
    /// Canceled before the body ever ran.
    Canceled,
}

impl TaskState {
    /// True for `Completed`, `Failed`, and `Canceled`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Canceled)
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Pending,
            1 => Self::Running,
            2 => Self::Completed,
            3 => Self::Failed,
            _ => Self::Canceled,
        }
    }
}

/// Shared handle to any scheduled task.
pub type TaskHandle = Arc<dyn Task>;

/// Readiness edges and the captured error, guarded by the task mutex.
struct TaskGates {
    dependencies: Vec<TaskHandle>,
    triggers: Vec<TaskHandle>,
    time_trigger: Instant,
    error: Option<TaskError>,
}

/// State-machine kernel embedded in every task implementation.
///
/// Holds the atomic lifecycle state, the dependency/trigger/time gates, and
/// the completion signal. Edge collections keep strong references to the
/// gating tasks; the graph they form must stay acyclic. A cycle is never
/// detected: it leaks its reference loop and leaves its waiters blocked.
pub struct TaskCore {
    state: AtomicU8,
    gates: Mutex<TaskGates>,
    done: Condvar,
}

impl TaskCore {
    /// Create a core in `Pending` state with the time gate already open.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(TaskState::Pending as u8),
            gates: Mutex::new(TaskGates {
                dependencies: Vec::new(),
                triggers: Vec::new(),
                time_trigger: Instant::now(),
                error: None,
            }),
            done: Condvar::new(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TaskState {
        TaskState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// The captured failure, present iff the state is `Failed`.
    pub fn error(&self) -> Option<TaskError> {
        self.gates.lock().error.clone()
    }

    /// Gate execution on `dep` reaching any terminal state.
    ///
    /// Must not be called after the task has been submitted.
    pub fn add_dependency(&self, dep: TaskHandle) {
        self.gates.lock().dependencies.push(dep);
    }

    /// Gate execution on at least one trigger reaching a terminal state.
    ///
    /// Must not be called after the task has been submitted.
    pub fn add_trigger(&self, trigger: TaskHandle) {
        self.gates.lock().triggers.push(trigger);
    }

    /// Gate execution on the wall clock reaching `at`.
    ///
    /// A lower bound only: nothing cancels the task when the point passes
    /// without execution. Must not be called after submission.
    pub fn set_time_trigger(&self, at: Instant) {
        self.gates.lock().time_trigger = at;
    }

    /// Evaluate readiness and, if every gate is open, run `body` exactly once.
    ///
    /// Readiness is evaluated under the task lock for a consistent snapshot
    /// of the edge collections; the lock is released before the body runs.
    /// The `Pending -> Running` transition is a compare-and-set, so a
    /// concurrent `cancel` and an execution attempt cannot both win. Panics
    /// in the body are captured as failures rather than unwinding the worker.
    pub fn run_if_ready<F>(&self, body: F)
    where
        F: FnOnce() -> TaskResult,
    {
        {
            let gates = self.gates.lock();
            if gates.dependencies.iter().any(|dep| !dep.is_finished()) {
                return;
            }
            if !gates.triggers.is_empty() && !gates.triggers.iter().any(|t| t.is_finished()) {
                return;
            }
            if Instant::now() < gates.time_trigger {
                return;
            }
        }
        if self
            .state
            .compare_exchange(
                TaskState::Pending as u8,
                TaskState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return;
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(body));

        // The error must be in place before Failed becomes observable, and
        // the state change must happen under the lock so a waiter cannot
        // check the predicate and block between the store and the broadcast.
        let mut gates = self.gates.lock();
        let terminal = match outcome {
            Ok(Ok(())) => TaskState::Completed,
            Ok(Err(err)) => {
                debug!(error = %err, "task body failed");
                gates.error = Some(err);
                TaskState::Failed
            }
            Err(payload) => {
                let err = TaskError::Panicked(panic_message(payload.as_ref()));
                debug!(error = %err, "task body panicked");
                gates.error = Some(err);
                TaskState::Failed
            }
        };
        self.state.store(terminal as u8, Ordering::Release);
        self.done.notify_all();
    }

    /// Transition `Pending -> Canceled` and wake waiters; no-op otherwise.
    pub fn cancel(&self) {
        if self
            .state
            .compare_exchange(
                TaskState::Pending as u8,
                TaskState::Canceled as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
        {
            let _gates = self.gates.lock();
            self.done.notify_all();
        }
    }

    /// Block until the state is terminal.
    pub fn wait(&self) {
        let mut gates = self.gates.lock();
        self.done
            .wait_while(&mut gates, |_| !self.state().is_terminal());
    }
}

impl Default for TaskCore {
    fn default() -> Self {
        Self::new()
    }
}

/// A unit of scheduled work.
///
/// Implementors provide the body (`run`) and access to the embedded
/// [`TaskCore`]; the readiness edges, execution attempts, cancellation,
/// waiting, and state predicates are supplied here and delegate to the
/// core.
pub trait Task: Send + Sync {
    /// The embedded state-machine kernel.
    fn core(&self) -> &TaskCore;

    /// The task body. Invoked at most once, by `try_execute`.
    fn run(&self) -> TaskResult;

    /// Gate this task on `dep` finishing (any terminal state satisfies the
    /// edge). Edges must be wired before the task is submitted; additions
    /// after the first execution attempt are not re-evaluated reliably.
    fn add_dependency(&self, dep: TaskHandle) {
        self.core().add_dependency(dep);
    }

    /// Gate this task on at least one trigger finishing. An empty trigger
    /// set is trivially satisfied. Same pre-submission restriction as
    /// [`Task::add_dependency`].
    fn add_trigger(&self, trigger: TaskHandle) {
        self.core().add_trigger(trigger);
    }

    /// Gate this task on the clock reaching `at`.
    fn set_time_trigger(&self, at: Instant) {
        self.core().set_time_trigger(at);
    }

    /// Attempt execution: if all gates are open, run the body to a terminal
    /// state; otherwise return with the task unchanged.
    fn try_execute(&self) {
        self.core().run_if_ready(|| self.run());
    }

    /// Cancel the task if it has not started; no-op once running or finished.
    fn cancel(&self) {
        self.core().cancel();
    }

    /// Block until the task reaches a terminal state.
    fn wait(&self) {
        self.core().wait();
    }

    /// Current lifecycle state.
    fn state(&self) -> TaskState {
        self.core().state()
    }

    /// The captured failure, present iff the task failed.
    fn error(&self) -> Option<TaskError> {
        self.core().error()
    }

    /// True while the task has not started.
    fn is_pending(&self) -> bool {
        self.state() == TaskState::Pending
    }

    /// True while the body is executing.
    fn is_running(&self) -> bool {
        self.state() == TaskState::Running
    }

    /// True once the body returned successfully.
    fn is_completed(&self) -> bool {
        self.state() == TaskState::Completed
    }

    /// True once the body returned an error or panicked.
    fn is_failed(&self) -> bool {
        self.state() == TaskState::Failed
    }

    /// True once the task was canceled before running.
    fn is_canceled(&self) -> bool {
        self.state() == TaskState::Canceled
    }

    /// True in any terminal state.
    fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }
}

type BoxedBody = Box<dyn FnOnce() -> TaskResult + Send>;

/// Untyped task wrapping an arbitrary one-shot body.
pub struct ClosureTask {
    core: TaskCore,
    body: Mutex<Option<BoxedBody>>,
}

impl ClosureTask {
    /// Wrap `body` in a shareable task handle.
    pub fn new<F>(body: F) -> Arc<Self>
    where
        F: FnOnce() -> TaskResult + Send + 'static,
    {
        Arc::new(Self {
            core: TaskCore::new(),
            body: Mutex::new(Some(Box::new(body))),
        })
    }
}

impl Task for ClosureTask {
    fn core(&self) -> &TaskCore {
        &self.core
    }

    fn run(&self) -> TaskResult {
        let body = self
            .body
            .lock()
            .take()
            .ok_or_else(|| TaskError::failed("task body already consumed"))?;
        body()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "opaque panic payload".to_string()
    }
}
