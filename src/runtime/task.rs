//! Task cells: one dispatched call and its lifecycle.
//!
//! A task moves `Pending -> Running -> Resolved | Failed` exactly once.
//! Waiters block on a condition variable until the task settles; the
//! settled outcome never changes afterwards.

use super::value::{Callable, Value};
use crate::errors::{Error, Result};
use parking_lot::{Condvar, Mutex};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::trace;

/// Settled outcome of a task. Failures are shared so every fetch of the
/// key reproduces the same error.
pub type Outcome = std::result::Result<Value, Arc<Error>>;

/// Lifecycle state of a task.
#[derive(Debug, Clone)]
pub enum TaskState {
    Pending,
    Running,
    Resolved(Value),
    Failed(Arc<Error>),
}

/// Observable summary of a task's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Running,
    Resolved,
    Failed,
}

impl TaskState {
    pub fn status(&self) -> TaskStatus {
        match self {
            TaskState::Pending => TaskStatus::Pending,
            TaskState::Running => TaskStatus::Running,
            TaskState::Resolved(_) => TaskStatus::Resolved,
            TaskState::Failed(_) => TaskStatus::Failed,
        }
    }

    fn outcome(&self) -> Option<Outcome> {
        match self {
            TaskState::Resolved(value) => Some(Ok(value.clone())),
            TaskState::Failed(err) => Some(Err(Arc::clone(err))),
            TaskState::Pending | TaskState::Running => None,
        }
    }
}

/// One unit of dispatched work.
pub struct Task {
    callee: String,
    callable: Arc<dyn Callable>,
    args: Vec<Value>,
    state: Mutex<TaskState>,
    settled: Condvar,
}

impl Task {
    fn new(callee: String, callable: Arc<dyn Callable>, args: Vec<Value>) -> Self {
        Self {
            callee,
            callable,
            args,
            state: Mutex::new(TaskState::Pending),
            settled: Condvar::new(),
        }
    }

    /// Run the call on the current thread and publish the outcome.
    fn run(&self) {
        *self.state.lock() = TaskState::Running;
        trace!(callee = %self.callee, "task running");

        let result = panic::catch_unwind(AssertUnwindSafe(|| self.callable.call(&self.args)))
            .unwrap_or_else(|payload| Err(Error::Panicked(panic_message(payload.as_ref()))));

        let state = match result {
            Ok(value) => TaskState::Resolved(value),
            Err(err) => TaskState::Failed(Arc::new(err)),
        };
        *self.state.lock() = state;
        self.settled.notify_all();
    }

    /// Block until the task settles.
    fn wait(&self) -> Outcome {
        let mut state = self.state.lock();
        loop {
            if let Some(outcome) = state.outcome() {
                return outcome;
            }
            self.settled.wait(&mut state);
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Opaque reference to a dispatched task.
///
/// Handles are produced by `ResultsStore::dispatch` and consumed by
/// `ResultsStore::bind`; rewritten code never inspects them.
#[derive(Clone)]
pub struct TaskHandle(Arc<Task>);

impl TaskHandle {
    pub(crate) fn new(callee: String, callable: Arc<dyn Callable>, args: Vec<Value>) -> Self {
        Self(Arc::new(Task::new(callee, callable, args)))
    }

    pub(crate) fn run(&self) {
        self.0.run();
    }

    pub(crate) fn wait(&self) -> Outcome {
        self.0.wait()
    }

    /// Name of the dispatched callee.
    pub fn callee(&self) -> &str {
        &self.0.callee
    }

    pub fn status(&self) -> TaskStatus {
        self.0.state.lock().status()
    }

    pub fn same_task(&self, other: &TaskHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn address(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl std::fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("callee", &self.0.callee)
            .field("status", &self.status())
            .finish()
    }
}

/// Convert a settled outcome into the result seen by a fetch of `key`.
pub(crate) fn outcome_for_key(key: &str, outcome: &Outcome) -> Result<Value> {
    match outcome {
        Ok(value) => Ok(value.clone()),
        Err(err) => Err(Error::TaskFailed {
            key: key.to_string(),
            source: Arc::clone(err),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::NativeFn;

    #[test]
    fn test_task_resolves_on_run() {
        let handle = TaskHandle::new(
            "ten".into(),
            Arc::new(NativeFn::new("ten", 0, |_| Ok(Value::Int(10)))),
            vec![],
        );
        assert_eq!(handle.status(), TaskStatus::Pending);
        handle.run();
        assert_eq!(handle.status(), TaskStatus::Resolved);
        assert_eq!(handle.wait().unwrap(), Value::Int(10));
    }

    #[test]
    fn test_panic_becomes_failure() {
        let handle = TaskHandle::new(
            "explode".into(),
            Arc::new(NativeFn::new("explode", 0, |_| panic!("kaboom"))),
            vec![],
        );
        handle.run();
        assert_eq!(handle.status(), TaskStatus::Failed);
        let err = handle.wait().unwrap_err();
        assert!(matches!(err.as_ref(), Error::Panicked(msg) if msg == "kaboom"));
    }
}
