//! Results store
//!
//! Owns the tasks of one function invocation. Rewritten code talks to the
//! store only by key:
//!
//! - `dispatch(callable, args)` enqueues the call on the shared worker pool
//!   and returns immediately with an opaque handle.
//! - `bind(key, handle)` records the handle under the variable name.
//! - `fetch(key)` blocks until the task settles, then replaces the handle
//!   with the settled outcome so later fetches neither block nor re-run.
//!   A failure is cached the same way and reproduced on every fetch.
//! - `reset()` clears the task map for the next invocation.
//!
//! The key map is a `DashMap`, so dispatches and fetches of different keys
//! only contend on a shard lock, and no shard lock is held while waiting
//! for a task.

use super::pool::WorkerPool;
use super::task::{outcome_for_key, Outcome, TaskHandle, TaskStatus};
use super::value::{Callable, Value};
use crate::errors::{Error, Result};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// What a key currently maps to.
#[derive(Debug, Clone)]
enum Slot {
    /// Dispatched and not yet fetched to completion
    Pending(TaskHandle),
    /// Settled outcome cached by the first completed fetch
    Settled(Outcome),
}

/// Per-invocation owner of dispatched tasks.
pub struct ResultsStore {
    pool: Arc<WorkerPool>,
    slots: DashMap<String, Slot>,
    invocation: Mutex<()>,
    dispatched: AtomicUsize,
}

impl ResultsStore {
    /// Create an empty store backed by the shared pool.
    pub fn new(pool: Arc<WorkerPool>) -> Self {
        Self {
            pool,
            slots: DashMap::new(),
            invocation: Mutex::new(()),
            dispatched: AtomicUsize::new(0),
        }
    }

    /// Submit `callable(args)` to the worker pool. Never blocks.
    pub fn dispatch(
        &self,
        callee: impl Into<String>,
        callable: Arc<dyn Callable>,
        args: Vec<Value>,
    ) -> TaskHandle {
        let handle = TaskHandle::new(callee.into(), callable, args);
        let worker_handle = handle.clone();
        self.pool.spawn(move || worker_handle.run());
        self.dispatched.fetch_add(1, Ordering::Relaxed);
        debug!(callee = handle.callee(), "task dispatched");
        handle
    }

    /// Bind a dispatched task to `key`.
    ///
    /// Each key may be bound once per invocation; a second bind is an
    /// invariant violation and fails with `DuplicateTask`.
    pub fn bind(&self, key: impl Into<String>, handle: TaskHandle) -> Result<()> {
        match self.slots.entry(key.into()) {
            Entry::Occupied(occupied) => Err(Error::DuplicateTask(occupied.key().clone())),
            Entry::Vacant(vacant) => {
                trace!(key = vacant.key().as_str(), "task bound");
                vacant.insert(Slot::Pending(handle));
                Ok(())
            }
        }
    }

    /// Dispatch and bind in one step.
    pub fn submit(
        &self,
        key: impl Into<String>,
        callee: impl Into<String>,
        callable: Arc<dyn Callable>,
        args: Vec<Value>,
    ) -> Result<()> {
        let handle = self.dispatch(callee, callable, args);
        self.bind(key, handle)
    }

    /// Value of the task bound to `key`, blocking until it is available.
    pub fn fetch(&self, key: &str) -> Result<Value> {
        let handle = match self.slots.get(key).map(|slot| slot.value().clone()) {
            None => return Err(Error::UnknownTask(key.to_string())),
            Some(Slot::Settled(outcome)) => return outcome_for_key(key, &outcome),
            Some(Slot::Pending(handle)) => handle,
        };

        trace!(key, "waiting for task");
        let outcome = handle.wait();

        // A reset may have replaced the slot while we waited; only cache
        // into the slot that still holds this task.
        if let Some(mut slot) = self.slots.get_mut(key) {
            if matches!(slot.value(), Slot::Pending(current) if current.same_task(&handle)) {
                *slot = Slot::Settled(outcome.clone());
            }
        }
        outcome_for_key(key, &outcome)
    }

    /// Status of the task bound to `key`, if any.
    pub fn status(&self, key: &str) -> Option<TaskStatus> {
        self.slots.get(key).map(|slot| match slot.value() {
            Slot::Pending(handle) => handle.status(),
            Slot::Settled(Ok(_)) => TaskStatus::Resolved,
            Slot::Settled(Err(_)) => TaskStatus::Failed,
        })
    }

    /// Whether the value for `key` has been cached by a fetch.
    pub fn is_cached(&self, key: &str) -> bool {
        self.slots
            .get(key)
            .is_some_and(|slot| matches!(slot.value(), Slot::Settled(_)))
    }

    /// Clear all tasks. Callers must not be awaiting any of them.
    pub fn reset(&self) {
        self.slots.clear();
    }

    /// Serialize invocations that share this store.
    ///
    /// Under the reuse lifecycle one store serves every call of a wrapped
    /// function; holding this guard for the whole call keeps concurrent
    /// invocations from observing each other's tasks.
    pub fn begin_invocation(&self) -> MutexGuard<'_, ()> {
        let guard = self.invocation.lock();
        self.reset();
        guard
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Total number of dispatches over the store's lifetime.
    pub fn dispatch_count(&self) -> usize {
        self.dispatched.load(Ordering::Relaxed)
    }

    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }
}

impl std::fmt::Debug for ResultsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultsStore")
            .field("tasks", &self.slots.len())
            .field("dispatched", &self.dispatch_count())
            .finish()
    }
}
