//! Memoizing invoker.
//!
//! Wraps an [`Executable`] so that repeated calls with equal arguments
//! return the first result without running the function again, and
//! therefore without dispatching any tasks.
//!
//! The table lives as long as the wrapper. By default it grows without
//! bound; with `max_entries = Some(n)` it stops accepting new entries once
//! `n` are stored and later misses are computed but not recorded. The bound
//! is exact under concurrent misses. Entries are never evicted. Failed calls are not recorded.

use crate::config::MemoConfig;
use crate::errors::Result;
use crate::eval::Executable;
use crate::runtime::Value;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::trace;

pub struct Memoized {
    inner: Arc<dyn Executable>,
    table: DashMap<Vec<Value>, Value>,
    config: MemoConfig,
    /// Entries inserted, reserved under the entry guard so the bound holds
    /// under concurrent misses
    entries: AtomicUsize,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl Memoized {
    pub fn new(inner: Arc<dyn Executable>, config: MemoConfig) -> Self {
        Self {
            inner,
            table: DashMap::new(),
            config,
            entries: AtomicUsize::new(0),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Cached result for `args`, computing it on a miss.
    ///
    /// Two threads missing on the same key at once both compute; the
    /// first insert is kept.
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        if let Some(hit) = self.table.get(args) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(function = self.inner.name(), "memo hit");
            return Ok(hit.value().clone());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let value = self.inner.call(args)?;
        match self.table.entry(args.to_vec()) {
            Entry::Occupied(existing) => Ok(existing.get().clone()),
            Entry::Vacant(vacant) => {
                if self.reserve_entry() {
                    vacant.insert(value.clone());
                }
                Ok(value)
            }
        }
    }

    /// Claim room for one more entry, failing once the table is full.
    fn reserve_entry(&self) -> bool {
        let max = self.config.max_entries;
        self.entries
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                max.map_or(true, |max| n < max).then_some(n + 1)
            })
            .is_ok()
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }

    /// Number of cached argument tuples.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Drop every entry. Not meant to race with `call`.
    pub fn clear(&self) {
        self.table.clear();
        self.entries.store(0, Ordering::Release);
    }
}

impl Executable for Memoized {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn call(&self, args: &[Value]) -> Result<Value> {
        Memoized::call(self, args)
    }
}

impl std::fmt::Debug for Memoized {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memoized")
            .field("function", &self.inner.name())
            .field("entries", &self.table.len())
            .field("hits", &self.hits())
            .field("misses", &self.misses())
            .finish()
    }
}
