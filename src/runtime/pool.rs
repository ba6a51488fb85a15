//! Shared worker pool.
//!
//! One pool is built at process start and handed to every results store
//! through an `Arc`; stores never create threads of their own.

use crate::config::ParallelConfig;
use crate::errors::Result;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

/// Fixed-size pool that runs dispatched tasks.
pub struct WorkerPool {
    pool: ThreadPool,
    size: usize,
}

impl WorkerPool {
    /// Build a pool sized by `config`.
    pub fn new(config: &ParallelConfig) -> Result<Self> {
        Self::with_size(config.effective_workers())
    }

    /// Build a pool with exactly `size` workers (at least one).
    pub fn with_size(size: usize) -> Result<Self> {
        let size = size.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(size)
            .thread_name(|i| format!("purepar-worker-{}", i))
            .build()?;
        debug!(workers = size, "worker pool started");
        Ok(Self { pool, size })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Enqueue one unit of work. Never blocks.
    pub fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.pool.spawn(job);
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool").field("size", &self.size).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_pool_size_is_at_least_one() {
        let pool = WorkerPool::with_size(0).unwrap();
        assert_eq!(pool.size(), 1);
    }

    #[test]
    fn test_pool_from_config() {
        let config = ParallelConfig {
            max_concurrency: Some(3),
            extra_worker: true,
            ..Default::default()
        };
        let pool = WorkerPool::new(&config).unwrap();
        assert_eq!(pool.size(), 4);
    }

    #[test]
    fn test_spawn_runs_job() {
        let pool = WorkerPool::with_size(2).unwrap();
        let (tx, rx) = mpsc::channel();
        pool.spawn(move || tx.send(42).unwrap());
        assert_eq!(rx.recv().unwrap(), 42);
    }
}
