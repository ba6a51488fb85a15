//! Parallelism configuration for the shared worker pool.

use serde::{Deserialize, Serialize};

/// Default value for parallel processing enabled
fn default_enabled() -> bool {
    true
}

/// Configuration for the worker pool that runs dispatched tasks.
///
/// # Example
///
/// ```rust
/// use purepar::config::ParallelConfig;
///
/// let config = ParallelConfig {
///     enabled: true,
///     max_concurrency: Some(4),
///     extra_worker: true,
/// };
/// assert_eq!(config.effective_workers(), 5);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParallelConfig {
    /// Enable parallel execution (default: true)
    ///
    /// When disabled the pool has a single worker, so dispatched tasks
    /// run one after another. Useful for debugging.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Number of workers (default: number of CPU cores)
    #[serde(default)]
    pub max_concurrency: Option<usize>,

    /// Add one worker on top of the core count (default: false)
    #[serde(default)]
    pub extra_worker: bool,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_concurrency: None,
            extra_worker: false,
        }
    }
}

impl ParallelConfig {
    /// Create a new parallel config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config with parallel execution disabled.
    pub fn sequential() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Get the effective concurrency level.
    ///
    /// Returns the configured max_concurrency, or the number of
    /// available CPU cores if not specified.
    pub fn effective_concurrency(&self) -> usize {
        self.max_concurrency.unwrap_or_else(num_cpus::get).max(1)
    }

    /// Number of workers the pool should start.
    pub fn effective_workers(&self) -> usize {
        if !self.enabled {
            return 1;
        }
        self.effective_concurrency() + usize::from(self.extra_worker)
    }
}
