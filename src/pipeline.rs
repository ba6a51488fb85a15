//! The "make this parallel" gate.
//!
//! [`Parallelizer::parallelize`] runs the whole chain for one function:
//! purity analysis, refusal with every diagnostic on failure, dataflow
//! rewrite, loading through a [`Backend`], and memoization.

use crate::analysis::{Environment, PurityAnalyzer, PurityReport};
use crate::config::PureparConfig;
use crate::errors::{Error, Result};
use crate::eval::{Backend, Interpreter};
use crate::memo::Memoized;
use crate::rewrite;
use crate::runtime::WorkerPool;
use crate::tree::FunctionDef;
use std::sync::Arc;
use tracing::{debug, info_span, warn};

/// Bundles configuration, the shared worker pool, the environment and the
/// backend used to load rewritten functions.
#[derive(Clone)]
pub struct Parallelizer {
    config: PureparConfig,
    pool: Arc<WorkerPool>,
    env: Arc<dyn Environment>,
    backend: Arc<dyn Backend>,
}

impl Parallelizer {
    /// Build a pool from `config.parallel` and use the interpreter backend.
    pub fn new(env: Arc<dyn Environment>, config: PureparConfig) -> Result<Self> {
        let pool = Arc::new(WorkerPool::new(&config.parallel)?);
        Ok(Self::with_pool(env, config, pool))
    }

    /// Share an existing pool.
    pub fn with_pool(
        env: Arc<dyn Environment>,
        config: PureparConfig,
        pool: Arc<WorkerPool>,
    ) -> Self {
        let backend = Arc::new(Interpreter::new(Arc::clone(&env), Arc::clone(&pool)));
        Self {
            config,
            pool,
            env,
            backend,
        }
    }

    /// Load rewritten functions through `backend` instead.
    pub fn with_backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn config(&self) -> &PureparConfig {
        &self.config
    }

    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    /// Analysis only.
    pub fn check(&self, def: &FunctionDef) -> PurityReport {
        PurityAnalyzer::with_config(self.env.as_ref(), self.config.analysis.clone())
            .analyze(def)
    }

    /// Analyze and rewrite, refusing impure functions.
    pub fn prepare(&self, def: &FunctionDef) -> Result<FunctionDef> {
        let report = self.check(def);
        if !report.ok() {
            for line in report.trace() {
                warn!("{}", line);
            }
            return Err(Error::purity_violation(report));
        }
        rewrite::rewrite(def, self.config.rewrite)
    }

    /// The full chain: analyze, rewrite, load, memoize.
    pub fn parallelize(&self, def: &FunctionDef) -> Result<Memoized> {
        let _span = info_span!("parallelize", function = %def.name).entered();
        let rewritten = self.prepare(def)?;
        debug!(statements = rewritten.body.len(), "rewrite complete");
        let executable = self
            .backend
            .load(Arc::new(rewritten), self.config.rewrite.lifecycle)?;
        Ok(Memoized::new(executable, self.config.memo.clone()))
    }
}

impl std::fmt::Debug for Parallelizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parallelizer")
            .field("config", &self.config)
            .field("workers", &self.pool.size())
            .finish_non_exhaustive()
    }
}

/// Parallelize `def` with the default configuration.
pub fn parallelize(def: &FunctionDef, env: Arc<dyn Environment>) -> Result<Memoized> {
    Parallelizer::new(env, PureparConfig::default())?.parallelize(def)
}
