//! Turning rewritten definitions into callables.
//!
//! A [`Backend`] loads a rewritten [`FunctionDef`] and hands back an
//! [`Executable`]. The interpreter is the only backend shipped here; a
//! code generator would implement the same trait.

use super::interpreter::Interpreter;
use crate::config::StoreLifecycle;
use crate::errors::Result;
use crate::runtime::{ResultsStore, Value};
use crate::tree::FunctionDef;
use std::sync::Arc;
use tracing::debug_span;

/// A loaded function ready to be called.
pub trait Executable: Send + Sync {
    fn name(&self) -> &str;
    fn call(&self, args: &[Value]) -> Result<Value>;
}

/// Produces executables from rewritten definitions.
pub trait Backend: Send + Sync {
    fn load(&self, def: Arc<FunctionDef>, lifecycle: StoreLifecycle)
        -> Result<Arc<dyn Executable>>;
}

impl Backend for Interpreter {
    fn load(
        &self,
        def: Arc<FunctionDef>,
        lifecycle: StoreLifecycle,
    ) -> Result<Arc<dyn Executable>> {
        let shared = match lifecycle {
            StoreLifecycle::Fresh => None,
            StoreLifecycle::Reset => Some(Arc::new(ResultsStore::new(Arc::clone(self.pool())))),
        };
        Ok(Arc::new(ParallelFunction {
            def,
            interpreter: self.clone(),
            shared,
        }))
    }
}

/// A rewritten function run by the interpreter.
///
/// With a shared store (reset lifecycle) calls are serialized on the
/// store's invocation guard; otherwise each call builds its own store.
pub struct ParallelFunction {
    def: Arc<FunctionDef>,
    interpreter: Interpreter,
    shared: Option<Arc<ResultsStore>>,
}

impl ParallelFunction {
    /// The store reused across calls, if any.
    pub fn shared_store(&self) -> Option<&Arc<ResultsStore>> {
        self.shared.as_ref()
    }
}

impl Executable for ParallelFunction {
    fn name(&self) -> &str {
        &self.def.name
    }

    fn call(&self, args: &[Value]) -> Result<Value> {
        let _span = debug_span!("parallel_call", function = %self.def.name).entered();
        match &self.shared {
            None => self.interpreter.call_function(&self.def, args),
            Some(store) => {
                let _invocation = store.begin_invocation();
                self.interpreter
                    .call_with_store(&self.def, args, Some(Arc::clone(store)))
            }
        }
    }
}

/// Executes a definition unchanged, without a store.
pub struct SequentialFunction {
    def: Arc<FunctionDef>,
    interpreter: Interpreter,
}

impl SequentialFunction {
    pub fn new(def: Arc<FunctionDef>, interpreter: Interpreter) -> Self {
        Self { def, interpreter }
    }
}

impl Executable for SequentialFunction {
    fn name(&self) -> &str {
        &self.def.name
    }

    fn call(&self, args: &[Value]) -> Result<Value> {
        self.interpreter.call_function(&self.def, args)
    }
}
