//! purepar: automatic parallelization of pure function bodies.
//!
//! A function tree is checked by the purity analyzer; if it passes, the
//! dataflow rewriter turns each `x = f(...)` into a dispatch onto a shared
//! worker pool and each later read of `x` into a blocking fetch from a
//! per-invocation results store. The rewritten function is loaded by a
//! backend and wrapped in a memo table.
//!
//! ```ignore
//! use purepar::tree::build::*;
//! use purepar::{parallelize, FunctionDef, FunctionTable, Value};
//! use std::sync::Arc;
//!
//! let double = FunctionDef::new("double", ["n"], vec![ret(mul(name("n"), int(2)))]);
//! let sum = FunctionDef::new(
//!     "sum",
//!     ["a", "b"],
//!     vec![
//!         assign(name("x"), call(name("double"), vec![name("a")])),
//!         assign(name("y"), call(name("double"), vec![name("b")])),
//!         ret(add(name("x"), name("y"))),
//!     ],
//! );
//! let env = Arc::new(FunctionTable::new().define(double));
//! let parallel = parallelize(&sum, env)?;
//! assert_eq!(parallel.call(&[Value::Int(1), Value::Int(2)])?, Value::Int(6));
//! ```

// Export modules for library usage
pub mod analysis;
pub mod config;
pub mod errors;
pub mod eval;
pub mod memo;
pub mod observability;
pub mod pipeline;
pub mod rewrite;
pub mod runtime;
pub mod tree;

// Re-export commonly used types
pub use crate::analysis::{
    analyze, Environment, FunctionDescriptor, FunctionKind, FunctionTable, PurityAnalyzer,
    PurityReport,
};

pub use crate::config::{
    load_config, load_config_from_dir, ArgumentPolicy, MemoConfig, MutualRecursionPolicy,
    ParallelConfig, PureparConfig, RewriteOptions, StoreLifecycle,
};

pub use crate::errors::{Error, Result, ResultExt};

pub use crate::eval::{Backend, CaptureSink, Executable, Interpreter, OutputSink};

pub use crate::memo::Memoized;

pub use crate::pipeline::{parallelize, Parallelizer};

pub use crate::rewrite::rewrite;

pub use crate::runtime::{Callable, NativeFn, ResultsStore, TaskStatus, Value, WorkerPool};

pub use crate::tree::{FunctionDef, NodeRef, TreeNode};
