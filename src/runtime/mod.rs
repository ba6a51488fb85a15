//! Task scheduler and results store.
//!
//! Runtime half of the parallelization: a shared [`WorkerPool`], the
//! per-invocation [`ResultsStore`] that owns dispatched tasks, and the
//! [`Value`]/[`Callable`] types those tasks produce and run.

pub mod pool;
pub mod store;
pub mod task;
pub mod value;

pub use pool::WorkerPool;
pub use store::ResultsStore;
pub use task::{TaskHandle, TaskState, TaskStatus};
pub use value::{Callable, FunctionRef, NativeFn, Value};
