//! Execution of original and rewritten function bodies.

mod backend;
mod interpreter;
mod output;

pub use backend::{Backend, Executable, ParallelFunction, SequentialFunction};
pub use interpreter::Interpreter;
pub use output::{CaptureSink, OutputSink, StdoutSink};
