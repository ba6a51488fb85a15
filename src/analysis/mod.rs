//! Static purity analysis of function bodies.
//!
//! [`analyze`] checks one [`FunctionDef`](crate::tree::FunctionDef) against
//! an [`Environment`] and returns a [`PurityReport`]. The analyzer only
//! reports; deciding whether to abort is left to the caller (see
//! [`crate::pipeline`]).

pub mod environment;
pub mod purity;
mod report;

pub use environment::{Environment, FunctionDescriptor, FunctionKind, FunctionTable};
pub use purity::{analyze, PurityAnalyzer};
pub use report::PurityReport;
