//! Shared error types for purepar
//!
//! The taxonomy follows the life of a parallelized function:
//!
//! - **PurityViolation**: the analyzer found diagnostics; the gate refuses
//!   to build a parallel version. Carries the full report.
//! - **RewriteAssertion**: the rewriter met a shape a passing report rules
//!   out. Always a bug in the caller (ungated rewrite) or in the analyzer.
//! - **TaskFailed**: a dispatched unit of work failed; raised lazily at the
//!   first `fetch` of its key and reproduced on every later fetch.
//!
//! The remaining variants cover evaluation, configuration and the worker
//! pool.

use crate::analysis::PurityReport;
use std::sync::Arc;
use thiserror::Error;

/// Main error type for purepar operations
#[derive(Debug, Error)]
pub enum Error {
    /// The function body failed the purity check
    #[error("function {function} is not strictly functional ({} diagnostic(s))", .report.diagnostics().len())]
    PurityViolation {
        function: String,
        report: Box<PurityReport>,
    },

    /// Internal invariant violation in the dataflow rewriter
    #[error("rewrite of {function} failed: {message}")]
    RewriteAssertion { function: String, message: String },

    /// A dispatched task raised an error
    #[error("task {key} failed: {source}")]
    TaskFailed {
        key: String,
        #[source]
        source: Arc<Error>,
    },

    /// A fetch addressed a key no task was bound to
    #[error("no task is bound to {0}")]
    UnknownTask(String),

    /// A second task was bound to an occupied key
    #[error("a task is already bound to {0}")]
    DuplicateTask(String),

    /// A name could not be resolved during evaluation
    #[error("name {0} is not bound")]
    UnboundName(String),

    /// A callable was invoked with the wrong number of arguments
    #[error("{function} expects {expected} argument(s), got {found}")]
    Arity {
        function: String,
        expected: usize,
        found: usize,
    },

    /// Operands or callees of the wrong kind
    #[error("type error: {0}")]
    Type(String),

    /// A construct the evaluator does not execute
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// An error raised by a callable on purpose
    #[error("{0}")]
    Raised(String),

    /// A callable panicked while running on a worker
    #[error("task panicked: {0}")]
    Panicked(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Worker pool construction errors
    #[error("worker pool error: {0}")]
    Pool(String),

    /// Generic errors with context
    #[error("{context}: {message}")]
    WithContext { context: String, message: String },

    /// IO errors
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a purity violation from a failing report
    pub fn purity_violation(report: PurityReport) -> Self {
        Self::PurityViolation {
            function: report.function().to_string(),
            report: Box::new(report),
        }
    }

    /// Create a rewrite assertion failure
    pub fn rewrite_assertion(function: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RewriteAssertion {
            function: function.into(),
            message: message.into(),
        }
    }

    /// Create an error a callable raises deliberately
    pub fn raised(message: impl Into<String>) -> Self {
        Self::Raised(message.into())
    }

    /// Create a type error
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::Type(message.into())
    }

    /// Create an unsupported-construct error
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }

    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            message: self.to_string(),
        }
    }

    /// The purity report of a `PurityViolation`
    pub fn purity_report(&self) -> Option<&PurityReport> {
        match self {
            Self::PurityViolation { report, .. } => Some(&**report),
            _ => None,
        }
    }

    /// The underlying task error of a `TaskFailed`, unwrapping nested
    /// task failures.
    pub fn root_task_error(&self) -> Option<&Error> {
        match self {
            Self::TaskFailed { source, .. } => {
                Some(source.root_task_error().unwrap_or(source.as_ref()))
            }
            _ => None,
        }
    }
}

impl From<rayon::ThreadPoolBuildError> for Error {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        Self::Pool(err.to_string())
    }
}

/// Result type alias using our error type
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_context_keeps_message() {
        let err = Error::raised("boom").with_context("calling f");
        assert_eq!(err.to_string(), "calling f: boom");
    }

    #[test]
    fn test_root_task_error_unwraps_nesting() {
        let inner = Error::TaskFailed {
            key: "y".into(),
            source: Arc::new(Error::raised("boom")),
        };
        let outer = Error::TaskFailed {
            key: "x".into(),
            source: Arc::new(inner),
        };
        assert_eq!(outer.root_task_error().unwrap().to_string(), "boom");
    }

    #[test]
    fn test_result_ext_context() {
        let result: Result<()> = Err(Error::UnknownTask("x".into()));
        let err = result.context("fetching").unwrap_err();
        assert!(matches!(err, Error::WithContext { .. }));
    }
}
