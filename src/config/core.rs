use serde::{Deserialize, Serialize};

use super::parallel::ParallelConfig;

/// How the analyzer treats a callee that is already being analyzed
/// further up the call stack (mutual recursion).
///
/// Self-recursion is always accepted and is not governed by this policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutualRecursionPolicy {
    /// Report the cyclic call as a violation
    #[default]
    Reject,
    /// Assume the function on the stack is pure; any violation inside the
    /// cycle is still found when its own body is analyzed
    AssumePure,
}

/// Analyzer settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub mutual_recursion: MutualRecursionPolicy,
}

/// How the per-invocation results store comes into being.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreLifecycle {
    /// Construct a fresh store at the start of every call
    #[default]
    Fresh,
    /// Reuse one store per wrapped function, cleared at the start of
    /// every call; calls to the same function are serialized
    Reset,
}

/// What a dispatch carries as arguments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgumentPolicy {
    /// Evaluate the call's arguments in the caller and pass them along
    #[default]
    Forward,
    /// Dispatch with an empty argument list
    Drop,
}

/// Dataflow rewrite settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteOptions {
    #[serde(default)]
    pub lifecycle: StoreLifecycle,
    #[serde(default)]
    pub arguments: ArgumentPolicy,
}

/// Memo table settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoConfig {
    /// Maximum number of cached results (default: unbounded)
    ///
    /// Once the table holds this many entries new results are returned
    /// without being cached. Existing entries are never evicted.
    #[serde(default)]
    pub max_entries: Option<usize>,
}

/// Root configuration loaded from `.purepar.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PureparConfig {
    #[serde(default)]
    pub parallel: ParallelConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub rewrite: RewriteOptions,
    #[serde(default)]
    pub memo: MemoConfig,
}
