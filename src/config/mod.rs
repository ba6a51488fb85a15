//! Configuration
//!
//! Settings live in an optional `.purepar.toml`:
//!
//! ```toml
//! [parallel]
//! enabled = true
//! max_concurrency = 8
//! extra_worker = true
//!
//! [analysis]
//! mutual_recursion = "reject"     # or "assume_pure"
//!
//! [rewrite]
//! lifecycle = "fresh"             # or "reset"
//! arguments = "forward"           # or "drop"
//!
//! [memo]
//! max_entries = 10000             # omit for an unbounded table
//! ```
//!
//! Every field has a default, so an empty file is a valid configuration.

mod core;
mod loader;
mod parallel;

pub use self::core::{
    AnalysisConfig, ArgumentPolicy, MemoConfig, MutualRecursionPolicy, PureparConfig,
    RewriteOptions, StoreLifecycle,
};
pub use loader::{load_config, load_config_from_dir, parse_config, CONFIG_FILE_NAME};
pub use parallel::ParallelConfig;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(parse_config("").unwrap(), PureparConfig::default());
    }

    #[test]
    fn test_full_file() {
        let config = parse_config(
            r#"
            [parallel]
            enabled = true
            max_concurrency = 3
            extra_worker = true

            [analysis]
            mutual_recursion = "assume_pure"

            [rewrite]
            lifecycle = "reset"
            arguments = "drop"

            [memo]
            max_entries = 16
            "#,
        )
        .unwrap();

        assert_eq!(config.parallel.effective_workers(), 4);
        assert_eq!(
            config.analysis.mutual_recursion,
            MutualRecursionPolicy::AssumePure
        );
        assert_eq!(config.rewrite.lifecycle, StoreLifecycle::Reset);
        assert_eq!(config.rewrite.arguments, ArgumentPolicy::Drop);
        assert_eq!(config.memo.max_entries, Some(16));
    }

    #[test]
    fn test_unknown_policy_is_an_error() {
        assert!(parse_config("[rewrite]\nlifecycle = \"sometimes\"\n").is_err());
    }
}
