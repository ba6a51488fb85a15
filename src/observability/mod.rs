//! Logging setup.
//!
//! The library only emits `tracing` events. Binaries and tests that want
//! to see them call [`init_tracing`] once at startup:
//!
//! ```ignore
//! purepar::observability::init_tracing();
//! ```
//!
//! The filter comes from `PUREPAR_LOG`, then `RUST_LOG`, and defaults to
//! `warn`.

use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable checked before `RUST_LOG`.
pub const LOG_ENV: &str = "PUREPAR_LOG";

const DEFAULT_FILTER: &str = "warn";

/// Install a fmt subscriber. Does nothing if a global subscriber is
/// already set, including one installed by an earlier call.
pub fn init_tracing() {
    let installed = fmt()
        .with_env_filter(env_filter())
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
    if let Err(e) = installed {
        tracing::debug!("tracing subscriber already installed: {}", e);
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
