//! Tracing subscriber setup for binaries and tests.

use tracing_subscriber::EnvFilter;

use crate::config;

/// Install the global subscriber. RUST_LOG wins over the built-in default.
pub fn init() {
    tracing_subscriber::fmt().with_env_filter(env_filter()).init();
}

/// Best-effort install for tests, where another test may already have won.
pub fn try_init() {
    let _ = tracing_subscriber::fmt().with_env_filter(env_filter()).try_init();
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config::default_log_filter()))
}
