//! Logging configuration for db-steward.
//!
//! Logs go to stderr so they interleave cleanly with the REPL on stdout and
//! are easy to capture in tests.

use tracing_subscriber::EnvFilter;

/// Initializes logging to stderr with `RUST_LOG`-style filtering.
pub fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
