//! Tracing setup shared by the library and the `libcat` binary.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize logging at WARN unless RUST_LOG says otherwise
///
/// Catalog operations log every call at INFO, which is noisy for an
/// interactive command line; `RUST_LOG=info` turns it back on.
pub fn init() {
    init_with_level("warn")
}

/// Initialize logging with a specific default level
///
/// Output goes to stderr so command output on stdout stays parseable.
/// RUST_LOG still takes precedence over `default_level`.
pub fn init_with_level(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

/// Initialize logging for tests (captured per test)
#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("debug"))
        .try_init();
}
