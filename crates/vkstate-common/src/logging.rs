//! `tracing` subscriber setup shared by the rebuilder's tools and tests.
//!
//! Verbosity comes from `VKSTATE_LOG`, an `EnvFilter` directive such as
//! `debug` or `vkstate_rebuild::scratch=trace`.

use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding the filter directive.
pub const LOG_ENV: &str = "VKSTATE_LOG";

fn filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default))
}

/// Install the global subscriber for a tool that rebuilds or cuts a
/// capture. Logs at `info` unless `VKSTATE_LOG` says otherwise.
///
/// Panics if a global subscriber is already set.
pub fn init_logging() {
    fmt()
        .with_env_filter(filter("info"))
        .with_target(true)
        .with_thread_ids(true)
        .init();
}

/// Subscriber for tests: `warn` by default, output captured per test, and
/// safe to call from every test in a binary.
pub fn init_test_logging() {
    let _ = fmt()
        .with_env_filter(filter("warn"))
        .with_target(true)
        .with_test_writer()
        .try_init();
}
