//! Logging - `tracing` subscriber setup for the binary
//!
//! `RUST_LOG` selects the filter (default `info`). Output goes to stderr so
//! command results on stdout stay machine-readable.

use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber. JSON when `AURORA_LOG_JSON=1`.
pub fn init_logging() {
    let use_json = std::env::var("AURORA_LOG_JSON")
        .map(|value| value == "1")
        .unwrap_or(false);
    init_logging_with(use_json, "info");
}

/// Install the global subscriber with an explicit format and fallback filter.
///
/// A second call is a no-op.
pub fn init_logging_with(json: bool, default_filter: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let builder = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    let _ = if json {
        builder.json().try_init()
    } else {
        builder.pretty().try_init()
    };
}
