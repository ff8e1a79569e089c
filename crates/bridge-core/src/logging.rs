//! Logging initialization for the bridge.
//!
//! The RPC core owns stdout (it is the wire), so all log output goes to
//! stderr. The level comes from the `IMSG_LOG_LEVEL` environment variable
//! when set, otherwise from the CLI default.

use tracing_subscriber::EnvFilter;

/// Initialize the logging system.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging(default_level: &str) {
    let level = parse_level(default_level);
    let filter = EnvFilter::try_from_env("IMSG_LOG_LEVEL")
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
