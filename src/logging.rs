//! Logging setup
//!
//! Events are emitted with `tracing` using an upper-snake `event` field
//! (`event = "ROUTE_COMPLETE"`). Output goes to stderr so stdout carries
//! only responses.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Installs the global subscriber. `RUST_LOG` overrides the configured
/// level. A second call is a no-op.
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if installed.is_err() {
        tracing::debug!(event = "LOGGING_ALREADY_INITIALIZED");
    }
}
