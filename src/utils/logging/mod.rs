//! Logging initialisation
//!
//! Installs a `tracing-subscriber` formatter driven by [`LoggingConfig`]. `RUST_LOG`
//! takes precedence over the configured level when it is set.

use crate::config::{LogFormat, LoggingConfig};
use crate::utils::error::{Result, SentinelError};
use tracing_subscriber::EnvFilter;

/// Build the filter for a configuration, preferring `RUST_LOG`
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level).map_err(|e| {
            SentinelError::Config(format!("Invalid log level '{}': {}", config.level, e))
        }),
    }
}

/// Initialise the global subscriber.
///
/// Returns `Ok(false)` when a subscriber was already installed, which lets tests
/// and embedding applications call this more than once.
pub fn init_logging(config: &LoggingConfig) -> Result<bool> {
    let filter = build_filter(config)?;

    let installed = match config.format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .try_init()
            .is_ok(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .try_init()
            .is_ok(),
    };

    Ok(installed)
}
