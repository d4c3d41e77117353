//! Log subscriber installation.

use tracing_subscriber::EnvFilter;

use crate::config::{ConfigError, LogLevel};

/// Installs a global `fmt` subscriber filtered at `level`.
///
/// `RUST_LOG`, when set, takes precedence. Fails if a global subscriber is
/// already installed.
pub fn init_subscriber(level: LogLevel) -> Result<(), ConfigError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| ConfigError::Subscriber(err.to_string()))
}
