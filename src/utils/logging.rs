//! Logging
//!
//! Installs the global `tracing` subscriber. `RUST_LOG` takes precedence
//! over the configured default filter.

use tracing_subscriber::EnvFilter;

use super::error::{AppError, AppResult};

/// Build the filter from `RUST_LOG`, falling back to `default_filter`.
pub fn build_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Install the fmt subscriber. Fails if a global subscriber is already set.
pub fn init_logging(default_filter: &str) -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(default_filter))
        .with_target(true)
        .try_init()
        .map_err(|e| AppError::internal(format!("failed to install tracing subscriber: {}", e)))
}
