//! Observability utilities for turnkit hosts.
//!
//! The library crates only emit `tracing` events. Hosts call [`init`] once at
//! startup to print them through a `tracing-subscriber` formatter filtered by
//! [`LoggingConfig::filter`].

#![warn(missing_docs, clippy::pedantic)]

use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use turn_config::LoggingConfig;

/// Result alias for telemetry setup.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Errors produced while installing the subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The filter directives did not parse.
    #[error("invalid log filter `{filter}`: {reason}")]
    InvalidFilter {
        /// Offending directives.
        filter: String,
        /// Parser error message.
        reason: String,
    },

    /// A global subscriber is already installed.
    #[error("tracing subscriber already installed: {reason}")]
    AlreadyInstalled {
        /// Error reported by `tracing-subscriber`.
        reason: String,
    },
}

/// Parses the filter directives of `config`.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] when the directives do not parse.
pub fn build_filter(config: &LoggingConfig) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(&config.filter).map_err(|err| TelemetryError::InvalidFilter {
        filter: config.filter.clone(),
        reason: err.to_string(),
    })
}

/// Installs the global fmt subscriber.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] for bad directives and
/// [`TelemetryError::AlreadyInstalled`] when a subscriber is already set.
pub fn init(config: &LoggingConfig) -> TelemetryResult<()> {
    let filter = build_filter(config)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target)
        .try_init()
        .map_err(|err| TelemetryError::AlreadyInstalled {
            reason: err.to_string(),
        })?;
    debug!(filter = %config.filter, "tracing subscriber installed");
    Ok(())
}
