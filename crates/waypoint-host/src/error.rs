//! Waypoint host — error types.

use thiserror::Error;
use waypoint_core::bus::BusError;

/// A setting is present but malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Expected `true`/`false` (or `1`/`0`, `yes`/`no`).
    #[error("{key} must be a boolean, got '{value}'")]
    InvalidBool {
        /// The environment variable.
        key: &'static str,
        /// The rejected value.
        value: String,
    },

    /// Expected a non-negative integer.
    #[error("{key} must be a non-negative integer, got '{value}'")]
    InvalidNumber {
        /// The environment variable.
        key: &'static str,
        /// The rejected value.
        value: String,
    },

    /// Unknown log output format.
    #[error("WAYPOINT_LOG_FORMAT must be 'json' or 'pretty', got '{0}'")]
    InvalidLogFormat(String),
}

/// Startup and shutdown errors for the host.
#[derive(Debug, Error)]
pub enum HostError {
    /// Settings could not be read.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The tracing subscriber could not be installed.
    #[error("telemetry error: {0}")]
    Telemetry(String),

    /// The event hub refused a subscription.
    #[error("event hub error: {0}")]
    Bus(#[from] BusError),
}
