//! Tracing subscriber initialisation.

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, Settings};
use crate::error::HostError;

/// Builds the filter: `RUST_LOG` wins, then the configured directive,
/// then `info`.
#[must_use]
pub fn env_filter(settings: &Settings) -> EnvFilter {
    let from_env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    resolve_filter(from_env.as_deref(), &settings.log_filter)
}

/// The first directive that parses, falling back to `info`.
fn resolve_filter(from_env: Option<&str>, configured: &str) -> EnvFilter {
    from_env
        .and_then(|directive| EnvFilter::try_new(directive).ok())
        .or_else(|| EnvFilter::try_new(configured).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

/// Installs the global tracing subscriber.
///
/// # Errors
///
/// Returns `HostError::Telemetry` if a global subscriber is already set.
pub fn init(settings: &Settings) -> Result<(), HostError> {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter(settings));
    let result = match settings.log_format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
    result.map_err(|e| HostError::Telemetry(e.to_string()))?;

    tracing::info!(format = ?settings.log_format, "tracing initialised");
    Ok(())
}
