//! Settings read from the environment.

use waypoint_transition::OrchestratorOptions;
use waypoint_verifier::VerifierConfig;
use waypoint_verifier::application::verifier::DEFAULT_RUN_STATE;

use crate::error::ConfigError;

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Host settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// `EnvFilter` directive (`WAYPOINT_LOG`).
    pub log_filter: String,
    /// Log output format (`WAYPOINT_LOG_FORMAT`).
    pub log_format: LogFormat,
    /// Attach the invariant verifier (`WAYPOINT_VERIFIER`).
    pub verifier_enabled: bool,
    /// Panic on invariant violations (`WAYPOINT_STRICT_INVARIANTS`).
    pub strict_invariants: bool,
    /// Require world-reset correlation (`WAYPOINT_EXPECT_RESET`).
    pub expect_reset: bool,
    /// Verifier eviction bound (`WAYPOINT_MAX_TRACKED_SIGNATURES`).
    pub max_tracked_signatures: Option<usize>,
    /// State a run start must carry (`WAYPOINT_RUN_STATE`).
    pub expected_run_state: String,
    /// Fade profile used when a request names none
    /// (`WAYPOINT_DEFAULT_FADE_PROFILE`).
    pub default_fade_profile: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_filter: "info".to_owned(),
            log_format: LogFormat::Json,
            verifier_enabled: true,
            strict_invariants: false,
            expect_reset: true,
            max_tracked_signatures: None,
            expected_run_state: DEFAULT_RUN_STATE.to_owned(),
            default_fade_profile: None,
        }
    }
}

impl Settings {
    /// Reads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to a malformed value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`; unset or blank keys keep defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to a malformed value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };
        let mut settings = Self::default();

        if let Some(v) = get("WAYPOINT_LOG") {
            settings.log_filter = v;
        }
        if let Some(v) = get("WAYPOINT_LOG_FORMAT") {
            settings.log_format = match v.to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" => LogFormat::Pretty,
                _ => return Err(ConfigError::InvalidLogFormat(v)),
            };
        }
        if let Some(v) = get("WAYPOINT_VERIFIER") {
            settings.verifier_enabled = parse_bool("WAYPOINT_VERIFIER", &v)?;
        }
        if let Some(v) = get("WAYPOINT_STRICT_INVARIANTS") {
            settings.strict_invariants = parse_bool("WAYPOINT_STRICT_INVARIANTS", &v)?;
        }
        if let Some(v) = get("WAYPOINT_EXPECT_RESET") {
            settings.expect_reset = parse_bool("WAYPOINT_EXPECT_RESET", &v)?;
        }
        if let Some(v) = get("WAYPOINT_MAX_TRACKED_SIGNATURES") {
            let limit = v
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidNumber {
                    key: "WAYPOINT_MAX_TRACKED_SIGNATURES",
                    value: v.clone(),
                })?;
            settings.max_tracked_signatures = Some(limit);
        }
        if let Some(v) = get("WAYPOINT_RUN_STATE") {
            settings.expected_run_state = v;
        }
        settings.default_fade_profile = get("WAYPOINT_DEFAULT_FADE_PROFILE");

        Ok(settings)
    }

    /// Verifier configuration derived from these settings.
    #[must_use]
    pub fn verifier_config(&self) -> VerifierConfig {
        VerifierConfig {
            strict: self.strict_invariants,
            expect_reset: self.expect_reset,
            expected_run_state: self.expected_run_state.clone(),
            max_tracked_signatures: self.max_tracked_signatures,
        }
    }

    #[must_use]
    pub fn orchestrator_options(&self) -> OrchestratorOptions {
        OrchestratorOptions {
            default_fade_profile: self.default_fade_profile.clone(),
        }
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            key,
            value: value.to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_empty_environment_yields_defaults() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();

        assert_eq!(settings, Settings::default());
        assert!(settings.verifier_enabled);
        assert!(!settings.strict_invariants);
        assert_eq!(settings.expected_run_state, "running");
    }

    #[test]
    fn test_overrides_are_applied() {
        // Arrange
        let env = lookup(&[
            ("WAYPOINT_LOG", "waypoint=debug"),
            ("WAYPOINT_LOG_FORMAT", "Pretty"),
            ("WAYPOINT_VERIFIER", "no"),
            ("WAYPOINT_STRICT_INVARIANTS", "1"),
            ("WAYPOINT_EXPECT_RESET", "false"),
            ("WAYPOINT_MAX_TRACKED_SIGNATURES", " 256 "),
            ("WAYPOINT_RUN_STATE", "Playing"),
            ("WAYPOINT_DEFAULT_FADE_PROFILE", "Soft"),
        ]);

        // Act
        let settings = Settings::from_lookup(env).unwrap();

        // Assert
        assert_eq!(settings.log_filter, "waypoint=debug");
        assert_eq!(settings.log_format, LogFormat::Pretty);
        assert!(!settings.verifier_enabled);
        let verifier = settings.verifier_config();
        assert!(verifier.strict);
        assert!(!verifier.expect_reset);
        assert_eq!(verifier.max_tracked_signatures, Some(256));
        assert_eq!(verifier.expected_run_state, "Playing");
        assert_eq!(
            settings.orchestrator_options().default_fade_profile.as_deref(),
            Some("Soft")
        );
    }

    #[test]
    fn test_malformed_values_are_rejected() {
        let bad_bool = Settings::from_lookup(lookup(&[("WAYPOINT_VERIFIER", "maybe")]));
        let bad_number =
            Settings::from_lookup(lookup(&[("WAYPOINT_MAX_TRACKED_SIGNATURES", "-1")]));
        let bad_format = Settings::from_lookup(lookup(&[("WAYPOINT_LOG_FORMAT", "xml")]));

        assert_eq!(
            bad_bool.unwrap_err().to_string(),
            "WAYPOINT_VERIFIER must be a boolean, got 'maybe'"
        );
        assert!(matches!(
            bad_number.unwrap_err(),
            ConfigError::InvalidNumber { .. }
        ));
        assert_eq!(
            bad_format.unwrap_err(),
            ConfigError::InvalidLogFormat("xml".to_owned())
        );
    }
}
