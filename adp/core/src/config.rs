//! TOML Configuration File Support
//!
//! Router settings are read from `~/.config/adp/router.toml`.
//!
//! # Configuration Priority
//!
//! Values are loaded with the following priority (highest first):
//! 1. CLI arguments (applied by the caller)
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Environment Variables
//!
//! - `ADP_STALENESS_SECS` - health entry staleness interval in seconds
//! - `ADP_PROBE_SUCCESS_RATE` - probability that a liveness probe passes
//! - `ADP_DEFAULT_VALIDATORS` - validators per request when unspecified
//! - `ADP_SEED` - seed for the selection RNG
//!
//! # Example Configuration
//!
//! ```toml
//! [health]
//! staleness_interval_secs = 30
//! probe_success_rate = 0.95
//!
//! [routing]
//! default_validators = 1
//! seed = 42
//!
//! [[workers]]
//! id = "nm-medical-001"
//! category = "medical"
//! endpoint = "sim://nm/medical"
//! capabilities = ["diagnosis", "treatment"]
//! weight = 0.9
//! avg_latency_ms = 850.0
//! accuracy = 0.94
//! max_concurrent = 10
//! ```
//!
//! Without any `[[workers]]` entries the demo fleet from [`default_fleet`]
//! is used.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::probe::DEFAULT_PROBE_SUCCESS_RATE;
use crate::registry::DEFAULT_STALENESS_INTERVAL;
use crate::worker::{WorkerCategory, WorkerProfile};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Health section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthToml {
    /// Seconds after which a health entry is re-probed
    pub staleness_interval_secs: Option<u64>,

    /// Probability that a liveness probe passes
    pub probe_success_rate: Option<f64>,
}

/// Routing section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingToml {
    /// Validators per request when the request does not specify a count
    pub default_validators: Option<usize>,

    /// Seed for the selection RNG
    pub seed: Option<u64>,
}

/// Root TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterToml {
    /// Health tracking settings
    pub health: HealthToml,

    /// Routing settings
    pub routing: RoutingToml,

    /// Worker fleet
    pub workers: Vec<WorkerProfile>,
}

// =============================================================================
// Resolved Settings
// =============================================================================

/// Fully resolved router settings
#[derive(Clone, Debug, PartialEq)]
pub struct RouterSettings {
    /// Age after which a health entry is re-probed
    pub staleness_interval: Duration,

    /// Probability that a liveness probe passes
    pub probe_success_rate: f64,

    /// Validators per request when unspecified
    pub default_validators: usize,

    /// Seed for the selection RNG (entropy when `None`)
    pub seed: Option<u64>,

    /// Workers registered at startup
    pub workers: Vec<WorkerProfile>,

    /// File the settings were read from, if any
    pub config_file_path: Option<PathBuf>,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            staleness_interval: DEFAULT_STALENESS_INTERVAL,
            probe_success_rate: DEFAULT_PROBE_SUCCESS_RATE,
            default_validators: crate::engine::DEFAULT_VALIDATOR_COUNT,
            seed: None,
            workers: default_fleet(),
            config_file_path: None,
        }
    }
}

impl RouterSettings {
    /// Check the settings for values the router cannot run with
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] describing the first problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.staleness_interval.is_zero() {
            return Err(ConfigError::ValidationError(
                "staleness interval must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.probe_success_rate) {
            return Err(ConfigError::ValidationError(format!(
                "probe success rate must be within [0, 1], got {}",
                self.probe_success_rate
            )));
        }
        for profile in &self.workers {
            profile
                .validate()
                .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        }
        Ok(())
    }
}

/// One worker per category with the demo fleet's characteristics
#[must_use]
pub fn default_fleet() -> Vec<WorkerProfile> {
    let fleet = [
        (WorkerCategory::Medical, 0.9, 0.94, 850.0, ["diagnosis", "treatment"]),
        (WorkerCategory::Legal, 0.85, 0.92, 1200.0, ["contracts", "compliance"]),
        (WorkerCategory::Technical, 0.9, 0.95, 600.0, ["debugging", "architecture"]),
        (WorkerCategory::Financial, 0.88, 0.93, 900.0, ["analysis", "forecasting"]),
    ];

    fleet
        .into_iter()
        .map(|(category, weight, accuracy, latency_ms, capabilities)| {
            WorkerProfile::new(format!("nm-{category}-001"), category)
                .with_endpoint(format!("sim://nm/{category}"))
                .with_capabilities(capabilities)
                .with_weight(weight)
                .with_accuracy(accuracy)
                .with_latency_ms(latency_ms)
                .with_max_concurrent(10)
        })
        .collect()
}

// =============================================================================
// Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/adp/router.toml` or
/// `~/.config/adp/router.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("adp").join("router.toml"))
}

/// Load settings from the default path, the environment and defaults
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or if
/// the resolved settings fail validation. A missing file is not an error.
pub fn load_config() -> Result<RouterSettings, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load settings from a specific path
///
/// With `None` only defaults and environment variables are used.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if the
/// resolved settings fail validation.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<RouterSettings, ConfigError> {
    let mut settings = RouterSettings::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: RouterToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut settings, toml_config);
            settings.config_file_path = Some(config_path.clone());

            tracing::info!(
                path = %config_path.display(),
                workers = settings.workers.len(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut settings, |key| std::env::var(key).ok());
    settings.validate()?;

    Ok(settings)
}

fn apply_toml_config(settings: &mut RouterSettings, toml: RouterToml) {
    if let Some(secs) = toml.health.staleness_interval_secs {
        settings.staleness_interval = Duration::from_secs(secs);
    }
    if let Some(rate) = toml.health.probe_success_rate {
        settings.probe_success_rate = rate;
    }
    if let Some(count) = toml.routing.default_validators {
        settings.default_validators = count;
    }
    if toml.routing.seed.is_some() {
        settings.seed = toml.routing.seed;
    }
    if !toml.workers.is_empty() {
        settings.workers = toml.workers;
    }
}

/// Apply environment overrides read through `lookup`
///
/// Unparseable values are logged and ignored.
fn apply_env_config<F>(settings: &mut RouterSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(secs) = parse_env(&lookup, "ADP_STALENESS_SECS") {
        settings.staleness_interval = Duration::from_secs(secs);
    }
    if let Some(rate) = parse_env(&lookup, "ADP_PROBE_SUCCESS_RATE") {
        settings.probe_success_rate = rate;
    }
    if let Some(count) = parse_env(&lookup, "ADP_DEFAULT_VALIDATORS") {
        settings.default_validators = count;
    }
    if let Some(seed) = parse_env(&lookup, "ADP_SEED") {
        settings.seed = Some(seed);
    }
}

fn parse_env<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(var = key, value = %raw, "Ignoring unparseable environment override");
            None
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write_toml(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn from_toml(content: &str) -> RouterSettings {
        let mut settings = RouterSettings::default();
        apply_toml_config(&mut settings, toml::from_str(content).unwrap());
        settings
    }

    #[test]
    fn test_default_settings() {
        let settings = RouterSettings::default();
        assert_eq!(settings.staleness_interval, Duration::from_secs(30));
        assert_eq!(settings.probe_success_rate, 0.95);
        assert_eq!(settings.default_validators, 1);
        assert_eq!(settings.seed, None);
        assert_eq!(settings.workers.len(), 4);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_default_fleet_covers_every_category() {
        let fleet = default_fleet();
        for category in WorkerCategory::ALL {
            assert_eq!(fleet.iter().filter(|p| p.category == category).count(), 1);
        }
        let medical = fleet.iter().find(|p| p.id == "nm-medical-001").unwrap();
        assert_eq!(medical.endpoint, "sim://nm/medical");
        assert_eq!(medical.weight, 0.9);
        assert_eq!(medical.accuracy, 0.94);
        assert_eq!(medical.avg_latency_ms, 850.0);
    }

    #[test]
    fn test_default_config_path() {
        if let Some(p) = default_config_path() {
            assert!(p.ends_with("adp/router.toml"));
        }
    }

    #[test]
    fn test_parse_full_toml() {
        let settings = from_toml(
            r#"
[health]
staleness_interval_secs = 5
probe_success_rate = 0.5

[routing]
default_validators = 3
seed = 42

[[workers]]
id = "tech-a"
category = "technical"
weight = 0.7
avg_latency_ms = 400.0
accuracy = 0.9

[[workers]]
id = "tech-b"
category = "technical"
endpoint = "sim://tech-b"
capabilities = ["rust"]
weight = 0.3
avg_latency_ms = 1500.0
accuracy = 0.8
max_concurrent = 2
"#,
        );

        assert_eq!(settings.staleness_interval, Duration::from_secs(5));
        assert_eq!(settings.probe_success_rate, 0.5);
        assert_eq!(settings.default_validators, 3);
        assert_eq!(settings.seed, Some(42));
        assert_eq!(settings.workers.len(), 2);
        assert_eq!(settings.workers[0].max_concurrent, 10);
        assert!(settings.workers[0].endpoint.is_empty());
        assert_eq!(settings.workers[1].capabilities, vec!["rust".to_string()]);
        assert_eq!(settings.workers[1].max_concurrent, 2);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = from_toml("[routing]\ndefault_validators = 2\n");
        assert_eq!(settings.default_validators, 2);
        assert_eq!(settings.staleness_interval, DEFAULT_STALENESS_INTERVAL);
        assert_eq!(settings.workers, default_fleet());
    }

    #[test]
    fn test_unknown_category_fails_to_parse() {
        let result: Result<RouterToml, _> = toml::from_str(
            r#"
[[workers]]
id = "x"
category = "astrology"
weight = 0.5
avg_latency_ms = 100.0
accuracy = 0.5
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file() {
        let file = write_toml("[health]\nstaleness_interval_secs = 12\n");
        let settings = load_config_from_path(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(settings.config_file_path.as_deref(), Some(file.path()));
        assert_eq!(settings.workers.len(), 4);
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_config_from_path(Some(dir.path().join("absent.toml"))).unwrap();
        assert_eq!(settings.config_file_path, None);
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let file = write_toml("[health\nstaleness_interval_secs = ");
        let result = load_config_from_path(Some(file.path().to_path_buf()));
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_invalid_worker_is_validation_error() {
        let file = write_toml(
            r#"
[[workers]]
id = "bad"
category = "legal"
weight = 5.0
avg_latency_ms = 100.0
accuracy = 0.5
"#,
        );
        let result = load_config_from_path(Some(file.path().to_path_buf()));
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_rejects_bad_health_settings() {
        let mut settings = RouterSettings::default();
        settings.probe_success_rate = 1.5;
        assert!(settings.validate().is_err());

        let mut settings = RouterSettings::default();
        settings.staleness_interval = Duration::ZERO;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut settings = from_toml("[health]\nstaleness_interval_secs = 5\n[routing]\nseed = 1\n");
        let env: HashMap<&str, &str> = [
            ("ADP_STALENESS_SECS", "60"),
            ("ADP_PROBE_SUCCESS_RATE", "0.8"),
            ("ADP_DEFAULT_VALIDATORS", "2"),
            ("ADP_SEED", " 7 "),
        ]
        .into_iter()
        .collect();

        apply_env_config(&mut settings, |key| env.get(key).map(ToString::to_string));

        assert_eq!(settings.staleness_interval, Duration::from_secs(60));
        assert_eq!(settings.probe_success_rate, 0.8);
        assert_eq!(settings.default_validators, 2);
        assert_eq!(settings.seed, Some(7));
    }

    #[test]
    fn test_unparseable_env_is_ignored() {
        let mut settings = RouterSettings::default();
        apply_env_config(&mut settings, |key| {
            (key == "ADP_DEFAULT_VALIDATORS").then(|| "many".to_string())
        });
        assert_eq!(settings.default_validators, 1);

        let before = settings.clone();
        apply_env_config(&mut settings, no_env);
        assert_eq!(settings, before);
    }
}
