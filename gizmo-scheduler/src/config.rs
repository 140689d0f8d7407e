//! Configuration for the schedulers.

use std::path::Path;

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;

/// Main configuration structure.
///
/// Read once when a scheduler is built; changes on disk are not picked up
/// by running schedulers.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub rate_limits: RateLimitConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Per-user admission limits for the inference queue.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Admissions allowed per user within any trailing 60 seconds.
    #[serde(default = "default_max_requests_per_minute")]
    pub max_requests_per_minute: u32,
    /// Identity that bypasses rate limiting entirely. Empty means nobody.
    #[serde(default)]
    pub owner_email: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests_per_minute: default_max_requests_per_minute(),
            owner_email: String::new(),
        }
    }
}

/// Inference queue tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    /// Fallback per-request duration for wait estimates (seconds).
    #[serde(default = "default_seconds_per_request")]
    pub seconds_per_request: f64,
    /// Number of recent completions averaged for wait estimates.
    #[serde(default = "default_eta_window")]
    pub eta_window: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            seconds_per_request: default_seconds_per_request(),
            eta_window: default_eta_window(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrainingConfig {
    /// Estimate used when a job is added without one (minutes).
    #[serde(default = "default_estimated_minutes")]
    pub default_estimated_minutes: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            default_estimated_minutes: default_estimated_minutes(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default values
fn default_max_requests_per_minute() -> u32 {
    8
}
fn default_seconds_per_request() -> f64 {
    30.0
}
fn default_eta_window() -> usize {
    10
}
fn default_estimated_minutes() -> f64 {
    30.0
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from `config.toml` (if present) and environment variables.
    ///
    /// Configuration sources (in order of precedence):
    /// 1. Environment variables (GIZMO__SECTION__KEY format)
    /// 2. config.toml file (if present)
    /// 3. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        Self::build(File::with_name("config").required(false))
    }

    /// Load configuration from an explicit file, still honouring environment overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::build(File::from(path.as_ref()).required(true))
    }

    fn build<S>(file: S) -> Result<Self, ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let config = ConfigLoader::builder()
            .set_default(
                "rate_limits.max_requests_per_minute",
                default_max_requests_per_minute() as i64,
            )?
            .set_default("queue.seconds_per_request", default_seconds_per_request())?
            .set_default("queue.eta_window", default_eta_window() as i64)?
            .add_source(file)
            .add_source(
                Environment::with_prefix("GIZMO")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_rate_limit_config() {
        let limits = RateLimitConfig::default();
        assert_eq!(limits.max_requests_per_minute, 8);
        assert!(limits.owner_email.is_empty());
    }

    #[test]
    fn test_default_queue_config() {
        let queue = QueueConfig::default();
        assert_eq!(queue.seconds_per_request, 30.0);
        assert_eq!(queue.eta_window, 10);
        assert_eq!(TrainingConfig::default().default_estimated_minutes, 30.0);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[rate_limits]
max_requests_per_minute = 3
owner_email = "owner@example.com"

[training]
default_estimated_minutes = 45.0
"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.rate_limits.max_requests_per_minute, 3);
        assert_eq!(config.rate_limits.owner_email, "owner@example.com");
        assert_eq!(config.training.default_estimated_minutes, 45.0);
        // Untouched sections keep their defaults
        assert_eq!(config.queue.seconds_per_request, 30.0);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_env_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[queue]
eta_window = 4
seconds_per_request = 12.5
"#
        )
        .unwrap();

        // Only this test touches queue.eta_window through the environment
        std::env::set_var("GIZMO__QUEUE__ETA_WINDOW", "7");
        let config = Config::load_from(file.path());
        std::env::remove_var("GIZMO__QUEUE__ETA_WINDOW");

        let config = config.unwrap();
        assert_eq!(config.queue.eta_window, 7);
        assert_eq!(config.queue.seconds_per_request, 12.5);
    }

    #[test]
    fn test_load_from_missing_file_fails() {
        assert!(Config::load_from("/nonexistent/gizmo-config.toml").is_err());
    }
}
