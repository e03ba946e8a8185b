//! Exporter configuration.
//!
//! Settings are resolved in three layers: built-in defaults, an optional
//! TOML file, then command-line flags and environment variables.

use crate::client::{Credentials, DEFAULT_API_BASE};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),
    #[error("poll interval must be at least one second")]
    InvalidPollInterval,
    #[error("request timeout must be at least one second")]
    InvalidTimeout,
    #[error("unknown log level {0:?}")]
    InvalidLogLevel(String),
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
///
/// Every key is optional; missing keys fall back to the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub email: Option<String>,
    pub password: Option<String>,
    /// Port the metrics server listens on.
    pub listen_port: u16,
    /// Seconds between polls.
    pub poll_interval_secs: u64,
    pub log_level: String,
    pub api_base_url: String,
    /// Per-request timeout against the cloud API, in seconds.
    pub request_timeout_secs: u64,
    /// How long shutdown waits for an in-flight poll, in seconds.
    pub shutdown_timeout_secs: u64,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            email: None,
            password: None,
            listen_port: 8000,
            poll_interval_secs: 60,
            log_level: "info".to_string(),
            api_base_url: DEFAULT_API_BASE.to_string(),
            request_timeout_secs: 30,
            shutdown_timeout_secs: 5,
        }
    }
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

/// Values supplied on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub email: Option<String>,
    pub password: Option<String>,
    pub listen_port: Option<u16>,
    pub poll_interval_secs: Option<u64>,
    pub log_level: Option<String>,
    pub api_base_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

/// Validated runtime configuration.
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    pub credentials: Credentials,
    pub listen_port: u16,
    pub poll_interval: Duration,
    pub log_level: tracing::Level,
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub shutdown_timeout: Duration,
}

impl ExporterConfig {
    /// Applies `overrides` on top of `file` and validates the result.
    pub fn resolve(file: FileConfig, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let email =
            non_empty(overrides.email.or(file.email)).ok_or(ConfigError::Missing("email"))?;
        let password = non_empty(overrides.password.or(file.password))
            .ok_or(ConfigError::Missing("password"))?;

        let poll_interval_secs = overrides.poll_interval_secs.unwrap_or(file.poll_interval_secs);
        if poll_interval_secs == 0 {
            return Err(ConfigError::InvalidPollInterval);
        }
        let request_timeout_secs = overrides
            .request_timeout_secs
            .unwrap_or(file.request_timeout_secs);
        if request_timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        let level_name = overrides.log_level.unwrap_or(file.log_level);
        let log_level = tracing::Level::from_str(level_name.trim())
            .map_err(|_| ConfigError::InvalidLogLevel(level_name.clone()))?;

        Ok(Self {
            credentials: Credentials { email, password },
            listen_port: overrides.listen_port.unwrap_or(file.listen_port),
            poll_interval: Duration::from_secs(poll_interval_secs),
            log_level,
            api_base_url: overrides.api_base_url.unwrap_or(file.api_base_url),
            request_timeout: Duration::from_secs(request_timeout_secs),
            shutdown_timeout: Duration::from_secs(file.shutdown_timeout_secs),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
