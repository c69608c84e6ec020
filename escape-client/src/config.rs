//! Configuration loading for the session client.
//!
//! Configuration is loaded from a TOML file. Every field has a default, so
//! an empty file (or no file) yields the stock game timings.

use escape_core::{
    clock, retry, ClockSettings, RetryPolicy, SessionConfig, DEFAULT_FEEDBACK_DELAY,
    DEFAULT_RESULT_TARGET, DEFAULT_SKIP_DELAY,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::transport::DEFAULT_REQUEST_TIMEOUT;

/// Root configuration for the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Countdown configuration.
    #[serde(default)]
    pub clock: ClockConfig,
    /// Generation retry configuration.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Display delays.
    #[serde(default)]
    pub timing: TimingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the game server (default: http://127.0.0.1:5000).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds (default: 15).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Results page used when the server names none (default: /result).
    #[serde(default = "default_result_path")]
    pub result_path: String,
}

/// Countdown configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClockConfig {
    /// Tick period in milliseconds (default: 1000).
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// Background time-check period in seconds (default: 30).
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Drift tolerated before snapping to the server clock (default: 5.0).
    #[serde(default = "default_drift_threshold_secs")]
    pub drift_threshold_secs: f64,
    /// Warning band threshold in seconds (default: 180).
    #[serde(default = "default_warning_secs")]
    pub warning_secs: f64,
    /// Urgent band threshold in seconds (default: 60).
    #[serde(default = "default_urgent_secs")]
    pub urgent_secs: f64,
}

/// Generation retry configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts after a correct answer or skip (default: 4).
    #[serde(default = "default_auto_max_attempts")]
    pub auto_max_attempts: u32,
    /// Attempts per manual continuation (default: 3).
    #[serde(default = "default_manual_max_attempts")]
    pub manual_max_attempts: u32,
    /// Wait after a "not ready" reply in milliseconds (default: 3000).
    #[serde(default = "default_not_ready_delay_ms")]
    pub not_ready_delay_ms: u64,
    /// Wait after a transport failure in milliseconds (default: 2000).
    #[serde(default = "default_transport_delay_ms")]
    pub transport_delay_ms: u64,
}

/// Display delays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Feedback display before advancing, in milliseconds (default: 1500).
    #[serde(default = "default_feedback_delay_ms")]
    pub feedback_delay_ms: u64,
    /// Skipped-answer display before advancing, in milliseconds (default: 2000).
    #[serde(default = "default_skip_delay_ms")]
    pub skip_delay_ms: u64,
}

// Default value functions
fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT.as_secs()
}

fn default_result_path() -> String {
    DEFAULT_RESULT_TARGET.to_string()
}

fn default_tick_ms() -> u64 {
    clock::DEFAULT_TICK.as_millis() as u64
}

fn default_poll_interval_secs() -> u64 {
    clock::DEFAULT_POLL_INTERVAL.as_secs()
}

fn default_drift_threshold_secs() -> f64 {
    clock::DEFAULT_DRIFT_THRESHOLD_SECS
}

fn default_warning_secs() -> f64 {
    clock::DEFAULT_WARNING_SECS
}

fn default_urgent_secs() -> f64 {
    clock::DEFAULT_URGENT_SECS
}

fn default_auto_max_attempts() -> u32 {
    retry::DEFAULT_AUTO_MAX_ATTEMPTS
}

fn default_manual_max_attempts() -> u32 {
    retry::DEFAULT_MANUAL_MAX_ATTEMPTS
}

fn default_not_ready_delay_ms() -> u64 {
    retry::DEFAULT_NOT_READY_DELAY.as_millis() as u64
}

fn default_transport_delay_ms() -> u64 {
    retry::DEFAULT_TRANSPORT_DELAY.as_millis() as u64
}

fn default_feedback_delay_ms() -> u64 {
    DEFAULT_FEEDBACK_DELAY.as_millis() as u64
}

fn default_skip_delay_ms() -> u64 {
    DEFAULT_SKIP_DELAY.as_millis() as u64
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            result_path: default_result_path(),
        }
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            poll_interval_secs: default_poll_interval_secs(),
            drift_threshold_secs: default_drift_threshold_secs(),
            warning_secs: default_warning_secs(),
            urgent_secs: default_urgent_secs(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            auto_max_attempts: default_auto_max_attempts(),
            manual_max_attempts: default_manual_max_attempts(),
            not_ready_delay_ms: default_not_ready_delay_ms(),
            transport_delay_ms: default_transport_delay_ms(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            feedback_delay_ms: default_feedback_delay_ms(),
            skip_delay_ms: default_skip_delay_ms(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Load from `path` when it exists, otherwise return the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::SerializeError)
    }

    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Session machine settings.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            clock: ClockSettings {
                tick: Duration::from_millis(self.clock.tick_ms.max(1)),
                poll_interval: Duration::from_secs(self.clock.poll_interval_secs.max(1)),
                drift_threshold_secs: self.clock.drift_threshold_secs,
                warning_secs: self.clock.warning_secs,
                urgent_secs: self.clock.urgent_secs,
            },
            retry: RetryPolicy {
                auto_max_attempts: self.retry.auto_max_attempts,
                manual_max_attempts: self.retry.manual_max_attempts,
                not_ready_delay: Duration::from_millis(self.retry.not_ready_delay_ms),
                transport_delay: Duration::from_millis(self.retry.transport_delay_ms),
            },
            feedback_delay: Duration::from_millis(self.timing.feedback_delay_ms),
            skip_delay: Duration::from_millis(self.timing.skip_delay_ms),
            result_target: self.server.result_path.clone(),
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// Failed to render configuration.
    #[error("failed to serialize config: {0}")]
    SerializeError(#[source] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_matches_game_timings() {
        let config = ClientConfig::default();
        assert_eq!(config.server.base_url, "http://127.0.0.1:5000");
        assert_eq!(config.clock.tick_ms, 1000);
        assert_eq!(config.clock.poll_interval_secs, 30);
        assert_eq!(config.retry.auto_max_attempts, 4);
        assert_eq!(config.retry.manual_max_attempts, 3);
        assert_eq!(config.timing.feedback_delay_ms, 1500);

        assert_eq!(config.session_config(), SessionConfig::default());
    }

    #[test]
    fn config_from_toml_string() {
        let toml = r#"
[server]
base_url = "https://escape.example.com"
result_path = "/results"

[clock]
poll_interval_secs = 10
drift_threshold_secs = 2.5

[retry]
auto_max_attempts = 6

[timing]
skip_delay_ms = 500
"#;

        let config: ClientConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.server.base_url, "https://escape.example.com");
        assert_eq!(config.clock.poll_interval_secs, 10);
        assert_eq!(config.retry.auto_max_attempts, 6);

        let session = config.session_config();
        assert_eq!(session.result_target, "/results");
        assert_eq!(session.clock.drift_threshold_secs, 2.5);
        assert_eq!(session.clock.poll_interval, Duration::from_secs(10));
        assert_eq!(session.skip_delay, Duration::from_millis(500));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: ClientConfig = toml::from_str("[retry]\nmanual_max_attempts = 1\n").unwrap();
        assert_eq!(config.retry.manual_max_attempts, 1);
        assert_eq!(config.retry.auto_max_attempts, 4);
        assert_eq!(config.server, ServerConfig::default());
        assert_eq!(config.timing, TimingConfig::default());
    }

    #[test]
    fn empty_config_is_default() {
        let config: ClientConfig = toml::from_str("").unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn from_file_reads_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nbase_url = \"http://localhost:8000\"").unwrap();

        let config = ClientConfig::from_file(file.path()).unwrap();
        assert_eq!(config.server.base_url, "http://localhost:8000");
    }

    #[test]
    fn from_file_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[clock]\ntick_ms = \"fast\"").unwrap();

        let err = ClientConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn missing_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");

        assert!(matches!(
            ClientConfig::from_file(&path),
            Err(ConfigError::ReadError { .. })
        ));
        assert_eq!(
            ClientConfig::load_or_default(&path).unwrap(),
            ClientConfig::default()
        );
    }

    #[test]
    fn to_toml_round_trips() {
        let config = ClientConfig::default();
        let rendered = config.to_toml().unwrap();
        let parsed: ClientConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }
}
