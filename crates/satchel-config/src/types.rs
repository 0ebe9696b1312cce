//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [session]
//! sweep_interval_secs = 3600
//! default_expiration_secs = 3600
//! enable_sweep = true
//!
//! [logging]
//! level = "info"
//! json = false
//! directory = "/var/log/satchel"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use satchel_types::{ConfigProvider, HasLoggingConfig, HasSessionConfig, config_defaults};

use crate::error::{ConfigError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SatchelConfig {
    /// Session registry configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionConfig>,

    /// Logging configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

impl SatchelConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// The session section, or defaults if absent.
    pub fn session_or_default(&self) -> SessionConfig {
        self.session.clone().unwrap_or_default()
    }

    /// The logging section, or defaults if absent.
    pub fn logging_or_default(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_default()
    }

    /// Check every present section for out-of-range values.
    pub fn validate(&self) -> Result<()> {
        if let Some(ref session) = self.session {
            session.validate()?;
        }
        Ok(())
    }

    /// A config with every section filled with defaults, for `init`.
    pub fn with_defaults() -> Self {
        Self {
            session: Some(SessionConfig::default()),
            logging: Some(LoggingConfig::default()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Session registry configuration.
///
/// Controls the sliding expiration window of new sessions and how often the
/// registry sweeps out expired ones.
///
/// ```toml
/// [session]
/// sweep_interval_secs = 3600
/// default_expiration_secs = 3600
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Seconds between sweep passes.
    pub sweep_interval_secs: u64,
    /// Seconds of inactivity after which a session expires.
    pub default_expiration_secs: u64,
    /// Whether to run the background sweep at all.
    pub enable_sweep: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: config_defaults::SWEEP_INTERVAL_SECS,
            default_expiration_secs: config_defaults::DEFAULT_EXPIRATION_SECS,
            enable_sweep: true,
        }
    }
}

impl SessionConfig {
    /// Reject values the registry cannot use.
    pub fn validate(&self) -> Result<()> {
        if self.sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "session.sweep_interval_secs".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.sweep_interval_secs > config_defaults::MAX_SWEEP_INTERVAL_SECS {
            return Err(ConfigError::Invalid {
                field: "session.sweep_interval_secs".to_string(),
                reason: format!(
                    "must be at most {}",
                    config_defaults::MAX_SWEEP_INTERVAL_SECS
                ),
            });
        }
        Ok(())
    }
}

impl ConfigProvider for SessionConfig {}

impl HasSessionConfig for SessionConfig {
    fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    fn default_expiration(&self) -> Duration {
        Duration::from_secs(self.default_expiration_secs)
    }

    fn sweep_enabled(&self) -> bool {
        self.enable_sweep
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive for the console.
    pub level: String,
    /// Emit JSON lines on the console instead of human-readable output.
    pub json: bool,
    /// Directory for daily-rotated JSON log files. No file logging if unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: config_defaults::LOG_LEVEL.to_string(),
            json: false,
            directory: None,
        }
    }
}

impl ConfigProvider for LoggingConfig {}

impl HasLoggingConfig for LoggingConfig {
    fn log_level(&self) -> &str {
        &self.level
    }

    fn json_logs(&self) -> bool {
        self.json
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config() {
        let config = SatchelConfig::new();
        assert!(config.session.is_none());
        assert!(config.logging.is_none());
        assert_eq!(config.session_or_default(), SessionConfig::default());
    }

    #[test]
    fn test_parse_session_section() {
        let toml = r#"
[session]
sweep_interval_secs = 120
default_expiration_secs = 900
"#;
        let config = SatchelConfig::from_toml(toml).unwrap();
        let session = config.session.as_ref().unwrap();
        assert_eq!(session.sweep_interval(), Duration::from_secs(120));
        assert_eq!(session.default_expiration(), Duration::from_secs(900));
        // Unspecified fields fall back to defaults
        assert!(session.sweep_enabled());
    }

    #[test]
    fn test_parse_logging_section() {
        let toml = r#"
[logging]
level = "satchel_session=debug"
json = true
directory = "/tmp/satchel-logs"
"#;
        let config = SatchelConfig::from_toml(toml).unwrap();
        let logging = config.logging.as_ref().unwrap();
        assert_eq!(logging.log_level(), "satchel_session=debug");
        assert!(logging.json_logs());
        assert_eq!(
            logging.directory.as_deref(),
            Some(std::path::Path::new("/tmp/satchel-logs"))
        );
    }

    #[test]
    fn test_session_defaults() {
        let session = SessionConfig::default();
        assert_eq!(session.sweep_interval(), config_defaults::sweep_interval());
        assert_eq!(
            session.default_expiration(),
            config_defaults::default_expiration()
        );
        assert!(session.validate().is_ok());
    }

    #[test]
    fn test_zero_sweep_interval_rejected() {
        let config = SatchelConfig::from_toml("[session]\nsweep_interval_secs = 0\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { ref field, .. } if field == "session.sweep_interval_secs"
        ));
    }

    #[test]
    fn test_huge_sweep_interval_rejected() {
        let config =
            SatchelConfig::from_toml("[session]\nsweep_interval_secs = 9223372036854775807\n")
                .unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("at most"));

        let at_limit = SessionConfig {
            sweep_interval_secs: config_defaults::MAX_SWEEP_INTERVAL_SECS,
            ..SessionConfig::default()
        };
        assert!(at_limit.validate().is_ok());
    }

    #[test]
    fn test_zero_expiration_allowed() {
        let config =
            SatchelConfig::from_toml("[session]\ndefault_expiration_secs = 0\n").unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_roundtrip_toml() {
        let config = SatchelConfig::with_defaults();
        let toml = config.to_toml().unwrap();
        let parsed = SatchelConfig::from_toml(&toml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let config = SatchelConfig::from_toml("[server]\nport = 8080\n").unwrap();
        assert!(config.session.is_none());
    }
}
