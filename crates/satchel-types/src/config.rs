//! Configuration traits for decoupled config passing between crates.
//!
//! These traits allow components to depend on configuration capabilities without
//! requiring direct knowledge of the full configuration structure. Each trait
//! represents a specific configuration capability.

use std::time::Duration;

/// Base trait for all configuration types.
///
/// Implementations should be cheaply cloneable and thread-safe.
pub trait ConfigProvider: Clone + Send + Sync + 'static {}

/// Session registry configuration.
///
/// Provides settings for session expiration and the background sweep that
/// evicts expired sessions.
pub trait HasSessionConfig: ConfigProvider {
    /// Interval between sweep passes over the registry.
    fn sweep_interval(&self) -> Duration;

    /// Sliding expiration window applied to newly created sessions.
    fn default_expiration(&self) -> Duration;

    /// Whether the registry should run its background sweep.
    fn sweep_enabled(&self) -> bool {
        true
    }
}

/// Logging configuration.
pub trait HasLoggingConfig: ConfigProvider {
    /// Default filter directive (e.g. `info` or `satchel_session=debug`).
    fn log_level(&self) -> &str;

    /// Emit JSON-formatted log lines instead of human-readable ones.
    fn json_logs(&self) -> bool {
        false
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Default implementations for common types
// ─────────────────────────────────────────────────────────────────────────────

/// Default configuration values.
pub mod defaults {
    use std::time::Duration;

    pub const SWEEP_INTERVAL_SECS: u64 = 3600;
    /// Longest sweep interval accepted (one year).
    pub const MAX_SWEEP_INTERVAL_SECS: u64 = 365 * 24 * 3600;
    pub const DEFAULT_EXPIRATION_SECS: u64 = 3600;
    pub const LOG_LEVEL: &str = "info";

    pub fn sweep_interval() -> Duration {
        Duration::from_secs(SWEEP_INTERVAL_SECS)
    }

    pub fn default_expiration() -> Duration {
        Duration::from_secs(DEFAULT_EXPIRATION_SECS)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Simple wrapper types for standalone config passing
// ─────────────────────────────────────────────────────────────────────────────

/// Standalone session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfigProvider {
    pub sweep_interval: Duration,
    pub default_expiration: Duration,
    pub sweep_enabled: bool,
}

impl Default for SessionConfigProvider {
    fn default() -> Self {
        Self {
            sweep_interval: defaults::sweep_interval(),
            default_expiration: defaults::default_expiration(),
            sweep_enabled: true,
        }
    }
}

impl ConfigProvider for SessionConfigProvider {}

impl HasSessionConfig for SessionConfigProvider {
    fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    fn default_expiration(&self) -> Duration {
        self.default_expiration
    }

    fn sweep_enabled(&self) -> bool {
        self.sweep_enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_defaults() {
        let config = SessionConfigProvider::default();
        assert_eq!(config.sweep_interval(), defaults::sweep_interval());
        assert_eq!(config.default_expiration(), defaults::default_expiration());
        assert!(config.sweep_enabled());
    }

    #[test]
    fn test_defaults_are_one_hour() {
        assert_eq!(defaults::sweep_interval(), Duration::from_secs(60 * 60));
        assert_eq!(defaults::default_expiration(), Duration::from_secs(60 * 60));
        assert!(defaults::SWEEP_INTERVAL_SECS <= defaults::MAX_SWEEP_INTERVAL_SECS);
    }

    #[test]
    fn test_custom_session_config() {
        let config = SessionConfigProvider {
            sweep_interval: Duration::from_secs(120),
            default_expiration: Duration::from_secs(900),
            sweep_enabled: false,
        };
        assert_eq!(config.sweep_interval(), Duration::from_secs(120));
        assert_eq!(config.default_expiration(), Duration::from_secs(900));
        assert!(!config.sweep_enabled());
    }
}
