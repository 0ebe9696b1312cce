//! Configuration for the session registry.

use std::time::Duration;

use satchel_types::{HasSessionConfig, config_defaults};

/// Configuration for the session registry.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Sliding expiration window given to newly created sessions.
    pub default_expiration: Duration,

    /// Interval between sweep passes.
    pub sweep_interval: Duration,

    /// Whether [`SessionRegistry::start`](crate::SessionRegistry::start) should
    /// launch the background sweep. If false, expired sessions are only
    /// filtered on lookup and removed by explicit purges.
    pub enable_sweep: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            default_expiration: config_defaults::default_expiration(),
            sweep_interval: config_defaults::sweep_interval(),
            enable_sweep: true,
        }
    }
}

impl RegistryConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from any session config provider.
    pub fn from_session_config<C: HasSessionConfig>(config: &C) -> Self {
        Self {
            default_expiration: config.default_expiration(),
            sweep_interval: config.sweep_interval(),
            enable_sweep: config.sweep_enabled(),
        }
    }

    /// Set the expiration window for new sessions.
    pub fn with_default_expiration(mut self, expiration: Duration) -> Self {
        self.default_expiration = expiration;
        self
    }

    /// Set the sweep interval.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Enable or disable the background sweep.
    pub fn with_sweep(mut self, enabled: bool) -> Self {
        self.enable_sweep = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use satchel_types::SessionConfigProvider;

    #[test]
    fn test_defaults() {
        let config = RegistryConfig::new();
        assert_eq!(config.default_expiration, Duration::from_secs(3600));
        assert_eq!(config.sweep_interval, Duration::from_secs(3600));
        assert!(config.enable_sweep);
    }

    #[test]
    fn test_from_session_config() {
        let provider = SessionConfigProvider {
            sweep_interval: Duration::from_secs(30),
            default_expiration: Duration::from_secs(600),
            sweep_enabled: false,
        };
        let config = RegistryConfig::from_session_config(&provider);
        assert_eq!(config.sweep_interval, Duration::from_secs(30));
        assert_eq!(config.default_expiration, Duration::from_secs(600));
        assert!(!config.enable_sweep);
    }

    #[test]
    fn test_builder() {
        let config = RegistryConfig::new()
            .with_default_expiration(Duration::from_millis(50))
            .with_sweep_interval(Duration::from_millis(100))
            .with_sweep(false);
        assert_eq!(config.default_expiration, Duration::from_millis(50));
        assert_eq!(config.sweep_interval, Duration::from_millis(100));
        assert!(!config.enable_sweep);
    }
}
