//! Shared types for the Satchel session system.

pub mod config;

pub use config::{
    ConfigProvider, HasLoggingConfig, HasSessionConfig, SessionConfigProvider,
    defaults as config_defaults,
};
