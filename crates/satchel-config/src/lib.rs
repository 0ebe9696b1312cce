//! Configuration system for Satchel.
//!
//! Provides TOML-based configuration with:
//! - A `[session]` section for registry expiration and sweep settings
//! - A `[logging]` section for the binary's tracing setup
//! - Config file layering (user config + project-local overrides)
//!
//! Section types implement the `satchel-types` config traits so consumers
//! depend on capabilities rather than on this crate's file format.

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    ConfigSource, LoadedConfig, PROJECT_CONFIG_FILE, load_config, load_config_file,
    load_config_with_options, save_config, user_config_dir, user_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
