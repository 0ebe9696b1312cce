//! CLI command handlers.

use std::path::PathBuf;

use satchel_config::LoadedConfig;

pub mod config;
pub mod soak;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
    /// Explicit user config directory, if given.
    pub config_dir: Option<PathBuf>,
    /// Explicit project directory, if given.
    pub project_dir: Option<PathBuf>,
    /// Configuration loaded at startup.
    pub loaded: LoadedConfig,
}
