//! Config command - configuration management.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use console::{Style, style};
use serde::Serialize;

use satchel_config::{self, PROJECT_CONFIG_FILE, SatchelConfig};
use satchel_types::HasSessionConfig;

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,

    /// Show which config files are loaded and their precedence
    Which,

    /// Initialize a config file with defaults
    Init {
        /// Create project-local config (./satchel.toml) instead of user config
        #[arg(long)]
        local: bool,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the user configuration file path
    Path,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Which => cmd_which(ctx),
        ConfigCommand::Init { local, force } => cmd_init(ctx, local, force),
        ConfigCommand::Path => cmd_path(ctx),
    }
}

/// Effective session settings for JSON output.
#[derive(Debug, Serialize)]
struct ShowOutput {
    sources: Vec<PathBuf>,
    sweep_interval_secs: u64,
    default_expiration_secs: u64,
    enable_sweep: bool,
    log_level: String,
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let config = &ctx.loaded.config;
    let session = config.session_or_default();
    let logging = config.logging_or_default();
    let sources: Vec<PathBuf> = ctx
        .loaded
        .loaded_from()
        .into_iter()
        .map(|p| p.to_path_buf())
        .collect();

    if ctx.json_output {
        let output = ShowOutput {
            sources,
            sweep_interval_secs: session.sweep_interval().as_secs(),
            default_expiration_secs: session.default_expiration().as_secs(),
            enable_sweep: session.sweep_enabled(),
            log_level: logging.level,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let dim = Style::new().dim();

    println!("{}", style("# Satchel Configuration").bold());
    println!();
    if sources.is_empty() {
        println!("{}", dim.apply_to("No config files loaded (using defaults)"));
    } else {
        println!("Config files:");
        for source in &sources {
            println!("  {}", source.display());
        }
    }
    println!();

    let effective = SatchelConfig {
        session: Some(session),
        logging: Some(logging),
    };
    print!("{}", effective.to_toml()?);
    Ok(())
}

fn cmd_which(ctx: &Context) -> Result<()> {
    if ctx.json_output {
        let sources: Vec<_> = ctx
            .loaded
            .sources
            .iter()
            .map(|s| serde_json::json!({ "path": s.path, "loaded": s.loaded }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&sources)?);
        return Ok(());
    }

    let green = Style::new().green();
    let dim = Style::new().dim();

    println!("Config layers (lowest precedence first):");
    for source in &ctx.loaded.sources {
        let marker = if source.loaded {
            green.apply_to("● loaded")
        } else {
            dim.apply_to("○ not found")
        };
        println!("  {}  {}", marker, source.path.display());
    }
    Ok(())
}

fn cmd_init(ctx: &Context, local: bool, force: bool) -> Result<()> {
    let path = if local {
        ctx.project_dir
            .as_ref()
            .map(|d| d.join(PROJECT_CONFIG_FILE))
            .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE))
    } else {
        user_config_file(ctx)?
    };

    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    satchel_config::save_config(&SatchelConfig::with_defaults(), &path)?;
    tracing::debug!(path = %path.display(), "Wrote default config");

    if ctx.json_output {
        println!("{}", serde_json::json!({ "path": path }));
    } else {
        println!("Created {}", path.display());
    }
    Ok(())
}

fn cmd_path(ctx: &Context) -> Result<()> {
    let path = user_config_file(ctx)?;
    if ctx.json_output {
        println!("{}", serde_json::json!({ "path": path }));
    } else {
        println!("{}", path.display());
    }
    Ok(())
}

fn user_config_file(ctx: &Context) -> Result<PathBuf> {
    match ctx.config_dir {
        Some(ref dir) => Ok(dir.join("config.toml")),
        None => satchel_config::user_config_path()
            .ok_or_else(|| anyhow::anyhow!("could not determine the user config directory")),
    }
}
