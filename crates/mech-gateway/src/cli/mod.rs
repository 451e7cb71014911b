//! Command-line surface (grounded on the teacher's `cli/mod.rs`): a
//! `serve`-by-default binary plus `doctor` and `config` utility
//! subcommands. Everything else the teacher's CLI carried — `init`,
//! `login`, `systemd`, `import` — serves collaborators spec.md §1 scopes
//! out (OAuth credential stores, openclaw import, service-unit
//! generation) and has no counterpart here.

pub mod config;

use clap::{Parser, Subcommand};
use mech_domain::config::Config;

/// mech — the MECH orchestration core (overseer loop + tool dispatch).
#[derive(Debug, Parser)]
#[command(name = "mech", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a single MECH loop (default when no subcommand is given).
    Run {
        /// The message to send to the Overseer.
        message: String,
        /// Keep looping after the first reply instead of stopping.
        #[arg(long)]
        r#loop: bool,
        /// Pin a specific model, bypassing rotation/fallback.
        #[arg(long)]
        model: Option<String>,
        /// Print the full `MechResult` as JSON instead of just the result text.
        #[arg(long)]
        json: bool,
    },
    /// Run diagnostic checks against the current configuration.
    Doctor,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

/// Load the configuration from the path named by `MECH_CONFIG` (or
/// `config.toml` by default), falling back to built-in defaults when the
/// file does not exist. Shared by `run`, `doctor`, and `config` so the
/// logic lives in one place.
pub fn load_config() -> anyhow::Result<(Config, String)> {
    let config_path = std::env::var("MECH_CONFIG").unwrap_or_else(|_| "config.toml".into());

    let config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path).map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
        toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))?
    } else {
        Config::default()
    };

    Ok((config, config_path))
}
