//! Command-line interface for EchoBox.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;

/// EchoBox - anonymous messages, delivered
#[derive(Parser)]
#[command(name = "echobox")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to a config file (default: search config.toml locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Default)]
pub enum Commands {
    /// Start the HTTP server (default)
    #[default]
    Serve,

    /// Write a default config file
    #[command(alias = "init")]
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Load the config, migrate the database and check connectivity
    Check,
}

impl Cli {
    /// Loads the explicit config file when given, otherwise the usual
    /// search path. Environment overrides apply either way.
    pub fn load_config(&self) -> anyhow::Result<Config> {
        match &self.config {
            Some(path) => {
                let mut config = Config::load_from_path(path)?;
                config.apply_env_overrides(|key| std::env::var(key).ok());
                Ok(config)
            }
            None => Config::load(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_is_the_default() {
        let cli = Cli::parse_from(["echobox"]);
        assert!(matches!(cli.command.unwrap_or_default(), Commands::Serve));
    }

    #[test]
    fn parses_init_config() {
        let cli = Cli::parse_from(["echobox", "init-config", "--force", "-c", "/tmp/e.toml"]);
        assert!(matches!(cli.command, Some(Commands::InitConfig { force: true })));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/e.toml")));
    }
}
