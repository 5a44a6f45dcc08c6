//! CLI interface for tick-alert
//!
//! Provides subcommands for:
//! - `run`: Stream the feed and dispatch alerts until Ctrl-C
//! - `check`: Validate configuration and credential
//! - `config`: Show the effective configuration

mod check;
mod run;

pub use check::CheckArgs;
pub use run::RunArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "tick-alert")]
#[command(about = "Live market-data feed ingestion and price-move alerting")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stream the feed and dispatch alerts
    Run(RunArgs),
    /// Validate configuration and read the credential once
    Check(CheckArgs),
    /// Show the effective configuration, secrets redacted
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_with_config() {
        let cli = Cli::parse_from(["tick-alert", "--config", "alt.toml", "run", "--log-only"]);
        assert_eq!(cli.config, "alt.toml");
        match cli.command {
            Commands::Run(args) => assert!(args.log_only),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_default_config_path() {
        let cli = Cli::parse_from(["tick-alert", "check"]);
        assert_eq!(cli.config, "config.toml");
        assert!(matches!(cli.command, Commands::Check(_)));
    }

    #[test]
    fn test_config_command() {
        let cli = Cli::parse_from(["tick-alert", "config"]);
        assert!(matches!(cli.command, Commands::Config));
    }
}
