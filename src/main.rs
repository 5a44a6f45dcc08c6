use clap::Parser;
use std::path::Path;
use tick_alert::cli::{Cli, Commands};
use tick_alert::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Secrets usually live in .env; a missing file is fine
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut config = if Path::new(&cli.config).exists() {
        Config::load(&cli.config)?
    } else {
        eprintln!(
            "Config file {} not found, using defaults and environment",
            cli.config
        );
        Config::default()
    };
    config.apply_env();

    match cli.command {
        Commands::Run(args) => {
            tick_alert::telemetry::init_telemetry(&config.telemetry)?;
            tracing::info!("Starting feed alerting");
            args.execute(config).await?;
        }
        Commands::Check(args) => {
            tick_alert::telemetry::init_logging(
                &config.telemetry.log_level,
                config.telemetry.log_format,
            )?;
            args.execute(&config).await?;
        }
        Commands::Config => {
            println!("Current configuration:");
            println!("{}", toml::to_string_pretty(&config.redacted())?);
        }
    }

    Ok(())
}
