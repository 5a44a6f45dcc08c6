//! Check command implementation

use crate::config::Config;
use clap::Args;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Skip reading the credential
    #[arg(long)]
    pub skip_credential: bool,
}

impl CheckArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        config.validate()?;

        if !self.skip_credential {
            let provider = config.credential_provider()?;
            provider.bearer_token().await?;
        }

        println!("Configuration OK");
        println!("  Endpoint: {}", config.feed.endpoint);
        println!("  Instruments: {}", config.feed.instruments.join(", "));
        println!(
            "  Thresholds: index {}%, equity {}%",
            config.thresholds.index_pct, config.thresholds.equity_pct
        );
        println!(
            "  Reconnect: {}ms..{}ms, {} attempts, restart after {}s",
            config.reconnect.base_delay_ms,
            config.reconnect.max_delay_ms,
            config.reconnect.max_attempts,
            config.reconnect.restart_delay_secs
        );
        println!(
            "  Notifier: {}",
            if config.alerts.webhook_url.is_some() {
                "webhook"
            } else {
                "log"
            }
        );
        Ok(())
    }
}
