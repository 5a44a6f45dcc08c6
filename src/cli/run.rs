//! Run command implementation

use crate::alert::{AlertDispatcher, LogNotifier, Notifier};
use crate::config::Config;
use crate::pipeline::AlertPipeline;
use crate::session::{FeedSession, ReconnectSupervisor};
use crate::ws::{Connector, WsConnector};
use anyhow::Context;
use clap::Args;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Log alerts instead of sending them to the webhook
    #[arg(long)]
    pub log_only: bool,
}

impl RunArgs {
    pub async fn execute(&self, config: Config) -> anyhow::Result<()> {
        config.validate()?;

        let credential = config.credential_provider()?;
        credential
            .bearer_token()
            .await
            .context("Initial credential read failed")?;

        let notifier: Arc<dyn Notifier> = if self.log_only {
            Arc::new(LogNotifier)
        } else {
            config.notifier()?
        };
        let (dispatcher, dispatch_handle) =
            AlertDispatcher::spawn(notifier, config.dispatcher_config());
        let pipeline = AlertPipeline::new(config.evaluator(), dispatcher);

        let connector: Arc<dyn Connector> = Arc::new(WsConnector::new(config.ws_config()));
        let session_config = config.session_config();
        let factory = move || {
            FeedSession::new(session_config.clone(), connector.clone(), credential.clone())
        };

        let stop = CancellationToken::new();
        let (tx, rx) = mpsc::channel(4096);
        let supervisor = ReconnectSupervisor::new(config.reconnect.policy());
        let supervisor_handle = tokio::spawn({
            let stop = stop.clone();
            async move { supervisor.run(factory, tx, stop).await }
        });
        let pipeline_handle = tokio::spawn(pipeline.run(rx, stop.clone()));

        tracing::info!(
            endpoint = %config.feed.endpoint,
            instruments = config.feed.instruments.len(),
            "tick-alert running, press Ctrl-C to stop"
        );

        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl-C")?;
        tracing::info!("Shutdown requested");
        stop.cancel();

        supervisor_handle.await?;
        let stats = pipeline_handle.await?;
        // Dispatcher was dropped with the pipeline; wait for the queue to drain
        dispatch_handle.await?;

        tracing::info!(
            ticks = stats.ticks,
            alerts = stats.alerts,
            dropped = stats.alerts_dropped,
            sessions = stats.sessions_closed,
            "Stopped"
        );
        Ok(())
    }
}
