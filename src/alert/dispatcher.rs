//! Alert hand-off to the notifier
//!
//! The ingestion path only ever calls [`AlertDispatcher::dispatch`], which
//! enqueues without waiting. A worker task drains the queue, renders the text
//! and calls the notifier, so notifier latency never reaches the receive loop.
//!
//! [`AlertDispatcher::dispatch_text`] serves textual alerts such as news
//! headlines. Nothing in this crate produces them; an external producer
//! reaches the dispatcher through [`AlertPipeline::dispatcher_mut`].
//!
//! [`AlertPipeline::dispatcher_mut`]: crate::pipeline::AlertPipeline::dispatcher_mut

use super::dedup::DuplicateFilter;
use super::format::AlertFormatter;
use super::notifier::Notifier;
use crate::price::AlertEvent;
use crate::telemetry::{self, CounterMetric};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;

/// Dispatch hand-off errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// The queue in front of the worker is full; the alert was dropped
    #[error("alert queue is full")]
    QueueFull,
    /// The worker has stopped
    #[error("alert dispatcher is closed")]
    Closed,
}

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Destination passed to the notifier with every message
    pub destination: String,
    /// Alerts buffered ahead of the worker
    pub queue_capacity: usize,
    /// Text alerts remembered for near-duplicate checks
    pub dedup_capacity: usize,
    /// Similarity at or above which a text alert is suppressed
    pub dedup_threshold: f64,
    pub formatter: AlertFormatter,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            destination: String::new(),
            queue_capacity: 256,
            dedup_capacity: super::dedup::DEFAULT_WINDOW_CAPACITY,
            dedup_threshold: super::dedup::DEFAULT_SIMILARITY_THRESHOLD,
            formatter: AlertFormatter::default(),
        }
    }
}

/// Delivery statistics kept by the worker
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchStats {
    pub delivered: u64,
    pub failed: u64,
}

#[derive(Debug)]
enum Outgoing {
    Price(AlertEvent),
    Text(String),
}

/// Queue-fronted alert dispatcher
pub struct AlertDispatcher {
    tx: mpsc::Sender<Outgoing>,
    dedup: DuplicateFilter,
    stats: Arc<RwLock<DispatchStats>>,
}

impl AlertDispatcher {
    /// Spawn the delivery worker. The worker exits once every dispatcher
    /// handle is dropped and the queue is drained.
    pub fn spawn(notifier: Arc<dyn Notifier>, config: DispatcherConfig) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let stats = Arc::new(RwLock::new(DispatchStats::default()));
        let dedup = DuplicateFilter::new(config.dedup_capacity, config.dedup_threshold);

        let worker_stats = stats.clone();
        let handle = tokio::spawn(async move {
            Self::run_worker(rx, notifier, config, worker_stats).await;
        });

        (Self { tx, dedup, stats }, handle)
    }

    /// Enqueue a price alert without waiting
    pub fn dispatch(&self, event: AlertEvent) -> Result<(), DispatchError> {
        self.enqueue(Outgoing::Price(event))
    }

    /// Enqueue a textual alert unless it nearly repeats a recent one.
    ///
    /// Returns `Ok(false)` when the text was suppressed as a duplicate.
    pub fn dispatch_text(&mut self, text: impl Into<String>) -> Result<bool, DispatchError> {
        let text = text.into();
        if self.dedup.is_duplicate(&text) {
            telemetry::increment(CounterMetric::DuplicatesSuppressed, 1);
            tracing::debug!(text = %text, "Suppressed near-duplicate alert");
            return Ok(false);
        }
        self.enqueue(Outgoing::Text(text.clone()))?;
        self.dedup.remember(text);
        Ok(true)
    }

    /// Snapshot of delivery statistics
    pub async fn stats(&self) -> DispatchStats {
        self.stats.read().await.clone()
    }

    fn enqueue(&self, item: Outgoing) -> Result<(), DispatchError> {
        self.tx.try_send(item).map_err(|e| {
            telemetry::increment(CounterMetric::AlertsDropped, 1);
            match e {
                mpsc::error::TrySendError::Full(_) => {
                    tracing::warn!("Alert queue full, dropping alert");
                    DispatchError::QueueFull
                }
                mpsc::error::TrySendError::Closed(_) => DispatchError::Closed,
            }
        })
    }

    async fn run_worker(
        mut rx: mpsc::Receiver<Outgoing>,
        notifier: Arc<dyn Notifier>,
        config: DispatcherConfig,
        stats: Arc<RwLock<DispatchStats>>,
    ) {
        while let Some(item) = rx.recv().await {
            let text = match &item {
                Outgoing::Price(event) => config.formatter.render(event),
                Outgoing::Text(text) => text.clone(),
            };

            match notifier.send(&text, &config.destination).await {
                Ok(()) => {
                    telemetry::increment(CounterMetric::AlertsDelivered, 1);
                    stats.write().await.delivered += 1;
                }
                Err(e) => {
                    // At-most-once: no retry
                    telemetry::increment(CounterMetric::DispatchFailures, 1);
                    tracing::warn!(error = %e, "Alert delivery failed");
                    stats.write().await.failed += 1;
                }
            }
        }
        tracing::debug!("Alert dispatcher worker stopped");
    }
}
