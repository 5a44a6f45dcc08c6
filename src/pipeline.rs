//! Ingestion pipeline
//!
//! Consumes the supervisor's event stream on a single task, which is the
//! only writer of the [`PriceBook`]. Alerts leave through the dispatcher's
//! queue as immutable values; the notifier is never awaited here.

use crate::alert::{AlertDispatcher, DispatchError};
use crate::feed::Tick;
use crate::price::{AlertEvent, PriceBook, ThresholdEvaluator};
use crate::session::{FeedEvent, SessionState};
use crate::telemetry::{self, CounterMetric, GaugeMetric};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Pipeline counters
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PipelineStats {
    pub ticks: u64,
    pub alerts: u64,
    pub alerts_dropped: u64,
    pub heartbeats: u64,
    pub sessions_closed: u64,
}

/// Price book, evaluator and dispatcher wired to the feed
pub struct AlertPipeline {
    book: PriceBook,
    evaluator: ThresholdEvaluator,
    dispatcher: AlertDispatcher,
    stats: PipelineStats,
}

impl AlertPipeline {
    pub fn new(evaluator: ThresholdEvaluator, dispatcher: AlertDispatcher) -> Self {
        Self {
            book: PriceBook::new(),
            evaluator,
            dispatcher,
            stats: PipelineStats::default(),
        }
    }

    pub fn book(&self) -> &PriceBook {
        &self.book
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    /// Dispatcher handle, e.g. for textual alerts
    pub fn dispatcher_mut(&mut self) -> &mut AlertDispatcher {
        &mut self.dispatcher
    }

    /// Evaluate one tick and hand any alert to the dispatcher
    pub fn handle_tick(&mut self, tick: &Tick) -> Option<AlertEvent> {
        self.stats.ticks += 1;
        let event = self.evaluator.evaluate(
            &mut self.book,
            &tick.instrument_key,
            tick.last_traded_price,
        )?;

        self.stats.alerts += 1;
        telemetry::increment_labeled(CounterMetric::AlertsFired, "class", event.class.as_str());
        tracing::info!(
            instrument = %event.instrument_key,
            old_price = %event.old_price,
            new_price = %event.new_price,
            change_pct = %event.change_pct.round_dp(2),
            "Price alert"
        );

        if let Err(e) = self.dispatcher.dispatch(event.clone()) {
            self.stats.alerts_dropped += 1;
            if e == DispatchError::Closed {
                tracing::error!(instrument = %event.instrument_key, "Dispatcher closed, alert lost");
            }
        }
        Some(event)
    }

    /// Apply one feed event
    pub fn handle_event(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::Tick(tick) => {
                self.handle_tick(&tick);
            }
            FeedEvent::Heartbeat => self.stats.heartbeats += 1,
            FeedEvent::State(SessionState::Streaming) => {
                tracing::info!(tracked = self.book.len(), "Feed streaming");
            }
            FeedEvent::State(_) => {}
            FeedEvent::Closed(reason) => {
                self.stats.sessions_closed += 1;
                tracing::debug!(%reason, "Feed session ended");
            }
            FeedEvent::Reconnecting { attempt, delay } => {
                tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "Awaiting reconnect");
            }
            FeedEvent::Restarting { delay } => {
                tracing::debug!(delay_ms = delay.as_millis() as u64, "Awaiting restart");
            }
        }
        telemetry::set_gauge(GaugeMetric::TrackedInstruments, self.book.len() as f64);
    }

    /// Consume events until the stream ends or `stop` fires
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<FeedEvent>,
        stop: CancellationToken,
    ) -> PipelineStats {
        loop {
            tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                next = events.recv() => match next {
                    Some(event) => self.handle_event(event),
                    None => break,
                },
            }
        }

        tracing::info!(
            ticks = self.stats.ticks,
            alerts = self.stats.alerts,
            dropped = self.stats.alerts_dropped,
            "Alert pipeline stopped"
        );
        self.stats
    }
}
