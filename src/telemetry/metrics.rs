//! Prometheus metrics

use std::net::SocketAddr;

/// Counter metric types
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    /// Frames decoded, labelled by wire format
    FramesDecoded,
    /// Frames matching neither wire format
    DecodeFailures,
    /// Feed entries dropped for a missing key or price
    TicksDiscarded,
    /// Heartbeat requests acknowledged
    HeartbeatsAcked,
    /// Price alerts fired, labelled by instrument class
    AlertsFired,
    /// Alerts handed to the notifier successfully
    AlertsDelivered,
    /// Notifier failures
    DispatchFailures,
    /// Alerts dropped because the dispatch queue was full or closed
    AlertsDropped,
    /// Text alerts suppressed as near-duplicates
    DuplicatesSuppressed,
    /// Inner-layer reconnect attempts
    ReconnectAttempts,
    /// Outer-layer supervisor restarts
    SupervisorRestarts,
}

impl CounterMetric {
    fn name(self) -> &'static str {
        match self {
            CounterMetric::FramesDecoded => "tickalert_frames_decoded_total",
            CounterMetric::DecodeFailures => "tickalert_decode_failures_total",
            CounterMetric::TicksDiscarded => "tickalert_ticks_discarded_total",
            CounterMetric::HeartbeatsAcked => "tickalert_heartbeats_acked_total",
            CounterMetric::AlertsFired => "tickalert_alerts_fired_total",
            CounterMetric::AlertsDelivered => "tickalert_alerts_delivered_total",
            CounterMetric::DispatchFailures => "tickalert_dispatch_failures_total",
            CounterMetric::AlertsDropped => "tickalert_alerts_dropped_total",
            CounterMetric::DuplicatesSuppressed => "tickalert_duplicates_suppressed_total",
            CounterMetric::ReconnectAttempts => "tickalert_reconnect_attempts_total",
            CounterMetric::SupervisorRestarts => "tickalert_supervisor_restarts_total",
        }
    }
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Current session state as its ordinal
    SessionState,
    /// Instruments with price state
    TrackedInstruments,
}

impl GaugeMetric {
    fn name(self) -> &'static str {
        match self {
            GaugeMetric::SessionState => "tickalert_session_state",
            GaugeMetric::TrackedInstruments => "tickalert_tracked_instruments",
        }
    }
}

/// Increment a counter
pub fn increment(metric: CounterMetric, by: u64) {
    metrics::counter!(metric.name()).increment(by);
}

/// Increment a counter with one label
pub fn increment_labeled(metric: CounterMetric, key: &'static str, value: &'static str) {
    metrics::counter!(metric.name(), key => value).increment(1);
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    metrics::gauge!(metric.name()).set(value);
}

/// Install the Prometheus exporter on the given port
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics exporter: {}", e))?;
    tracing::info!(%addr, "Prometheus metrics exporter listening");
    Ok(())
}
