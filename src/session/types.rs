//! Session configuration, events and close reasons

use super::state::SessionState;
use crate::feed::Tick;
use crate::ws::TransportError;
use std::time::Duration;

/// Settings for one feed connection
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Feed endpoint URL
    pub endpoint: String,
    /// Broker API key
    pub api_key: String,
    /// Instruments subscribed in full mode
    pub instrument_keys: Vec<String>,
    /// Expected heartbeat cadence; idle detection uses three of these
    pub heartbeat_interval: Duration,
    /// How long to wait for the handshake reply
    pub handshake_timeout: Duration,
    /// Undecodable frames in a row tolerated before closing
    pub max_consecutive_decode_failures: u32,
    /// `source` field of the handshake
    pub source: String,
}

impl SessionConfig {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        instrument_keys: Vec<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            instrument_keys,
            heartbeat_interval: Duration::from_secs(30),
            handshake_timeout: Duration::from_secs(10),
            max_consecutive_decode_failures: 10,
            source: "tick-alert".to_string(),
        }
    }

    /// No inbound frame for this long closes the session
    pub fn idle_timeout(&self) -> Duration {
        self.heartbeat_interval * 3
    }
}

/// Why a session ended
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CloseReason {
    /// Explicit stop, or the event consumer went away
    #[error("stopped")]
    Stopped,
    #[error("peer closed the connection{}", .0.as_deref().map(|r| format!(": {r}")).unwrap_or_default())]
    PeerClosed(Option<String>),
    #[error("transport error: {0}")]
    Transport(TransportError),
    #[error("handshake rejected: {0}")]
    HandshakeRejected(String),
    #[error("no handshake reply within {0:?}")]
    HandshakeTimeout(Duration),
    #[error("no frames for {0:?}")]
    IdleTimeout(Duration),
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
    #[error("credential unavailable: {0}")]
    Credential(String),
}

impl From<TransportError> for CloseReason {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Closed(reason) => CloseReason::PeerClosed(reason),
            other => CloseReason::Transport(other),
        }
    }
}

/// Everything the ingestion side observes from the feed
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// One normalized tick
    Tick(Tick),
    /// A heartbeat request arrived and was acknowledged
    Heartbeat,
    /// The session moved to a new state
    State(SessionState),
    /// The session ended
    Closed(CloseReason),
    /// The supervisor will retry after `delay`
    Reconnecting { attempt: u32, delay: Duration },
    /// The supervisor exhausted its fast retries and restarts after `delay`
    Restarting { delay: Duration },
}

/// Result of driving one session to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub reason: CloseReason,
    /// Did the session get as far as streaming?
    pub reached_streaming: bool,
}
