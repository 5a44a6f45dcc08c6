//! WebSocket types and configuration

use std::time::Duration;

/// WebSocket transport configuration
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// Interval for sending ping frames
    pub ping_interval: Duration,
    /// Timeout for establishing the connection
    pub connect_timeout: Duration,
    /// API version header sent with the upgrade request
    pub api_version: String,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            api_version: "2.0".to_string(),
        }
    }
}

impl WsConfig {
    /// Set ping interval
    pub fn ping_interval(mut self, d: Duration) -> Self {
        self.ping_interval = d;
        self
    }

    /// Set connect timeout
    pub fn connect_timeout(mut self, d: Duration) -> Self {
        self.connect_timeout = d;
        self
    }
}

/// Everything needed to open one feed connection
#[derive(Clone)]
pub struct ConnectRequest {
    /// Feed endpoint URL (ws:// or wss://)
    pub endpoint: String,
    /// Bearer credential
    pub bearer_token: String,
    /// Broker API key
    pub api_key: String,
}

impl std::fmt::Debug for ConnectRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectRequest")
            .field("endpoint", &self.endpoint)
            .field("bearer_token", &"<redacted>")
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// A single transport frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Text frame
    Text(String),
    /// Binary frame
    Binary(Vec<u8>),
}

impl Frame {
    /// Raw payload bytes, regardless of frame kind
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Frame::Text(text) => text.as_bytes(),
            Frame::Binary(data) => data,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

/// Transport errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Connection could not be established
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    /// Connection attempt timed out
    #[error("connection timed out after {0:?}")]
    ConnectTimeout(Duration),
    /// Invalid endpoint or header value
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Peer closed the connection
    #[error("connection closed by peer{}", .0.as_deref().map(|r| format!(": {r}")).unwrap_or_default())]
    Closed(Option<String>),
    /// Send failed
    #[error("send failed: {0}")]
    SendFailed(String),
    /// Read failed
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
    /// No pong arrived before the next ping was due
    #[error("pong timeout")]
    PongTimeout,
}
