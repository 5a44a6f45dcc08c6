//! Session state machine

use std::fmt;

/// Lifecycle state of one feed connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Handshaking,
    Subscribed,
    Streaming,
    Closing,
}

impl SessionState {
    /// Is `next` a legal successor of this state?
    ///
    /// Every state before `Closing` may close; only `Closing` returns to
    /// `Disconnected`.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Disconnected, Connecting)
                | (Connecting, Handshaking)
                | (Handshaking, Subscribed)
                | (Subscribed, Streaming)
                | (Connecting | Handshaking | Subscribed | Streaming, Closing)
                | (Closing, Disconnected)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Handshaking => "handshaking",
            SessionState::Subscribed => "subscribed",
            SessionState::Streaming => "streaming",
            SessionState::Closing => "closing",
        }
    }

    /// Numeric form for the state gauge
    pub fn ordinal(&self) -> u8 {
        match self {
            SessionState::Disconnected => 0,
            SessionState::Connecting => 1,
            SessionState::Handshaking => 2,
            SessionState::Subscribed => 3,
            SessionState::Streaming => 4,
            SessionState::Closing => 5,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
