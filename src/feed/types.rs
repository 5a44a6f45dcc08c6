//! Normalized feed types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single normalized market-data update for an instrument
///
/// Produced only by the decoder; both wire formats normalize into this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Instrument key (e.g., "NSE_EQ|INE002A01018" or "NSE:NIFTY50-INDEX")
    pub instrument_key: String,
    /// Last traded price, always present and non-negative
    pub last_traded_price: Decimal,
    /// Last traded quantity
    pub last_traded_qty: Option<i64>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub open: Option<Decimal>,
    /// Previous close
    pub close: Option<Decimal>,
    pub volume: Option<i64>,
    pub bid: Option<Decimal>,
    pub ask: Option<Decimal>,
    pub bid_size: Option<i64>,
    pub ask_size: Option<i64>,
    /// Exchange segment (e.g., "NSE")
    pub exchange: Option<String>,
    /// Human-readable trading symbol
    pub trading_symbol: Option<String>,
    /// Exchange timestamp of the update
    pub timestamp: Option<DateTime<Utc>>,
}

impl Tick {
    /// Create a tick carrying only a key and a price
    pub fn new(instrument_key: impl Into<String>, last_traded_price: Decimal) -> Self {
        Self {
            instrument_key: instrument_key.into(),
            last_traded_price,
            last_traded_qty: None,
            high: None,
            low: None,
            open: None,
            close: None,
            volume: None,
            bid: None,
            ask: None,
            bid_size: None,
            ask_size: None,
            exchange: None,
            trading_symbol: None,
            timestamp: None,
        }
    }
}

/// Wire format a frame was decoded from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// Self-describing JSON frames
    Json,
    /// Compact protobuf frames
    Binary,
}

impl WireFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            WireFormat::Json => "json",
            WireFormat::Binary => "binary",
        }
    }
}

/// Ticks decoded from one frame
#[derive(Debug, Clone, PartialEq)]
pub struct TickBatch {
    pub ticks: Vec<Tick>,
    /// Format the frame was decoded from (informational only)
    pub format: WireFormat,
    /// Feeds dropped because they had no key or no valid price
    pub discarded: usize,
}

impl TickBatch {
    pub fn empty(format: WireFormat) -> Self {
        Self {
            ticks: Vec::new(),
            format,
            discarded: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }
}

/// A decoded frame, classified
#[derive(Debug, Clone, PartialEq)]
pub enum FeedMessage {
    /// Market data
    Ticks(TickBatch),
    /// Application-level heartbeat request; must be acknowledged
    Heartbeat,
    /// Reply to a handshake, subscription or other control request
    Ack { method: Option<String> },
    /// Broker reported an error status
    StatusError { message: String },
}
