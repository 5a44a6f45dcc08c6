//! Alert types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Instrument class, which selects the alert threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentClass {
    /// Market index (e.g., NIFTY 50); uses the lower threshold
    Index,
    /// Single stock
    Equity,
}

impl InstrumentClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstrumentClass::Index => "index",
            InstrumentClass::Equity => "equity",
        }
    }
}

/// Direction of a price move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
}

/// A price move that crossed its threshold
///
/// Immutable once created; this is the only value that crosses from the
/// ingestion path to the dispatch worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub instrument_key: String,
    pub class: InstrumentClass,
    /// Baseline the move was measured from (previous alert price)
    pub old_price: Decimal,
    pub new_price: Decimal,
    /// Signed change in price units
    pub change_abs: Decimal,
    /// Signed change in percent
    pub change_pct: Decimal,
    /// Threshold that was crossed, in percent
    pub threshold_pct: Decimal,
    pub triggered_at: DateTime<Utc>,
}

impl AlertEvent {
    pub fn direction(&self) -> Direction {
        if self.change_abs.is_sign_negative() {
            Direction::Down
        } else {
            Direction::Up
        }
    }
}
