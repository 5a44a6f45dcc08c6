//! Per-instrument price state

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Last-known price and alert baseline for one instrument
#[derive(Debug, Clone, PartialEq)]
pub struct PriceState {
    pub instrument_key: String,
    /// Most recent traded price seen
    pub last_price: Decimal,
    /// Price at which the last alert fired (the comparison baseline).
    /// `None` until the first tick has been seen.
    pub last_alert_price: Option<Decimal>,
    /// Ticks evaluated for this instrument
    pub ticks_seen: u64,
    /// Alerts fired for this instrument
    pub alerts_fired: u64,
    pub updated_at: DateTime<Utc>,
}

impl PriceState {
    fn new(instrument_key: &str, at: DateTime<Utc>) -> Self {
        Self {
            instrument_key: instrument_key.to_string(),
            last_price: Decimal::ZERO,
            last_alert_price: None,
            ticks_seen: 0,
            alerts_fired: 0,
            updated_at: at,
        }
    }
}

/// All instrument states for one engine
///
/// Owned by the ingestion path and mutated only through the evaluator.
/// Outlives individual feed sessions: prices belong to the market, not to
/// the connection.
#[derive(Debug, Default)]
pub struct PriceBook {
    entries: HashMap<String, PriceState>,
}

impl PriceBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the state for an instrument, if any tick has been seen
    pub fn get(&self, instrument_key: &str) -> Option<&PriceState> {
        self.entries.get(instrument_key)
    }

    /// Get or lazily create the state for an instrument
    pub(crate) fn entry(&mut self, instrument_key: &str, at: DateTime<Utc>) -> &mut PriceState {
        self.entries
            .entry(instrument_key.to_string())
            .or_insert_with(|| PriceState::new(instrument_key, at))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PriceState> {
        self.entries.values()
    }
}
