//! Threshold-based change detection
//!
//! Each instrument is compared against the price at which it last alerted,
//! not against the previous tick. When an alert fires the baseline is
//! re-based to the new price, so a slow drift produces one alert per
//! threshold step instead of a storm.
//!
//! Ticks are taken as authoritative in arrival order. Transport-level
//! reordering can therefore produce a locally inconsistent change sign.

use super::state::PriceBook;
use super::types::{AlertEvent, InstrumentClass};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Alert thresholds in percent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Threshold for index-class instruments
    #[serde(default = "default_index_pct")]
    pub index_pct: Decimal,
    /// Threshold for equity-class instruments
    #[serde(default = "default_equity_pct")]
    pub equity_pct: Decimal,
}

fn default_index_pct() -> Decimal {
    dec!(0.5)
}
fn default_equity_pct() -> Decimal {
    dec!(1.0)
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            index_pct: default_index_pct(),
            equity_pct: default_equity_pct(),
        }
    }
}

impl ThresholdConfig {
    pub fn for_class(&self, class: InstrumentClass) -> Decimal {
        match class {
            InstrumentClass::Index => self.index_pct,
            InstrumentClass::Equity => self.equity_pct,
        }
    }
}

/// Decides which class an instrument key belongs to
pub trait InstrumentClassifier: Send + Sync {
    fn classify(&self, instrument_key: &str) -> InstrumentClass;
}

impl<F> InstrumentClassifier for F
where
    F: Fn(&str) -> InstrumentClass + Send + Sync,
{
    fn classify(&self, instrument_key: &str) -> InstrumentClass {
        self(instrument_key)
    }
}

/// Classifies by explicit instrument list, then by key substrings
///
/// Matching is case-insensitive. Keys matching neither are equities.
#[derive(Debug, Clone, Default)]
pub struct MarkerClassifier {
    markers: Vec<String>,
    instruments: HashSet<String>,
}

impl MarkerClassifier {
    pub fn new<M, I>(markers: M, instruments: I) -> Self
    where
        M: IntoIterator,
        M::Item: AsRef<str>,
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        Self {
            markers: markers
                .into_iter()
                .map(|m| m.as_ref().to_uppercase())
                .filter(|m| !m.is_empty())
                .collect(),
            instruments: instruments
                .into_iter()
                .map(|i| i.as_ref().to_uppercase())
                .collect(),
        }
    }
}

impl InstrumentClassifier for MarkerClassifier {
    fn classify(&self, instrument_key: &str) -> InstrumentClass {
        let key = instrument_key.to_uppercase();
        if self.instruments.contains(&key) || self.markers.iter().any(|m| key.contains(m)) {
            InstrumentClass::Index
        } else {
            InstrumentClass::Equity
        }
    }
}

/// Decides whether a new price is alert-worthy and keeps the price book current
pub struct ThresholdEvaluator {
    config: ThresholdConfig,
    classifier: Box<dyn InstrumentClassifier>,
}

impl ThresholdEvaluator {
    pub fn new(config: ThresholdConfig, classifier: impl InstrumentClassifier + 'static) -> Self {
        Self {
            config,
            classifier: Box::new(classifier),
        }
    }

    pub fn config(&self) -> &ThresholdConfig {
        &self.config
    }

    /// Class and threshold (percent) that apply to an instrument
    pub fn threshold_for(&self, instrument_key: &str) -> (InstrumentClass, Decimal) {
        let class = self.classifier.classify(instrument_key);
        (class, self.config.for_class(class))
    }

    /// Evaluate a new price, stamping any alert with the current time
    pub fn evaluate(
        &self,
        book: &mut PriceBook,
        instrument_key: &str,
        new_price: Decimal,
    ) -> Option<AlertEvent> {
        self.evaluate_at(book, instrument_key, new_price, Utc::now())
    }

    /// Evaluate a new price at an explicit time
    ///
    /// - First tick for an instrument: store as baseline, no alert.
    /// - Zero baseline: only `last_price` moves, no alert.
    /// - `|change%| >= threshold`: alert and re-base.
    ///
    /// `last_price` is updated in every case.
    pub fn evaluate_at(
        &self,
        book: &mut PriceBook,
        instrument_key: &str,
        new_price: Decimal,
        at: DateTime<Utc>,
    ) -> Option<AlertEvent> {
        let state = book.entry(instrument_key, at);
        state.ticks_seen += 1;
        state.updated_at = at;

        let Some(baseline) = state.last_alert_price else {
            state.last_price = new_price;
            state.last_alert_price = Some(new_price);
            tracing::debug!(instrument = instrument_key, price = %new_price, "Baseline set");
            return None;
        };
        state.last_price = new_price;

        if baseline.is_zero() {
            tracing::trace!(instrument = instrument_key, "Zero baseline, skipping evaluation");
            return None;
        }

        let change = new_price - baseline;
        let Some(change_pct) = change
            .checked_div(baseline)
            .and_then(|ratio| ratio.checked_mul(dec!(100)))
        else {
            tracing::warn!(instrument = instrument_key, %baseline, %new_price, "Change overflowed");
            return None;
        };

        let (class, threshold_pct) = self.threshold_for(instrument_key);
        if change_pct.abs() < threshold_pct {
            return None;
        }

        state.last_alert_price = Some(new_price);
        state.alerts_fired += 1;

        Some(AlertEvent {
            instrument_key: instrument_key.to_string(),
            class,
            old_price: baseline,
            new_price,
            change_abs: change,
            change_pct,
            threshold_pct,
            triggered_at: at,
        })
    }
}

impl Default for ThresholdEvaluator {
    fn default() -> Self {
        Self::new(
            ThresholdConfig::default(),
            MarkerClassifier::new(["INDEX"], Vec::<String>::new()),
        )
    }
}
