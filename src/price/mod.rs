//! Price tracking and change detection
//!
//! [`PriceBook`] holds per-instrument state; [`ThresholdEvaluator`] compares
//! each new price against the instrument's alert baseline and emits an
//! [`AlertEvent`] when the move crosses the instrument's threshold.

mod state;
mod threshold;
mod types;

pub use state::{PriceBook, PriceState};
pub use threshold::{
    InstrumentClassifier, MarkerClassifier, ThresholdConfig, ThresholdEvaluator,
};
pub use types::{AlertEvent, Direction, InstrumentClass};
