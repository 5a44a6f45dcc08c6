//! Market-data feed decoding
//!
//! Turns raw transport frames, JSON or the compact protobuf schema, into
//! normalized [`Tick`] batches. Callers never need to know which wire format
//! a frame used.

mod decoder;
pub mod proto;
mod types;

pub use decoder::{DecodeError, MessageDecoder};
pub use types::{FeedMessage, Tick, TickBatch, WireFormat};
