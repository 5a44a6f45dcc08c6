//! tick-alert: live market-data feed ingestion and price-move alerting
//!
//! This library provides the core components for:
//! - Streaming feed connections with handshake, heartbeat and reconnect
//! - Dual-format (JSON / protobuf) tick decoding
//! - Per-instrument price tracking and threshold alerts
//! - Near-duplicate suppression for textual alerts
//! - Non-blocking alert dispatch to an external notifier
//! - Structured logging and Prometheus metrics

pub mod alert;
pub mod cli;
pub mod config;
pub mod credential;
pub mod feed;
pub mod pipeline;
pub mod price;
pub mod session;
pub mod telemetry;
pub mod ws;
