//! Feed transport
//!
//! The session talks to the broker through the [`Transport`] and
//! [`Connector`] traits. [`WsConnector`] is the production WebSocket
//! implementation with ping/pong keepalive; [`memory`] provides an
//! in-process stand-in.

mod client;
pub mod memory;
mod types;

pub use client::{WsConnector, WsTransport};
pub use types::{ConnectRequest, Frame, TransportError, WsConfig};

use async_trait::async_trait;

/// One established, bidirectional frame transport
#[async_trait]
pub trait Transport: Send {
    /// Send a frame to the peer
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError>;

    /// Receive the next frame. `None` means the peer closed the stream.
    async fn recv(&mut self) -> Option<Result<Frame, TransportError>>;

    /// Close the connection; errors are not reported
    async fn close(&mut self);
}

/// Factory for transports
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a new connection to the request's endpoint
    async fn connect(&self, request: &ConnectRequest) -> Result<Box<dyn Transport>, TransportError>;
}
