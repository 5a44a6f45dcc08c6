//! In-process transport
//!
//! A channel-backed [`Transport`] that stands in for the broker: used to
//! replay captured frames and to drive sessions in tests.

use super::types::{ConnectRequest, Frame, TransportError};
use super::{Connector, Transport};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Create a connected transport/peer pair
pub fn pair() -> (MemoryTransport, MemoryPeer) {
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    (
        MemoryTransport {
            inbound: inbound_rx,
            outbound: outbound_tx,
        },
        MemoryPeer {
            inbound: inbound_tx,
            outbound: outbound_rx,
        },
    )
}

/// Client side of an in-process connection
pub struct MemoryTransport {
    inbound: mpsc::UnboundedReceiver<Result<Frame, TransportError>>,
    outbound: mpsc::UnboundedSender<Frame>,
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        self.outbound
            .send(frame)
            .map_err(|_| TransportError::SendFailed("peer dropped".to_string()))
    }

    async fn recv(&mut self) -> Option<Result<Frame, TransportError>> {
        self.inbound.recv().await
    }

    async fn close(&mut self) {
        self.inbound.close();
    }
}

/// Broker side of an in-process connection
///
/// Dropping the peer closes the connection from the client's point of view.
pub struct MemoryPeer {
    inbound: mpsc::UnboundedSender<Result<Frame, TransportError>>,
    outbound: mpsc::UnboundedReceiver<Frame>,
}

impl MemoryPeer {
    /// Push a text frame to the client
    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.inbound.send(Ok(Frame::Text(text.into()))).is_ok()
    }

    /// Push a binary frame to the client
    pub fn send_binary(&self, data: Vec<u8>) -> bool {
        self.inbound.send(Ok(Frame::Binary(data))).is_ok()
    }

    /// Make the client's next read fail
    pub fn fail(&self, error: TransportError) -> bool {
        self.inbound.send(Err(error)).is_ok()
    }

    /// Wait for the next frame the client sent
    pub async fn recv(&mut self) -> Option<Frame> {
        self.outbound.recv().await
    }

    /// Take a frame the client already sent, without waiting
    pub fn try_recv(&mut self) -> Option<Frame> {
        self.outbound.try_recv().ok()
    }
}

/// Connector that hands out scripted connection outcomes in order
///
/// Once the script is exhausted every further attempt fails.
#[derive(Default)]
pub struct MemoryConnector {
    script: Mutex<VecDeque<Result<MemoryTransport, TransportError>>>,
    attempts: AtomicU32,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful connection and return its broker side
    pub fn accept(&self) -> MemoryPeer {
        let (transport, peer) = pair();
        self.push(Ok(transport));
        peer
    }

    /// Queue a failed connection attempt
    pub fn refuse(&self, error: TransportError) {
        self.push(Err(error));
    }

    /// Number of connect calls made so far
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    fn push(&self, outcome: Result<MemoryTransport, TransportError>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(outcome);
        }
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, request: &ConnectRequest) -> Result<Box<dyn Transport>, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let next = self
            .script
            .lock()
            .map_err(|_| TransportError::ConnectionFailed("connector poisoned".to_string()))?
            .pop_front();

        match next {
            Some(Ok(transport)) => Ok(Box::new(transport)),
            Some(Err(e)) => Err(e),
            None => Err(TransportError::ConnectionFailed(format!(
                "no scripted connection for {}",
                request.endpoint
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ConnectRequest {
        ConnectRequest {
            endpoint: "memory://feed".to_string(),
            bearer_token: "t".to_string(),
            api_key: "k".to_string(),
        }
    }

    #[tokio::test]
    async fn test_pair_round_trip() {
        let (mut transport, mut peer) = pair();

        assert!(peer.send_text("hello"));
        let frame = transport.recv().await.unwrap().unwrap();
        assert_eq!(frame, Frame::Text("hello".to_string()));

        transport.send(Frame::Binary(vec![7])).await.unwrap();
        assert_eq!(peer.recv().await, Some(Frame::Binary(vec![7])));
    }

    #[tokio::test]
    async fn test_dropped_peer_closes_stream() {
        let (mut transport, peer) = pair();
        drop(peer);
        assert!(transport.recv().await.is_none());
        assert!(transport.send(Frame::Text("x".to_string())).await.is_err());
    }

    #[tokio::test]
    async fn test_connector_follows_script() {
        let connector = MemoryConnector::new();
        connector.refuse(TransportError::ConnectionFailed("down".to_string()));
        let _peer = connector.accept();

        assert!(connector.connect(&request()).await.is_err());
        assert!(connector.connect(&request()).await.is_ok());
        assert!(connector.connect(&request()).await.is_err());
        assert_eq!(connector.attempts(), 3);
    }
}
