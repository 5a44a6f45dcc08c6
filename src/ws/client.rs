//! WebSocket transport backed by tokio-tungstenite

use super::types::{ConnectRequest, Frame, TransportError, WsConfig};
use super::{Connector, Transport};
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::{interval_at, timeout, Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens authenticated WebSocket connections to the feed endpoint
pub struct WsConnector {
    config: WsConfig,
}

impl WsConnector {
    /// Create a new connector with the given configuration
    pub fn new(config: WsConfig) -> Self {
        Self { config }
    }

    /// Get the configuration
    pub fn config(&self) -> &WsConfig {
        &self.config
    }

    fn header(value: &str) -> Result<HeaderValue, TransportError> {
        HeaderValue::from_str(value).map_err(|e| TransportError::InvalidRequest(e.to_string()))
    }
}

impl Default for WsConnector {
    fn default() -> Self {
        Self::new(WsConfig::default())
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, request: &ConnectRequest) -> Result<Box<dyn Transport>, TransportError> {
        tracing::info!(endpoint = %request.endpoint, "Connecting to feed WebSocket");

        let mut upgrade = request
            .endpoint
            .as_str()
            .into_client_request()
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        let headers = upgrade.headers_mut();
        headers.insert(
            "Authorization",
            Self::header(&format!("Bearer {}", request.bearer_token))?,
        );
        headers.insert("Api-Key", Self::header(&request.api_key)?);
        headers.insert("Api-Version", Self::header(&self.config.api_version)?);
        headers.insert("Accept", Self::header("*/*")?);

        let (stream, _response) = timeout(self.config.connect_timeout, connect_async(upgrade))
            .await
            .map_err(|_| TransportError::ConnectTimeout(self.config.connect_timeout))?
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        tracing::info!("WebSocket connected");

        Ok(Box::new(WsTransport::new(stream, &self.config)))
    }
}

/// One live WebSocket connection with ping/pong keepalive
pub struct WsTransport {
    write: SplitSink<WsStream, Message>,
    read: SplitStream<WsStream>,
    ping_interval: Interval,
    waiting_for_pong: bool,
}

impl WsTransport {
    fn new(stream: WsStream, config: &WsConfig) -> Self {
        let (write, read) = stream.split();
        let mut ping_interval =
            interval_at(Instant::now() + config.ping_interval, config.ping_interval);
        ping_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        Self {
            write,
            read,
            ping_interval,
            waiting_for_pong: false,
        }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        let msg = match frame {
            Frame::Text(text) => Message::Text(text),
            Frame::Binary(data) => Message::Binary(data),
        };
        self.write
            .send(msg)
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<Frame, TransportError>> {
        loop {
            tokio::select! {
                msg = self.read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => return Some(Ok(Frame::Text(text))),
                        Some(Ok(Message::Binary(data))) => return Some(Ok(Frame::Binary(data))),
                        Some(Ok(Message::Ping(data))) => {
                            if let Err(e) = self.write.send(Message::Pong(data)).await {
                                return Some(Err(TransportError::SendFailed(e.to_string())));
                            }
                        }
                        Some(Ok(Message::Pong(_))) => {
                            self.waiting_for_pong = false;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            tracing::info!("Received close frame");
                            return Some(Err(TransportError::Closed(
                                frame.map(|f| f.reason.to_string()),
                            )));
                        }
                        Some(Ok(Message::Frame(_))) => {}
                        Some(Err(e)) => {
                            return Some(Err(TransportError::ReceiveFailed(e.to_string())));
                        }
                        None => return None,
                    }
                }

                _ = self.ping_interval.tick() => {
                    if self.waiting_for_pong {
                        return Some(Err(TransportError::PongTimeout));
                    }
                    if let Err(e) = self.write.send(Message::Ping(Vec::new())).await {
                        return Some(Err(TransportError::SendFailed(e.to_string())));
                    }
                    self.waiting_for_pong = true;
                }
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.write.send(Message::Close(None)).await {
            tracing::debug!(error = %e, "Close frame not sent");
        }
        let _ = self.write.close().await;
    }
}
