//! One feed connection, handshake through close

use super::protocol;
use super::state::SessionState;
use super::types::{CloseReason, FeedEvent, SessionConfig, SessionOutcome};
use crate::credential::CredentialProvider;
use crate::feed::{DecodeError, FeedMessage, MessageDecoder, TickBatch};
use crate::telemetry::{self, CounterMetric, GaugeMetric};
use crate::ws::{ConnectRequest, Connector, Frame, Transport, TransportError};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{timeout, timeout_at, Instant};
use tokio_util::sync::CancellationToken;

/// Drives one logical feed connection
///
/// Sends the handshake and subscription, answers heartbeats on the same
/// connection before anything else and forwards normalized ticks. It never
/// retries: every exit is reported as a single [`FeedEvent::Closed`].
pub struct FeedSession {
    id: String,
    config: SessionConfig,
    connector: Arc<dyn Connector>,
    credential: Arc<dyn CredentialProvider>,
    decoder: MessageDecoder,
    state: SessionState,
    decode_failures: u32,
    reached_streaming: bool,
}

impl FeedSession {
    pub fn new(
        config: SessionConfig,
        connector: Arc<dyn Connector>,
        credential: Arc<dyn CredentialProvider>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            config,
            connector,
            credential,
            decoder: MessageDecoder::new(),
            state: SessionState::Disconnected,
            decode_failures: 0,
            reached_streaming: false,
        }
    }

    /// Session identifier sent in every outbound payload
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Spawn the session and return its event stream
    pub fn start(mut self, stop: CancellationToken) -> mpsc::Receiver<FeedEvent> {
        let (tx, rx) = mpsc::channel(1024);
        tokio::spawn(async move {
            self.run(&tx, &stop).await;
        });
        rx
    }

    /// Drive the session until it closes
    pub async fn run(
        &mut self,
        events: &mpsc::Sender<FeedEvent>,
        stop: &CancellationToken,
    ) -> SessionOutcome {
        self.decode_failures = 0;
        self.reached_streaming = false;

        let mut transport: Option<Box<dyn Transport>> = None;
        let reason = match self.drive(&mut transport, events, stop).await {
            Err(reason) => reason,
            Ok(never) => match never {},
        };

        self.transition(SessionState::Closing, events).await;
        if let Some(mut transport) = transport.take() {
            transport.close().await;
        }
        self.transition(SessionState::Disconnected, events).await;

        match &reason {
            CloseReason::Stopped => tracing::info!(session_id = %self.id, "Feed session stopped"),
            reason => tracing::warn!(session_id = %self.id, %reason, "Feed session closed"),
        }
        let _ = events.send(FeedEvent::Closed(reason.clone())).await;

        SessionOutcome {
            reason,
            reached_streaming: self.reached_streaming,
        }
    }

    async fn drive(
        &mut self,
        slot: &mut Option<Box<dyn Transport>>,
        events: &mpsc::Sender<FeedEvent>,
        stop: &CancellationToken,
    ) -> Result<Infallible, CloseReason> {
        self.transition(SessionState::Connecting, events).await;

        let bearer_token = self
            .credential
            .bearer_token()
            .await
            .map_err(|e| CloseReason::Credential(e.to_string()))?;
        let request = ConnectRequest {
            endpoint: self.config.endpoint.clone(),
            bearer_token,
            api_key: self.config.api_key.clone(),
        };

        tracing::info!(session_id = %self.id, endpoint = %request.endpoint, "Connecting to feed");
        let connected = tokio::select! {
            biased;
            _ = stop.cancelled() => return Err(CloseReason::Stopped),
            result = self.connector.connect(&request) => result?,
        };
        let transport = slot.insert(connected);

        self.transition(SessionState::Handshaking, events).await;
        let handshake = protocol::handshake(
            &self.id,
            &request.bearer_token,
            &request.api_key,
            &self.config.source,
        );
        transport.send(Frame::Text(handshake)).await?;
        self.await_handshake(transport.as_mut(), events, stop).await?;

        let subscribe = protocol::subscribe(&self.id, &self.config.instrument_keys);
        transport.send(Frame::Text(subscribe)).await?;
        self.transition(SessionState::Subscribed, events).await;
        tracing::info!(
            session_id = %self.id,
            instruments = self.config.instrument_keys.len(),
            "Subscribed"
        );

        self.receive_loop(transport.as_mut(), events, stop).await
    }

    /// Wait for the handshake reply, answering heartbeats meanwhile
    async fn await_handshake(
        &mut self,
        transport: &mut dyn Transport,
        events: &mpsc::Sender<FeedEvent>,
        stop: &CancellationToken,
    ) -> Result<(), CloseReason> {
        let limit = self.config.handshake_timeout;
        let deadline = Instant::now() + limit;

        loop {
            let frame = tokio::select! {
                biased;
                _ = stop.cancelled() => return Err(CloseReason::Stopped),
                next = timeout_at(deadline, transport.recv()) => match next {
                    Err(_) => return Err(CloseReason::HandshakeTimeout(limit)),
                    Ok(next) => frame_or_close(next)?,
                },
            };

            match self.decoder.decode_message(frame.as_bytes()) {
                Ok(FeedMessage::Heartbeat) => self.answer_heartbeat(transport, events).await?,
                Ok(FeedMessage::StatusError { message }) => {
                    return Err(CloseReason::HandshakeRejected(message));
                }
                Ok(FeedMessage::Ack { method }) => {
                    tracing::debug!(session_id = %self.id, ?method, "Handshake acknowledged");
                    self.decode_failures = 0;
                    return Ok(());
                }
                Ok(FeedMessage::Ticks(batch)) => {
                    // Some brokers skip the reply and start streaming
                    self.decode_failures = 0;
                    self.forward_ticks(batch, events).await?;
                    return Ok(());
                }
                Err(e) => self.record_decode_failure(e)?,
            }
        }
    }

    async fn receive_loop(
        &mut self,
        transport: &mut dyn Transport,
        events: &mpsc::Sender<FeedEvent>,
        stop: &CancellationToken,
    ) -> Result<Infallible, CloseReason> {
        let idle = self.config.idle_timeout();

        loop {
            let frame = tokio::select! {
                biased;
                _ = stop.cancelled() => return Err(CloseReason::Stopped),
                next = timeout(idle, transport.recv()) => match next {
                    Err(_) => return Err(CloseReason::IdleTimeout(idle)),
                    Ok(next) => frame_or_close(next)?,
                },
            };

            let decoded = self.decoder.decode_message(frame.as_bytes());

            // Heartbeat reply goes out before anything else about this frame
            if let Ok(FeedMessage::Heartbeat) = decoded {
                self.answer_heartbeat(transport, events).await?;
            }

            if self.state == SessionState::Subscribed {
                self.transition(SessionState::Streaming, events).await;
            }

            match decoded {
                Ok(FeedMessage::Heartbeat) => self.decode_failures = 0,
                Ok(FeedMessage::Ticks(batch)) => {
                    self.decode_failures = 0;
                    self.forward_ticks(batch, events).await?;
                }
                Ok(FeedMessage::Ack { method }) => {
                    self.decode_failures = 0;
                    tracing::debug!(session_id = %self.id, ?method, "Control acknowledgement");
                }
                Ok(FeedMessage::StatusError { message }) => {
                    self.decode_failures = 0;
                    tracing::warn!(session_id = %self.id, %message, "Broker reported an error");
                }
                Err(e) => self.record_decode_failure(e)?,
            }
        }
    }

    async fn answer_heartbeat(
        &mut self,
        transport: &mut dyn Transport,
        events: &mpsc::Sender<FeedEvent>,
    ) -> Result<(), CloseReason> {
        transport
            .send(Frame::Text(protocol::heartbeat_ack(&self.id)))
            .await?;
        telemetry::increment(CounterMetric::HeartbeatsAcked, 1);
        tracing::trace!(session_id = %self.id, "Heartbeat acknowledged");
        emit(events, FeedEvent::Heartbeat).await
    }

    async fn forward_ticks(
        &mut self,
        batch: TickBatch,
        events: &mpsc::Sender<FeedEvent>,
    ) -> Result<(), CloseReason> {
        telemetry::increment_labeled(CounterMetric::FramesDecoded, "format", batch.format.as_str());
        if batch.discarded > 0 {
            telemetry::increment(CounterMetric::TicksDiscarded, batch.discarded as u64);
            tracing::debug!(
                session_id = %self.id,
                discarded = batch.discarded,
                "Dropped feed entries without a usable key or price"
            );
        }
        for tick in batch.ticks {
            emit(events, FeedEvent::Tick(tick)).await?;
        }
        Ok(())
    }

    fn record_decode_failure(&mut self, error: DecodeError) -> Result<(), CloseReason> {
        self.decode_failures += 1;
        telemetry::increment(CounterMetric::DecodeFailures, 1);
        tracing::warn!(
            session_id = %self.id,
            error = %error,
            consecutive = self.decode_failures,
            "Dropping undecodable frame"
        );

        if self.decode_failures > self.config.max_consecutive_decode_failures {
            return Err(CloseReason::ProtocolViolation(format!(
                "{} consecutive undecodable frames",
                self.decode_failures
            )));
        }
        Ok(())
    }

    async fn transition(&mut self, next: SessionState, events: &mpsc::Sender<FeedEvent>) {
        if !self.state.can_transition_to(next) {
            tracing::error!(
                session_id = %self.id,
                from = %self.state,
                to = %next,
                "Rejected illegal session transition"
            );
            return;
        }

        tracing::debug!(session_id = %self.id, from = %self.state, to = %next, "Session state");
        self.state = next;
        if next == SessionState::Streaming {
            self.reached_streaming = true;
        }
        telemetry::set_gauge(GaugeMetric::SessionState, f64::from(next.ordinal()));
        let _ = events.send(FeedEvent::State(next)).await;
    }
}

fn frame_or_close(next: Option<Result<Frame, TransportError>>) -> Result<Frame, CloseReason> {
    match next {
        Some(Ok(frame)) => Ok(frame),
        Some(Err(e)) => Err(e.into()),
        None => Err(CloseReason::PeerClosed(None)),
    }
}

/// A consumer that went away counts as a stop
async fn emit(events: &mpsc::Sender<FeedEvent>, event: FeedEvent) -> Result<(), CloseReason> {
    events.send(event).await.map_err(|_| CloseReason::Stopped)
}
