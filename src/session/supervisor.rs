//! Session lifecycle across failures

use super::backoff::ReconnectPolicy;
use super::feed_session::FeedSession;
use super::types::{CloseReason, FeedEvent};
use crate::telemetry::{self, CounterMetric};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Keeps a feed session alive until stopped
///
/// Inner layer: up to `max_attempts` fast retries with exponential backoff,
/// reset whenever a session reaches streaming. Outer layer: once the fast
/// retries are spent, wait `restart_delay` and start over, forever.
#[derive(Debug, Clone, Default)]
pub struct ReconnectSupervisor {
    policy: ReconnectPolicy,
}

impl ReconnectSupervisor {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    /// Run sessions from `factory` until `stop` fires or `events` is dropped
    pub async fn run<F>(&self, mut factory: F, events: mpsc::Sender<FeedEvent>, stop: CancellationToken)
    where
        F: FnMut() -> FeedSession,
    {
        let mut attempt: u32 = 0;

        loop {
            if stop.is_cancelled() || events.is_closed() {
                break;
            }

            let mut session = factory();
            let outcome = session.run(&events, &stop).await;
            if outcome.reason == CloseReason::Stopped || stop.is_cancelled() {
                break;
            }

            if outcome.reached_streaming {
                attempt = 0;
            }
            attempt += 1;

            let (event, delay) = if attempt > self.policy.max_attempts {
                attempt = 0;
                let delay = self.policy.restart_delay;
                telemetry::increment(CounterMetric::SupervisorRestarts, 1);
                tracing::error!(
                    reason = %outcome.reason,
                    delay_ms = delay.as_millis() as u64,
                    "Reconnect attempts exhausted, restarting"
                );
                (FeedEvent::Restarting { delay }, delay)
            } else {
                let delay = self.policy.delay(attempt);
                telemetry::increment(CounterMetric::ReconnectAttempts, 1);
                tracing::warn!(
                    attempt,
                    reason = %outcome.reason,
                    delay_ms = delay.as_millis() as u64,
                    "Feed session closed, reconnecting..."
                );
                (FeedEvent::Reconnecting { attempt, delay }, delay)
            };

            if events.send(event).await.is_err() {
                tracing::info!("Event receiver dropped, stopping reconnection");
                break;
            }

            tokio::select! {
                _ = stop.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        tracing::info!("Reconnect supervisor stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::StaticCredential;
    use crate::session::{SessionConfig, SessionState};
    use crate::ws::memory::MemoryConnector;
    use crate::ws::TransportError;
    use std::sync::Arc;
    use std::time::Duration;

    fn factory(connector: &Arc<MemoryConnector>) -> impl FnMut() -> FeedSession + Send + 'static {
        let connector = connector.clone();
        let credential = Arc::new(StaticCredential::new("token"));
        move || {
            FeedSession::new(
                SessionConfig::new("ws://feed.test", "key", vec!["NSE_EQ|INFY".to_string()]),
                connector.clone(),
                credential.clone(),
            )
        }
    }

    fn policy() -> ReconnectPolicy {
        ReconnectPolicy {
            base: Duration::from_millis(10),
            cap: Duration::from_millis(100),
            max_attempts: 5,
            restart_delay: Duration::from_millis(20),
        }
    }

    #[tokio::test]
    async fn test_three_failures_then_streaming() {
        let connector = Arc::new(MemoryConnector::new());
        for _ in 0..3 {
            connector.refuse(TransportError::ConnectionFailed("refused".to_string()));
        }
        let mut peer = connector.accept();
        tokio::spawn(async move {
            peer.recv().await;
            peer.send_text(r#"{"method":"handshake"}"#);
            peer.recv().await;
            peer.send_text(r#"{"symbol":"NSE_EQ|INFY","ltp":1500}"#);
            // Keep the connection open
            while peer.recv().await.is_some() {}
        });

        let (tx, mut rx) = mpsc::channel(256);
        let stop = CancellationToken::new();
        let supervisor = ReconnectSupervisor::new(policy());
        let run = tokio::spawn({
            let stop = stop.clone();
            let factory = factory(&connector);
            async move { supervisor.run(factory, tx, stop).await }
        });

        let mut delays = Vec::new();
        loop {
            match rx.recv().await.unwrap() {
                FeedEvent::Reconnecting { attempt, delay } => {
                    assert_eq!(attempt as usize, delays.len() + 1);
                    delays.push(delay);
                }
                FeedEvent::Restarting { .. } => panic!("outer loop should not restart"),
                FeedEvent::State(SessionState::Streaming) => break,
                _ => {}
            }
        }

        assert_eq!(delays.len(), 3);
        assert!(delays[2] >= delays[0]);
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(10),
                Duration::from_millis(20),
                Duration::from_millis(40)
            ]
        );
        assert_eq!(connector.attempts(), 4);

        stop.cancel();
        run.await.unwrap();
    }

    #[tokio::test]
    async fn test_restarts_after_inner_retries_exhausted() {
        // Exhausted script: every attempt fails
        let connector = Arc::new(MemoryConnector::new());
        let policy = ReconnectPolicy {
            max_attempts: 2,
            ..policy()
        };

        let (tx, mut rx) = mpsc::channel(256);
        let stop = CancellationToken::new();
        let run = tokio::spawn({
            let stop = stop.clone();
            let factory = factory(&connector);
            async move { ReconnectSupervisor::new(policy).run(factory, tx, stop).await }
        });

        let mut lifecycle = Vec::new();
        while lifecycle.len() < 4 {
            match rx.recv().await.unwrap() {
                FeedEvent::Reconnecting { attempt, .. } => lifecycle.push(format!("retry{attempt}")),
                FeedEvent::Restarting { delay } => {
                    assert_eq!(delay, Duration::from_millis(20));
                    lifecycle.push("restart".to_string());
                }
                _ => {}
            }
        }
        assert_eq!(lifecycle, vec!["retry1", "retry2", "restart", "retry1"]);

        stop.cancel();
        run.await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_during_backoff_does_not_reconnect() {
        let connector = Arc::new(MemoryConnector::new());
        let policy = ReconnectPolicy {
            base: Duration::from_secs(60),
            cap: Duration::from_secs(60),
            ..policy()
        };

        let (tx, mut rx) = mpsc::channel(256);
        let stop = CancellationToken::new();
        let run = tokio::spawn({
            let stop = stop.clone();
            let factory = factory(&connector);
            async move { ReconnectSupervisor::new(policy).run(factory, tx, stop).await }
        });

        loop {
            if let FeedEvent::Reconnecting { .. } = rx.recv().await.unwrap() {
                break;
            }
        }
        stop.cancel();

        tokio::time::timeout(Duration::from_secs(1), run)
            .await
            .expect("supervisor should exit promptly")
            .unwrap();
        assert_eq!(connector.attempts(), 1);
    }

    #[tokio::test]
    async fn test_stop_while_streaming_closes_without_retry() {
        let connector = Arc::new(MemoryConnector::new());
        let mut peer = connector.accept();
        tokio::spawn(async move {
            peer.recv().await;
            peer.send_text(r#"{"method":"handshake"}"#);
            while peer.recv().await.is_some() {}
        });

        let (tx, mut rx) = mpsc::channel(256);
        let stop = CancellationToken::new();
        let run = tokio::spawn({
            let stop = stop.clone();
            let factory = factory(&connector);
            async move { ReconnectSupervisor::new(policy()).run(factory, tx, stop).await }
        });

        loop {
            if let FeedEvent::State(SessionState::Subscribed) = rx.recv().await.unwrap() {
                break;
            }
        }
        stop.cancel();
        run.await.unwrap();

        let mut rest = Vec::new();
        while let Some(event) = rx.recv().await {
            rest.push(event);
        }
        assert!(rest.contains(&FeedEvent::Closed(CloseReason::Stopped)));
        assert!(!rest
            .iter()
            .any(|e| matches!(e, FeedEvent::Reconnecting { .. } | FeedEvent::Restarting { .. })));
        assert_eq!(connector.attempts(), 1);
    }

    #[tokio::test]
    async fn test_exits_when_receiver_dropped() {
        let connector = Arc::new(MemoryConnector::new());
        let (tx, rx) = mpsc::channel(256);
        drop(rx);

        tokio::time::timeout(
            Duration::from_secs(1),
            ReconnectSupervisor::new(policy()).run(factory(&connector), tx, CancellationToken::new()),
        )
        .await
        .expect("supervisor should exit");
        assert_eq!(connector.attempts(), 0);
    }
}
