//! End-to-end integration tests
//!
//! Supervisor, session, pipeline and dispatcher wired together over the
//! in-process transport.

use async_trait::async_trait;
use rust_decimal_macros::dec;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tick_alert::alert::{AlertDispatcher, DispatcherConfig, Notifier, NotifyError};
use tick_alert::credential::StaticCredential;
use tick_alert::pipeline::{AlertPipeline, PipelineStats};
use tick_alert::price::{MarkerClassifier, ThresholdConfig, ThresholdEvaluator};
use tick_alert::session::{
    FeedEvent, FeedSession, ReconnectPolicy, ReconnectSupervisor, SessionConfig,
};
use tick_alert::ws::memory::{MemoryConnector, MemoryPeer};
use tick_alert::ws::TransportError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<String>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str, _destination: &str) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

struct Harness {
    stop: CancellationToken,
    supervisor: JoinHandle<()>,
    pipeline: JoinHandle<PipelineStats>,
    dispatcher: JoinHandle<()>,
    notifier: Arc<RecordingNotifier>,
}

impl Harness {
    fn start(connector: Arc<MemoryConnector>) -> Self {
        let notifier = Arc::new(RecordingNotifier::default());
        let (dispatcher, dispatcher_handle) =
            AlertDispatcher::spawn(notifier.clone(), DispatcherConfig::default());
        let evaluator = ThresholdEvaluator::new(
            ThresholdConfig {
                index_pct: dec!(0.5),
                equity_pct: dec!(1.0),
            },
            MarkerClassifier::new(["INDEX"], Vec::<String>::new()),
        );
        let pipeline = AlertPipeline::new(evaluator, dispatcher);

        let credential = Arc::new(StaticCredential::new("token"));
        let factory = move || {
            FeedSession::new(
                SessionConfig::new("ws://feed.test", "key", vec!["X".to_string()]),
                connector.clone(),
                credential.clone(),
            )
        };
        let policy = ReconnectPolicy {
            base: Duration::from_millis(5),
            cap: Duration::from_millis(20),
            max_attempts: 3,
            restart_delay: Duration::from_millis(10),
        };

        let stop = CancellationToken::new();
        let (tx, rx) = mpsc::channel::<FeedEvent>(256);
        let supervisor = tokio::spawn({
            let stop = stop.clone();
            async move { ReconnectSupervisor::new(policy).run(factory, tx, stop).await }
        });
        // The pipeline ends when the supervisor drops the sender
        let pipeline = tokio::spawn(pipeline.run(rx, CancellationToken::new()));

        Self {
            stop,
            supervisor,
            pipeline,
            dispatcher: dispatcher_handle,
            notifier,
        }
    }

    async fn shutdown(self) -> (PipelineStats, Vec<String>) {
        self.stop.cancel();
        self.supervisor.await.unwrap();
        let stats = self.pipeline.await.unwrap();
        self.dispatcher.await.unwrap();
        let sent = self.notifier.sent.lock().unwrap().clone();
        (stats, sent)
    }
}

/// Acknowledge handshake and consume the subscription
async fn accept_session(peer: &mut MemoryPeer) {
    peer.recv().await.expect("handshake");
    peer.send_text(r#"{"method":"handshake","data":{"status":"OK"}}"#);
    peer.recv().await.expect("subscription");
}

/// Wait until `count` alerts were delivered
async fn wait_for_alerts(notifier: &RecordingNotifier, count: usize) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while notifier.sent.lock().unwrap().len() < count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("alerts delivered");
}

#[tokio::test]
async fn test_tick_sequence_produces_single_alert() {
    let connector = Arc::new(MemoryConnector::new());
    let mut peer = connector.accept();
    let harness = Harness::start(connector.clone());

    accept_session(&mut peer).await;
    for price in ["100", "100.2", "102"] {
        peer.send_text(format!(r#"{{"symbol":"X","ltp":{price}}}"#));
    }
    wait_for_alerts(&harness.notifier, 1).await;

    // Extra settle time: no second alert may follow
    tokio::time::sleep(Duration::from_millis(50)).await;
    let (stats, sent) = harness.shutdown().await;

    assert_eq!(stats.ticks, 3);
    assert_eq!(stats.alerts, 1);
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("X"));
    assert!(sent[0].contains("+2.00%"));
}

#[tokio::test]
async fn test_price_state_survives_reconnect() {
    let connector = Arc::new(MemoryConnector::new());
    let mut first = connector.accept();
    connector.refuse(TransportError::ConnectionFailed("blip".to_string()));
    let mut second = connector.accept();
    let harness = Harness::start(connector.clone());

    accept_session(&mut first).await;
    first.send_text(r#"{"symbol":"X","ltp":100}"#);
    first.fail(TransportError::ReceiveFailed("reset by peer".to_string()));
    drop(first);

    // Baseline from the first connection carries over
    accept_session(&mut second).await;
    second.send_text(r#"{"symbol":"X","ltp":98.5}"#);
    wait_for_alerts(&harness.notifier, 1).await;

    let (stats, sent) = harness.shutdown().await;
    assert_eq!(connector.attempts(), 3);
    assert_eq!(stats.alerts, 1);
    assert!(sent[0].contains("-1.50%"));
    assert!(stats.sessions_closed >= 2);
}

#[tokio::test]
async fn test_binary_and_json_frames_mix_on_one_connection() {
    use prost::Message;
    use tick_alert::feed::proto::{Feed, FeedResponse};

    let connector = Arc::new(MemoryConnector::new());
    let mut peer = connector.accept();
    let harness = Harness::start(connector.clone());

    accept_session(&mut peer).await;
    peer.send_text(r#"{"feeds":{"NSE_INDEX|Nifty 50":{"ltp":22000}}}"#);
    let frame = FeedResponse {
        r#type: "live_feed".to_string(),
        feeds: vec![Feed {
            symbol: "NSE_INDEX|Nifty 50".to_string(),
            ltp: 22150.0,
            ..Default::default()
        }],
    };
    peer.send_binary(frame.encode_to_vec());
    wait_for_alerts(&harness.notifier, 1).await;

    let (stats, sent) = harness.shutdown().await;
    assert_eq!(stats.ticks, 2);
    assert!(sent[0].contains("NSE_INDEX|Nifty 50"));
    assert!(sent[0].starts_with("🟢"));
}
