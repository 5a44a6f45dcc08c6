//! Configuration types for tick-alert
//!
//! Loaded from TOML, then overridden from `TICK_ALERT_*` environment
//! variables so secrets can stay out of the file.

use crate::alert::{
    AlertFormatter, DispatcherConfig, LogNotifier, Notifier, NotifyError, WebhookNotifier,
};
use crate::credential::{CredentialError, CredentialProvider, FileCredential, StaticCredential};
use crate::price::{MarkerClassifier, ThresholdConfig, ThresholdEvaluator};
use crate::session::{ReconnectPolicy, SessionConfig};
use crate::telemetry::LogFormat;
use crate::ws::WsConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const REDACTED: &str = "<redacted>";

/// Configuration errors; all of them are fatal at startup
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("missing required setting {0}")]
    Missing(&'static str),
    #[error("feed endpoint must be a ws:// or wss:// URL, got {0:?}")]
    InvalidEndpoint(String),
    #[error("no credential source: set credential.access_token or credential.token_file")]
    MissingCredential,
    #[error("threshold {name} must be positive, got {value}")]
    InvalidThreshold { name: &'static str, value: Decimal },
    #[error("invalid setting {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
    #[error(transparent)]
    Credential(#[from] CredentialError),
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub credential: CredentialConfig,
    #[serde(default)]
    pub thresholds: ThresholdsConfig,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Feed connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Streaming endpoint (ws:// or wss://)
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    /// Instrument keys subscribed in full mode
    #[serde(default)]
    pub instruments: Vec<String>,
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,
    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout_secs: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Undecodable frames in a row tolerated before the session is closed
    #[serde(default = "default_max_decode_failures")]
    pub max_consecutive_decode_failures: u32,
    /// `source` field sent in the handshake
    #[serde(default = "default_source")]
    pub source: String,
}

fn default_heartbeat_interval() -> u64 {
    30
}
fn default_handshake_timeout() -> u64 {
    10
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_max_decode_failures() -> u32 {
    10
}
fn default_source() -> String {
    "tick-alert".to_string()
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            instruments: Vec::new(),
            heartbeat_interval_secs: default_heartbeat_interval(),
            handshake_timeout_secs: default_handshake_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            max_consecutive_decode_failures: default_max_decode_failures(),
            source: default_source(),
        }
    }
}

/// Where the bearer token comes from; the token file wins when both are set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// File kept fresh by an external auth process
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_file: Option<PathBuf>,
}

/// Alert thresholds and instrument classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdsConfig {
    /// Percent move that alerts an index-class instrument
    #[serde(default = "default_index_pct")]
    pub index_pct: Decimal,
    /// Percent move that alerts an equity-class instrument
    #[serde(default = "default_equity_pct")]
    pub equity_pct: Decimal,
    /// Key substrings marking an index (case-insensitive)
    #[serde(default = "default_index_markers")]
    pub index_markers: Vec<String>,
    /// Keys that are always indices
    #[serde(default)]
    pub index_instruments: Vec<String>,
}

fn default_index_pct() -> Decimal {
    Decimal::new(5, 1) // 0.5%
}
fn default_equity_pct() -> Decimal {
    Decimal::new(10, 1) // 1.0%
}
fn default_index_markers() -> Vec<String> {
    vec!["INDEX".to_string()]
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            index_pct: default_index_pct(),
            equity_pct: default_equity_pct(),
            index_markers: default_index_markers(),
            index_instruments: Vec::new(),
        }
    }
}

/// Reconnect timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
    /// Fast retries before the outer restart
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_restart_delay")]
    pub restart_delay_secs: u64,
}

fn default_base_delay() -> u64 {
    1_000
}
fn default_max_delay() -> u64 {
    30_000
}
fn default_max_attempts() -> u32 {
    5
}
fn default_restart_delay() -> u64 {
    5
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
            max_attempts: default_max_attempts(),
            restart_delay_secs: default_restart_delay(),
        }
    }
}

impl ReconnectConfig {
    pub fn policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            base: Duration::from_millis(self.base_delay_ms),
            cap: Duration::from_millis(self.max_delay_ms),
            max_attempts: self.max_attempts,
            restart_delay: Duration::from_secs(self.restart_delay_secs),
        }
    }
}

/// Alert delivery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsConfig {
    /// Send-message URL; alerts are only logged when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    /// Chat or channel id passed to the notifier
    #[serde(default)]
    pub destination: String,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_dedup_capacity")]
    pub dedup_capacity: usize,
    #[serde(default = "default_dedup_threshold")]
    pub dedup_threshold: f64,
    /// Offset of the wall-clock time shown in alerts
    #[serde(default = "default_utc_offset")]
    pub utc_offset_minutes: i32,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_queue_capacity() -> usize {
    256
}
fn default_dedup_capacity() -> usize {
    crate::alert::DEFAULT_WINDOW_CAPACITY
}
fn default_dedup_threshold() -> f64 {
    crate::alert::DEFAULT_SIMILARITY_THRESHOLD
}
fn default_utc_offset() -> i32 {
    330 // IST
}
fn default_currency() -> String {
    "₹".to_string()
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            destination: String::new(),
            queue_capacity: default_queue_capacity(),
            dedup_capacity: default_dedup_capacity(),
            dedup_threshold: default_dedup_threshold(),
            utc_offset_minutes: default_utc_offset(),
            currency: default_currency(),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Prometheus exporter port; disabled when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics_port: Option<u16>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            metrics_port: None,
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `TICK_ALERT_*` overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from any variable lookup; empty values are ignored
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("TICK_ALERT_ENDPOINT") {
            self.feed.endpoint = v;
        }
        if let Some(v) = get("TICK_ALERT_API_KEY") {
            self.feed.api_key = v;
        }
        if let Some(v) = get("TICK_ALERT_ACCESS_TOKEN") {
            self.credential.access_token = Some(v);
        }
        if let Some(v) = get("TICK_ALERT_TOKEN_FILE") {
            self.credential.token_file = Some(PathBuf::from(v));
        }
        if let Some(v) = get("TICK_ALERT_INSTRUMENTS") {
            self.feed.instruments = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(v) = get("TICK_ALERT_WEBHOOK_URL") {
            self.alerts.webhook_url = Some(v);
        }
        if let Some(v) = get("TICK_ALERT_DESTINATION") {
            self.alerts.destination = v;
        }
    }

    /// Refuse half-configured setups
    pub fn validate(&self) -> Result<(), ConfigError> {
        let endpoint = self.feed.endpoint.trim();
        if endpoint.is_empty() {
            return Err(ConfigError::Missing("feed.endpoint"));
        }
        if !(endpoint.starts_with("ws://") || endpoint.starts_with("wss://")) {
            return Err(ConfigError::InvalidEndpoint(endpoint.to_string()));
        }
        if self.feed.api_key.trim().is_empty() {
            return Err(ConfigError::Missing("feed.api_key"));
        }
        let has_token = self
            .credential
            .access_token
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty());
        if !has_token && self.credential.token_file.is_none() {
            return Err(ConfigError::MissingCredential);
        }
        if self.feed.instruments.is_empty() {
            return Err(ConfigError::Missing("feed.instruments"));
        }
        for (name, value) in [
            ("feed.heartbeat_interval_secs", self.feed.heartbeat_interval_secs),
            ("feed.handshake_timeout_secs", self.feed.handshake_timeout_secs),
            ("feed.connect_timeout_secs", self.feed.connect_timeout_secs),
        ] {
            if value == 0 {
                return Err(invalid(name, "must be positive"));
            }
        }
        if self.feed.max_consecutive_decode_failures == 0 {
            return Err(invalid(
                "feed.max_consecutive_decode_failures",
                "must be at least 1",
            ));
        }

        for (name, value) in [
            ("thresholds.index_pct", self.thresholds.index_pct),
            ("thresholds.equity_pct", self.thresholds.equity_pct),
        ] {
            if value <= Decimal::ZERO {
                return Err(ConfigError::InvalidThreshold { name, value });
            }
        }

        if self.reconnect.base_delay_ms == 0 {
            return Err(invalid("reconnect.base_delay_ms", "must be positive"));
        }
        if self.reconnect.max_delay_ms < self.reconnect.base_delay_ms {
            return Err(invalid(
                "reconnect.max_delay_ms",
                format!("must be at least base_delay_ms ({})", self.reconnect.base_delay_ms),
            ));
        }

        if self.alerts.queue_capacity == 0 {
            return Err(invalid("alerts.queue_capacity", "must be positive"));
        }
        if self.alerts.dedup_capacity == 0 {
            return Err(invalid("alerts.dedup_capacity", "must be positive"));
        }
        if !(0.0..=1.0).contains(&self.alerts.dedup_threshold) {
            return Err(invalid(
                "alerts.dedup_threshold",
                format!("must be within [0, 1], got {}", self.alerts.dedup_threshold),
            ));
        }
        if self.alerts.utc_offset_minutes.abs() >= 24 * 60 {
            return Err(invalid("alerts.utc_offset_minutes", "must be within one day"));
        }

        Ok(())
    }

    /// Credential source; the token file wins over an inline token
    pub fn credential_provider(&self) -> Result<Arc<dyn CredentialProvider>, ConfigError> {
        if let Some(path) = &self.credential.token_file {
            return Ok(Arc::new(FileCredential::new(path.clone())));
        }
        match &self.credential.access_token {
            Some(token) => Ok(Arc::new(StaticCredential::new(token.clone()))),
            None => Err(ConfigError::MissingCredential),
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        let mut session = SessionConfig::new(
            self.feed.endpoint.trim(),
            self.feed.api_key.trim(),
            self.feed.instruments.clone(),
        );
        session.heartbeat_interval = Duration::from_secs(self.feed.heartbeat_interval_secs);
        session.handshake_timeout = Duration::from_secs(self.feed.handshake_timeout_secs);
        session.max_consecutive_decode_failures = self.feed.max_consecutive_decode_failures;
        session.source = self.feed.source.clone();
        session
    }

    /// Transport keepalive follows the heartbeat interval
    pub fn ws_config(&self) -> WsConfig {
        WsConfig::default()
            .ping_interval(Duration::from_secs(self.feed.heartbeat_interval_secs))
            .connect_timeout(Duration::from_secs(self.feed.connect_timeout_secs))
    }

    pub fn evaluator(&self) -> ThresholdEvaluator {
        ThresholdEvaluator::new(
            ThresholdConfig {
                index_pct: self.thresholds.index_pct,
                equity_pct: self.thresholds.equity_pct,
            },
            MarkerClassifier::new(
                &self.thresholds.index_markers,
                &self.thresholds.index_instruments,
            ),
        )
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            destination: self.alerts.destination.clone(),
            queue_capacity: self.alerts.queue_capacity,
            dedup_capacity: self.alerts.dedup_capacity,
            dedup_threshold: self.alerts.dedup_threshold,
            formatter: AlertFormatter::new(
                self.alerts.utc_offset_minutes,
                self.alerts.currency.clone(),
            ),
        }
    }

    /// Webhook notifier when a URL is configured, log-only otherwise
    pub fn notifier(&self) -> Result<Arc<dyn Notifier>, NotifyError> {
        match &self.alerts.webhook_url {
            Some(url) => Ok(Arc::new(WebhookNotifier::new(url.clone())?)),
            None => Ok(Arc::new(LogNotifier)),
        }
    }

    /// Copy with secrets replaced, for display
    pub fn redacted(&self) -> Config {
        let mut config = self.clone();
        if !config.feed.api_key.is_empty() {
            config.feed.api_key = REDACTED.to_string();
        }
        if config.credential.access_token.is_some() {
            config.credential.access_token = Some(REDACTED.to_string());
        }
        if config.alerts.webhook_url.is_some() {
            // Bot tokens are usually embedded in the URL path
            config.alerts.webhook_url = Some(REDACTED.to_string());
        }
        config
    }
}

fn invalid(name: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        name,
        reason: reason.into(),
    }
}
