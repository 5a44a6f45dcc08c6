//! Outbound notification seam
//!
//! Delivery is someone else's concern; the engine hands rendered text and a
//! destination to whatever [`Notifier`] it was given.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

/// Notification delivery errors
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// Request could not be sent
    #[error("notifier request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Remote side answered with a non-success status
    #[error("notifier rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Delivers rendered alert text to a destination (chat id, channel, ...)
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str, destination: &str) -> Result<(), NotifyError>;
}

/// Writes alerts to the log only
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, text: &str, destination: &str) -> Result<(), NotifyError> {
        tracing::info!(destination, text, "Alert");
        Ok(())
    }
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// POSTs `{chat_id, text}` JSON to a chat-bot style send-message URL
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, text: &str, destination: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .json(&WebhookPayload {
                chat_id: destination,
                text,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        tracing::debug!(destination, "Alert delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_notifier_always_succeeds() {
        let notifier = LogNotifier;
        assert!(notifier.send("hello", "chat").await.is_ok());
    }

    #[test]
    fn test_webhook_payload_shape() {
        let payload = WebhookPayload {
            chat_id: "-100123",
            text: "NIFTY up 0.6%",
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["chat_id"], "-100123");
        assert_eq!(json["text"], "NIFTY up 0.6%");
    }

    #[tokio::test]
    async fn test_webhook_unreachable_is_error() {
        let notifier = WebhookNotifier::new("http://127.0.0.1:1/send").unwrap();
        let result = notifier.send("text", "chat").await;
        assert!(matches!(result, Err(NotifyError::Request(_))));
    }

    #[test]
    fn test_rejected_display() {
        let err = NotifyError::Rejected {
            status: 400,
            body: "chat not found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "notifier rejected message with status 400: chat not found"
        );
    }
}
