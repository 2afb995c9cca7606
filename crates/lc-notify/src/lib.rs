//! lc-notify
//!
//! Alert delivery for failed validations. A notification is a topic, a
//! subject line and one plain-text body; no further formatting is done here.
//!
//! Delivery is fire-and-forget from the engine's point of view: the engine
//! logs a [`NotifyError`] and carries on with its verdict.

use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// Network or transport failure.
    Transport(String),
    /// The receiving end answered with a non-success status.
    Rejected { status: u16, message: String },
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyError::Transport(msg) => write!(f, "notify transport error: {msg}"),
            NotifyError::Rejected { status, message } => {
                write!(f, "notify rejected status={status}: {message}")
            }
        }
    }
}

impl std::error::Error for NotifyError {}

// ---------------------------------------------------------------------------
// Notifier trait
// ---------------------------------------------------------------------------

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Human-readable channel name (e.g. `"webhook"`).
    fn channel_name(&self) -> &'static str;

    async fn publish(&self, topic: &str, subject: &str, body: &str) -> Result<(), NotifyError>;
}

// ---------------------------------------------------------------------------
// Webhook
// ---------------------------------------------------------------------------

/// Posts `{"topic", "subject", "message"}` as JSON to a webhook URL.
///
/// The URL usually embeds its own credential, so it is redacted in `Debug`
/// and never logged.
#[derive(Clone)]
pub struct WebhookNotifier {
    http: reqwest::Client,
    url: String,
}

impl fmt::Debug for WebhookNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookNotifier")
            .field("url", &"<REDACTED>")
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    topic: &'a str,
    subject: &'a str,
    message: &'a str,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait::async_trait]
impl Notifier for WebhookNotifier {
    fn channel_name(&self) -> &'static str {
        "webhook"
    }

    async fn publish(&self, topic: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        let payload = WebhookPayload {
            topic,
            subject,
            message: body,
        };
        let resp = self
            .http
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.without_url().to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        info!(topic, subject, "alert published");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Log-only
// ---------------------------------------------------------------------------

/// Writes the alert to the log instead of delivering it. Used when no
/// webhook is configured.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    fn channel_name(&self) -> &'static str {
        "log"
    }

    async fn publish(&self, topic: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        warn!(topic, subject, body, "alert (log-only channel)");
        Ok(())
    }
}
