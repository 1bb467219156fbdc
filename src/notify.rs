//! Best-effort notification gateway.
//!
//! Every notification is logged locally; when a chat webhook is
//! configured delivery is attempted, but a delivery failure is never
//! surfaced to the caller — it is swallowed and logged. This asymmetry
//! with the dispatcher is deliberate: losing a notification is
//! tolerable, losing a CI trigger silently is not. The `Notifier` trait
//! encodes that contract by returning `()`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, error, info, warn};

const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Severity level attached to a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fire-and-forget notification channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver best-effort. Failures are handled inside the
    /// implementation; callers cannot observe them.
    async fn notify(&self, title: &str, message: &str, severity: Severity);
}

/// The chat-webhook payload for a notification.
fn chat_payload(title: &str, message: &str) -> serde_json::Value {
    serde_json::json!({ "text": format!("*{}*\n{}", title, message) })
}

/// Gateway that logs locally and optionally posts to a chat webhook.
pub struct NotificationGateway {
    client: reqwest::Client,
    chat_webhook_url: Option<String>,
    notification_email: Option<String>,
}

impl NotificationGateway {
    pub fn new(chat_webhook_url: Option<String>, notification_email: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            chat_webhook_url,
            notification_email,
        }
    }
}

#[async_trait]
impl Notifier for NotificationGateway {
    async fn notify(&self, title: &str, message: &str, severity: Severity) {
        match severity {
            Severity::Info | Severity::Success => {
                info!(severity = %severity, title, message, "notification")
            }
            Severity::Warning => warn!(severity = %severity, title, message, "notification"),
            Severity::Error => error!(severity = %severity, title, message, "notification"),
        }

        if let Some(url) = &self.chat_webhook_url {
            let result = self
                .client
                .post(url)
                .timeout(NOTIFY_TIMEOUT)
                .json(&chat_payload(title, message))
                .send()
                .await;
            match result {
                Ok(resp) if resp.status().is_success() => {
                    debug!(title, "chat notification delivered")
                }
                Ok(resp) => {
                    warn!(status = %resp.status(), title, "chat notification rejected")
                }
                Err(err) => warn!(error = %err, title, "chat notification failed"),
            }
        }

        if let Some(email) = &self.notification_email {
            // No mail channel is wired; record the intended recipient.
            debug!(email, title, "email notification recorded without delivery channel");
        }
    }
}
