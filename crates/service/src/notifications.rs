//! Notification port and the log-backed implementation.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors from the notification transport.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("email delivery failed: {reason}")]
    Delivery { reason: String },
}

/// Outbound email port.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_email(&self, to: &str, body: &str) -> Result<(), NotificationError>;
}

/// An email accepted by [`LogEmailSender`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub to: String,
    pub body: String,
}

/// Email sender that logs instead of delivering.
///
/// Records every accepted email so tests and operators can inspect what
/// would have been sent.
#[derive(Default)]
pub struct LogEmailSender {
    sent: RwLock<Vec<SentEmail>>,
}

impl LogEmailSender {
    /// Creates a new sender with an empty outbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every email accepted so far.
    pub async fn sent(&self) -> Vec<SentEmail> {
        self.sent.read().await.clone()
    }
}

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send_email(&self, to: &str, body: &str) -> Result<(), NotificationError> {
        tracing::info!(to, body, "sending email");
        metrics::counter!("emails_sent_total").increment(1);

        self.sent.write().await.push(SentEmail {
            to: to.to_string(),
            body: body.to_string(),
        });

        Ok(())
    }
}
