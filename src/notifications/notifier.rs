use async_trait::async_trait;
use std::sync::Mutex;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}

/// Outbound channel to the order owner (email, push, ...)
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str, recipient: &str) -> Result<(), NotifyError>;
}

/// Writes notifications to the log instead of delivering them
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &str, recipient: &str) -> Result<(), NotifyError> {
        info!(recipient = %recipient, "Notification: {}", message);
        Ok(())
    }
}

/// Keeps every message it is asked to send
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose every delivery fails
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// `(recipient, message)` pairs in send order
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &str, recipient: &str) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::Delivery("mail relay unavailable".to_string()));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((recipient.to_string(), message.to_string()));
        }
        Ok(())
    }
}
