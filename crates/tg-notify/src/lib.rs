//! Tollgate Notifications
//!
//! Delivery of confirmation messages to phone numbers. The authentication
//! service only sees the `NotificationDispatcher` trait; backends:
//! - AMQP queue consumed by the SMS notifier (feature `amqp`)
//! - Log-only dispatcher for local development

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[cfg(feature = "amqp")]
pub mod amqp;

#[cfg(feature = "amqp")]
pub use amqp::AmqpDispatcher;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Notification transport error: {0}")]
    Transport(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, NotifyError>;

/// Queue payload understood by the SMS notifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub to: String,
    pub message: String,
}

impl Notification {
    pub fn new(to: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Deliver `text` to `recipient` (a phone number).
    async fn send(&self, recipient: &str, text: &str) -> Result<()>;

    /// Backend name, for logs.
    fn name(&self) -> &str;
}

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Default, Clone)]
pub struct LogDispatcher;

impl LogDispatcher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn send(&self, recipient: &str, text: &str) -> Result<()> {
        info!(recipient = %recipient, message = %text, "Notification (log dispatcher)");
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_wire_format() {
        let json = serde_json::to_string(&Notification::new("+1555", "hello")).unwrap();
        assert_eq!(json, r#"{"to":"+1555","message":"hello"}"#);
    }

    #[tokio::test]
    async fn test_log_dispatcher_accepts_everything() {
        let dispatcher = LogDispatcher::new();
        assert!(dispatcher.send("+1555", "hello").await.is_ok());
        assert_eq!(dispatcher.name(), "log");
    }
}
