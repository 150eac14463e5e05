//! AMQP notification backend.
//!
//! Publishes `Notification` JSON to a durable-less work queue
//! (`sms_messages` by default) that the SMS notifier consumes.

use async_trait::async_trait;
use lapin::{
    options::{BasicPublishOptions, QueueDeclareOptions},
    types::FieldTable,
    BasicProperties, Channel, Connection, ConnectionProperties,
};
use tracing::{debug, info};

use crate::{Notification, NotificationDispatcher, NotifyError, Result};

impl From<lapin::Error> for NotifyError {
    fn from(err: lapin::Error) -> Self {
        NotifyError::Transport(err.to_string())
    }
}

pub struct AmqpDispatcher {
    // Dropping the connection closes the channel.
    _connection: Connection,
    channel: Channel,
    queue: String,
}

impl AmqpDispatcher {
    /// Connect, open a channel, and declare `queue`.
    pub async fn connect(url: &str, queue: impl Into<String>) -> Result<Self> {
        let queue = queue.into();
        let connection = Connection::connect(url, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;
        channel
            .queue_declare(&queue, QueueDeclareOptions::default(), FieldTable::default())
            .await?;

        info!(queue = %queue, "AMQP notification dispatcher ready");
        Ok(Self {
            _connection: connection,
            channel,
            queue,
        })
    }
}

#[async_trait]
impl NotificationDispatcher for AmqpDispatcher {
    async fn send(&self, recipient: &str, text: &str) -> Result<()> {
        let payload = serde_json::to_vec(&Notification::new(recipient, text))?;

        self.channel
            .basic_publish(
                "",
                &self.queue,
                BasicPublishOptions::default(),
                &payload,
                BasicProperties::default().with_content_type("application/json".into()),
            )
            .await?
            .await?;

        debug!(queue = %self.queue, "Published notification");
        Ok(())
    }

    fn name(&self) -> &str {
        "amqp"
    }
}
