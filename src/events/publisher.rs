use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::constants::system::EVENT_CHANNEL_CAPACITY;

/// Broadcast publisher for deployment lifecycle events
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<DeploymentEvent>,
}

/// Event that has been published
#[derive(Debug, Clone)]
pub struct DeploymentEvent {
    /// One of the names in [`crate::constants::events`]
    pub name: String,
    pub deployment_id: Uuid,
    pub payload: Value,
    pub published_at: chrono::DateTime<chrono::Utc>,
}

impl EventPublisher {
    /// Create a new event publisher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event with the given name and payload
    pub async fn publish(
        &self,
        event_name: impl Into<String>,
        deployment_id: Uuid,
        payload: Value,
    ) -> Result<(), PublishError> {
        let event = DeploymentEvent {
            name: event_name.into(),
            deployment_id,
            payload,
            published_at: chrono::Utc::now(),
        };

        // broadcast::send errors only when there are no subscribers, which
        // is fine: publishing and listening are independent concerns.
        match self.sender.send(event) {
            Ok(_) => Ok(()),
            Err(broadcast::error::SendError(_)) => Ok(()),
        }
    }

    /// Publish a serializable payload under the given name
    pub async fn publish_serialized<T: Serialize>(
        &self,
        event_name: impl Into<String>,
        deployment_id: Uuid,
        payload: &T,
    ) -> Result<(), PublishError> {
        let value = serde_json::to_value(payload)?;
        self.publish(event_name, deployment_id, value).await
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<DeploymentEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Error types for event publishing
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(EVENT_CHANNEL_CAPACITY)
    }
}
