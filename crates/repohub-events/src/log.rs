//! Tracing-backed publisher
//!
//! Default events driver: emits each event as a structured log line and
//! succeeds, so a development instance runs without a broker.

use async_trait::async_trait;
use repohub_types::PublishError;
use tracing::info;

use crate::EventPublisher;

pub struct LogPublisher;

impl LogPublisher {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for LogPublisher {
    async fn publish(
        &self,
        topic: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), PublishError> {
        info!(topic = %topic, key = %key, payload = %value, "Event published");
        Ok(())
    }

    async fn ping(&self) -> Result<(), PublishError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_publisher_always_succeeds() {
        let publisher = LogPublisher::new();
        publisher
            .publish("user-events", "user.created", &serde_json::json!({"id": "x"}))
            .await
            .unwrap();
        publisher.ping().await.unwrap();
    }
}
