//! # RepoHub Events
//!
//! Topic-addressed publish sink the orchestration layer hands domain events
//! to, plus the Kafka bindings (behind the `kafka` feature) and the Telegram
//! notifier used by the background consumer.

use async_trait::async_trait;
use repohub_types::PublishError;

#[cfg(feature = "kafka")]
pub mod kafka;
pub mod log;
pub mod memory;
pub mod telegram;

#[cfg(feature = "kafka")]
pub use kafka::{EventConsumer, KafkaPublisher};
pub use log::LogPublisher;
pub use memory::MemoryPublisher;
pub use telegram::TelegramNotifier;

/// Event emission contract.
///
/// Called once per successful mutation, synchronously, after cache
/// invalidation. The orchestration layer never retries a publish; delivery
/// retries, if any, belong to the bus itself.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish one message. `key` carries the event-type string; `value` is
    /// the JSON-serializable event payload.
    async fn publish(
        &self,
        topic: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), PublishError>;

    /// Connectivity probe used by the readiness endpoint
    async fn ping(&self) -> Result<(), PublishError>;
}
