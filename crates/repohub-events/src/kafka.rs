//! Kafka bindings: producer-backed publisher and the background consumer

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::message::Message;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::types::RDKafkaErrorCode;
use repohub_types::PublishError;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::telegram::TelegramNotifier;
use crate::EventPublisher;

const SEND_TIMEOUT: Duration = Duration::from_secs(5);

fn map_kafka(err: KafkaError) -> PublishError {
    match err {
        KafkaError::MessageProduction(RDKafkaErrorCode::MessageTimedOut) => PublishError::Timeout,
        other => PublishError::Broker(other.to_string()),
    }
}

/// Kafka publisher over a shared `FutureProducer`
pub struct KafkaPublisher {
    producer: FutureProducer,
}

impl KafkaPublisher {
    pub fn new(brokers: &str) -> Result<Self, PublishError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .set("acks", "all")
            .create()
            .map_err(map_kafka)?;

        Ok(Self { producer })
    }
}

#[async_trait]
impl EventPublisher for KafkaPublisher {
    async fn publish(
        &self,
        topic: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), PublishError> {
        let payload = serde_json::to_string(value)?;

        let record = FutureRecord::to(topic).key(key).payload(&payload);

        self.producer
            .send(record, SEND_TIMEOUT)
            .await
            .map_err(|(e, _)| map_kafka(e))?;

        Ok(())
    }

    async fn ping(&self) -> Result<(), PublishError> {
        use rdkafka::producer::Producer;

        self.producer
            .client()
            .fetch_metadata(None, Duration::from_secs(2))
            .map_err(map_kafka)?;
        Ok(())
    }
}

/// Background consumer that mirrors published events into the log and,
/// when configured, forwards a summary to Telegram.
pub struct EventConsumer {
    brokers: String,
    group_id: String,
    topics: Vec<String>,
    shutdown: CancellationToken,
    notifier: Option<TelegramNotifier>,
}

impl EventConsumer {
    pub fn new(
        brokers: impl Into<String>,
        group_id: impl Into<String>,
        topics: Vec<String>,
        notifier: Option<TelegramNotifier>,
    ) -> Self {
        Self {
            brokers: brokers.into(),
            group_id: group_id.into(),
            topics,
            shutdown: CancellationToken::new(),
            notifier,
        }
    }

    /// Token for signalling the consumer loop to stop
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Runs the consume loop until the shutdown token fires
    pub async fn run(&self) -> Result<(), PublishError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &self.brokers)
            .set("group.id", &self.group_id)
            .set("enable.auto.commit", "true")
            .set("auto.offset.reset", "earliest")
            .create()
            .map_err(map_kafka)?;

        let topics: Vec<&str> = self.topics.iter().map(String::as_str).collect();
        consumer.subscribe(&topics).map_err(map_kafka)?;

        info!(topics = ?self.topics, group = %self.group_id, "Event consumer started");

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                result = consumer.recv() => {
                    match result {
                        Ok(message) => self.handle(&message).await,
                        Err(e) => error!(error = %e, "Consumer receive error"),
                    }
                }
            }
        }

        info!("Event consumer stopped");
        Ok(())
    }

    async fn handle(&self, message: &rdkafka::message::BorrowedMessage<'_>) {
        let Some(payload) = message.payload() else { return };
        let key = message.key().map(String::from_utf8_lossy).unwrap_or_default();

        match serde_json::from_slice::<serde_json::Value>(payload) {
            Ok(data) => {
                info!(
                    topic = %message.topic(),
                    key = %key,
                    payload = %data,
                    "Event consumed"
                );
                if let Some(notifier) = &self.notifier {
                    let summary = format!("[{}] {}: {}", message.topic(), key, data);
                    notifier.send(&summary).await;
                }
            }
            Err(e) => warn!(error = %e, topic = %message.topic(), "Undecodable event payload"),
        }
    }
}
