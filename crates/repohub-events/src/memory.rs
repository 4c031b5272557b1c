//! Recording publisher for tests

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use repohub_types::PublishError;

use crate::EventPublisher;

/// A recorded message as handed to the bus
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedMessage {
    pub topic: String,
    pub key: String,
    pub value: serde_json::Value,
}

/// In-memory publisher that records every message.
///
/// Can be armed to fail, for exercising the publish-failure path.
#[derive(Default)]
pub struct MemoryPublisher {
    messages: Mutex<Vec<RecordedMessage>>,
    failing: AtomicBool,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// When armed, every publish and ping fails with a broker error
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn messages(&self) -> Vec<RecordedMessage> {
        self.messages.lock().expect("publisher lock poisoned").clone()
    }
}

#[async_trait]
impl EventPublisher for MemoryPublisher {
    async fn publish(
        &self,
        topic: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), PublishError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PublishError::Broker("memory publisher armed to fail".to_string()));
        }
        self.messages.lock().expect("publisher lock poisoned").push(RecordedMessage {
            topic: topic.to_string(),
            key: key.to_string(),
            value: value.clone(),
        });
        Ok(())
    }

    async fn ping(&self) -> Result<(), PublishError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PublishError::Broker("memory publisher armed to fail".to_string()));
        }
        Ok(())
    }
}
