//! Repository-record orchestration service
//!
//! Mirrors the user service: validate, write, evict, publish. The two
//! services are structurally identical on purpose; they diverge only in
//! entity type, topic, and cache namespace, and each carries its own
//! breaker so one kind's outage never trips the other.

use std::future::Future;
use std::sync::Arc;

use repohub_cache::{keys_to_evict, CacheStore, Mutation};
use repohub_events::EventPublisher;
use repohub_store::Store;
use repohub_types::{EntityId, EntityKind, Event, RecordDraft, RepoRecord, StoreResult};
use tokio::time::timeout;
use tracing::warn;

use crate::breaker::CircuitBreaker;
use crate::error::{ServiceError, ServiceResult};
use crate::ServiceConfig;

const TOPIC: &str = "repo-events";
const KIND: EntityKind = EntityKind::Repo;

/// Orchestrates repository-record CRUD across storage, cache, event bus,
/// and breaker.
pub struct RecordService {
    store: Arc<dyn Store>,
    cache: Arc<dyn CacheStore>,
    publisher: Arc<dyn EventPublisher>,
    breaker: CircuitBreaker,
    config: ServiceConfig,
}

impl RecordService {
    pub fn new(
        store: Arc<dyn Store>,
        cache: Arc<dyn CacheStore>,
        publisher: Arc<dyn EventPublisher>,
        breaker: CircuitBreaker,
        config: ServiceConfig,
    ) -> Self {
        Self { store, cache, publisher, breaker, config }
    }

    /// Creates a repository record and publishes `repo.created`.
    #[tracing::instrument(skip(self, draft))]
    pub async fn create(&self, mut draft: RecordDraft) -> ServiceResult<RepoRecord> {
        draft.validate()?;

        let record = self.storage(self.store.create_record(draft)).await?;

        self.evict(Mutation::Create, &record.id).await;
        self.publish("repo.created", to_payload(&record)?).await?;
        Ok(record)
    }

    /// Fetches a record by its externally-supplied identifier.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, raw_id: &str) -> ServiceResult<RepoRecord> {
        let id: EntityId = raw_id.parse()?;
        self.storage(self.store.get_record(&id)).await
    }

    /// Updates a record, evicting both cache keys and publishing
    /// `repo.updated`.
    #[tracing::instrument(skip(self, draft))]
    pub async fn update(&self, raw_id: &str, mut draft: RecordDraft) -> ServiceResult<RepoRecord> {
        let id: EntityId = raw_id.parse()?;
        draft.validate()?;

        let record = self.storage(self.store.update_record(&id, draft)).await?;

        self.evict(Mutation::Update, &id).await;
        self.publish("repo.updated", to_payload(&record)?).await?;
        Ok(record)
    }

    /// Deletes a record. `NotFound` propagates before any eviction or
    /// event; `repo.deleted` carries only the identifier.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, raw_id: &str) -> ServiceResult<()> {
        let id: EntityId = raw_id.parse()?;

        self.storage(self.store.delete_record(&id)).await?;

        self.evict(Mutation::Delete, &id).await;
        self.publish("repo.deleted", serde_json::json!({ "id": id })).await?;
        Ok(())
    }

    /// Returns all records through the circuit breaker.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self) -> ServiceResult<Vec<RepoRecord>> {
        // Held across the await so a dropped future reports itself
        let permit = self
            .breaker
            .try_acquire()
            .map_err(|e| ServiceError::Unavailable { reason: e.to_string() })?;

        match timeout(self.config.storage_timeout, self.store.list_records()).await {
            Ok(Ok(records)) => {
                permit.success();
                Ok(records)
            }
            Ok(Err(e)) => {
                permit.failure();
                Err(ServiceError::Unavailable { reason: e.to_string() })
            }
            Err(_) => {
                permit.failure();
                Err(ServiceError::Unavailable { reason: "storage call timed out".to_string() })
            }
        }
    }

    async fn storage<T>(&self, call: impl Future<Output = StoreResult<T>>) -> ServiceResult<T> {
        match timeout(self.config.storage_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(ServiceError::Canceled),
        }
    }

    async fn evict(&self, mutation: Mutation, id: &EntityId) {
        let keys = keys_to_evict(KIND, mutation, id);
        match timeout(self.config.storage_timeout, self.cache.del(&keys)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, ?keys, "Cache eviction failed"),
            Err(_) => warn!(?keys, "Cache eviction timed out"),
        }
    }

    async fn publish(&self, event_type: &str, data: serde_json::Value) -> ServiceResult<()> {
        let event = Event::new(event_type, data);
        let envelope =
            serde_json::to_value(&event).map_err(|e| ServiceError::Internal(e.to_string()))?;
        match timeout(
            self.config.publish_timeout,
            self.publisher.publish(TOPIC, &event.event_type, &envelope),
        )
        .await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ServiceError::Publish(e)),
            Err(_) => Err(ServiceError::Canceled),
        }
    }
}

fn to_payload(record: &RepoRecord) -> ServiceResult<serde_json::Value> {
    serde_json::to_value(record).map_err(|e| ServiceError::Internal(e.to_string()))
}
