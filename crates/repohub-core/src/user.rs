//! User orchestration service
//!
//! The flow per mutation is fixed: validate, write to storage, evict cache
//! keys, publish the domain event. Cache failures are swallowed; publish
//! failures fail the whole operation even though the storage write already
//! committed. That write/event inconsistency window is intentional and
//! documented behavior, not an outbox to be added later: downstream
//! consumers reconcile via re-read.

use std::future::Future;
use std::sync::Arc;

use repohub_cache::{keys_to_evict, CacheStore, Mutation};
use repohub_events::EventPublisher;
use repohub_store::Store;
use repohub_types::{EntityId, EntityKind, Event, StoreResult, User, UserDraft};
use tokio::time::timeout;
use tracing::warn;

use crate::breaker::CircuitBreaker;
use crate::error::{ServiceError, ServiceResult};
use crate::ServiceConfig;

const TOPIC: &str = "user-events";
const KIND: EntityKind = EntityKind::User;

/// Orchestrates user CRUD across storage, cache, event bus, and breaker.
///
/// All collaborators are injected at construction; the service holds no
/// other state and every call is independent.
pub struct UserService {
    store: Arc<dyn Store>,
    cache: Arc<dyn CacheStore>,
    publisher: Arc<dyn EventPublisher>,
    breaker: CircuitBreaker,
    config: ServiceConfig,
}

impl UserService {
    pub fn new(
        store: Arc<dyn Store>,
        cache: Arc<dyn CacheStore>,
        publisher: Arc<dyn EventPublisher>,
        breaker: CircuitBreaker,
        config: ServiceConfig,
    ) -> Self {
        Self { store, cache, publisher, breaker, config }
    }

    /// Creates a user.
    ///
    /// Validation runs before any storage call; on success the collection
    /// cache key is evicted and a `user.created` event is published.
    #[tracing::instrument(skip(self, draft))]
    pub async fn create(&self, mut draft: UserDraft) -> ServiceResult<User> {
        draft.validate()?;

        let user = self.storage(self.store.create_user(draft)).await?;

        self.evict(Mutation::Create, &user.id).await;
        self.publish("user.created", to_payload(&user)?).await?;
        Ok(user)
    }

    /// Fetches a user by its externally-supplied identifier.
    ///
    /// Reads always go to storage; the cache is an invalidation target
    /// only, so no read-through happens here. Known limitation.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, raw_id: &str) -> ServiceResult<User> {
        let id: EntityId = raw_id.parse()?;
        self.storage(self.store.get_user(&id)).await
    }

    /// Updates a user, evicting both the collection and per-entity cache
    /// keys and publishing `user.updated`.
    #[tracing::instrument(skip(self, draft))]
    pub async fn update(&self, raw_id: &str, mut draft: UserDraft) -> ServiceResult<User> {
        let id: EntityId = raw_id.parse()?;
        draft.validate()?;

        let user = self.storage(self.store.update_user(&id, draft)).await?;

        self.evict(Mutation::Update, &id).await;
        self.publish("user.updated", to_payload(&user)?).await?;
        Ok(user)
    }

    /// Deletes a user. On `NotFound` nothing is evicted and no event is
    /// published; `user.deleted` carries a minimal `{id}` payload since the
    /// entity no longer exists.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, raw_id: &str) -> ServiceResult<()> {
        let id: EntityId = raw_id.parse()?;

        self.storage(self.store.delete_user(&id)).await?;

        self.evict(Mutation::Delete, &id).await;
        self.publish("user.deleted", serde_json::json!({ "id": id })).await?;
        Ok(())
    }

    /// Returns all users, routed through the circuit breaker.
    ///
    /// Breaker rejections and guarded-call failures both surface as
    /// `Unavailable` wrapping the underlying cause. Point lookups and
    /// mutations are never short-circuited, only this full-scan path.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self) -> ServiceResult<Vec<User>> {
        // The permit is held across the await: if this future is dropped
        // mid-call the breaker learns about the abandoned probe on drop
        let permit = self
            .breaker
            .try_acquire()
            .map_err(|e| ServiceError::Unavailable { reason: e.to_string() })?;

        match timeout(self.config.storage_timeout, self.store.list_users()).await {
            Ok(Ok(users)) => {
                permit.success();
                Ok(users)
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

    /// Evicts the cache keys the mutation invalidates. Failures are logged
    /// and swallowed: staleness is tolerable, mutation loss is not.
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

fn to_payload(user: &User) -> ServiceResult<serde_json::Value> {
    serde_json::to_value(user).map_err(|e| ServiceError::Internal(e.to_string()))
}
