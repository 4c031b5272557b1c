//! # RepoHub Store - Storage Abstraction Layer
//!
//! Defines the capability contract every storage backend must satisfy and
//! ships the interchangeable adapters: an in-process document store and a
//! PostgreSQL adapter (behind the `postgres` feature).

use async_trait::async_trait;
use repohub_types::{EntityId, RecordDraft, RepoRecord, StoreResult, User, UserDraft};

pub mod factory;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use factory::{BackendType, StorageConfig, StorageFactory};
pub use memory::MemoryBackend;

#[cfg(feature = "postgres")]
pub use postgres::PostgresBackend;

type Result<T> = StoreResult<T>;

/// Storage contract for users.
///
/// Adapters assign the identifier and both timestamps on `create` and refresh
/// `updated_at` on `update`. Drafts arrive pre-validated from the
/// orchestration layer; adapters do not re-validate.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persist a new user, assigning its identifier and timestamps
    async fn create_user(&self, draft: UserDraft) -> Result<User>;

    /// Fetch a user by identifier; `StoreError::NotFound` if absent
    async fn get_user(&self, id: &EntityId) -> Result<User>;

    /// Replace a user's fields; `StoreError::NotFound` if the identifier
    /// does not match an existing record. Preserves `created_at`.
    async fn update_user(&self, id: &EntityId, draft: UserDraft) -> Result<User>;

    /// Remove a user. Not idempotent: deleting an already-deleted
    /// identifier reports `StoreError::NotFound`, not success.
    async fn delete_user(&self, id: &EntityId) -> Result<()>;

    /// Return the full user set. No pagination; acceptable for the dataset
    /// sizes this service targets.
    async fn list_users(&self) -> Result<Vec<User>>;
}

/// Storage contract for repository records. Same semantics as [`UserStore`].
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn create_record(&self, draft: RecordDraft) -> Result<RepoRecord>;

    async fn get_record(&self, id: &EntityId) -> Result<RepoRecord>;

    async fn update_record(&self, id: &EntityId, draft: RecordDraft) -> Result<RepoRecord>;

    async fn delete_record(&self, id: &EntityId) -> Result<()>;

    async fn list_records(&self) -> Result<Vec<RepoRecord>>;
}

/// The combined backend contract.
///
/// A backend travels through the system as a single `Arc<dyn Store>` serving
/// both entity kinds.
#[async_trait]
pub trait Store: UserStore + RecordStore {
    /// Connectivity probe used by the readiness endpoint
    async fn ping(&self) -> Result<()>;
}
