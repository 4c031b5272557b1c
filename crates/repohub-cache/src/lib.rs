//! # RepoHub Cache
//!
//! Key-value cache contract plus the pure invalidation policy mapping each
//! mutation to the cache keys it must evict. The cache is an invalidation
//! target only; reads are never served from it in this design.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub mod keys;
pub mod memory;
pub mod redis;

pub use keys::{collection_key, entity_key, keys_to_evict, Mutation};
pub use memory::MemoryCache;
pub use self::redis::RedisCache;

/// Cache store errors. Callers treat these as advisory: eviction failures
/// are logged, never propagated.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache connection error: {0}")]
    Connection(String),
}

pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Key-value cache contract.
///
/// Deleting an absent key is not an error.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    async fn del(&self, keys: &[String]) -> CacheResult<()>;

    /// Connectivity probe used by the readiness endpoint
    async fn ping(&self) -> CacheResult<()>;
}
