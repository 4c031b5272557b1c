//! Redis cache for production deployments

use std::time::Duration;

use async_trait::async_trait;
use ::redis::AsyncCommands;
use tracing::debug;

use crate::{CacheError, CacheResult, CacheStore};

/// Redis-backed cache over a multiplexed connection manager.
///
/// The connection manager reconnects transparently; individual command
/// failures surface as [`CacheError::Connection`].
pub struct RedisCache {
    client: ::redis::aio::ConnectionManager,
}

impl RedisCache {
    /// Connects to Redis and verifies the connection
    pub async fn new(redis_url: &str) -> CacheResult<Self> {
        let client = ::redis::Client::open(redis_url)
            .map_err(|e| CacheError::Connection(format!("failed to create client: {}", e)))?;

        let manager = ::redis::aio::ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::Connection(format!("failed to connect: {}", e)))?;

        debug!(url = %redis_url, "Redis cache initialized");

        Ok(Self { client: manager })
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.client.clone();
        conn.get(key).await.map_err(|e| CacheError::Connection(format!("GET failed: {}", e)))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.client.clone();
        let _: () = conn
            .set_ex(key, value, ttl.as_secs())
            .await
            .map_err(|e| CacheError::Connection(format!("SET failed: {}", e)))?;
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> CacheResult<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.client.clone();
        // DEL on absent keys returns 0, which is not an error
        let _: () = conn
            .del(keys)
            .await
            .map_err(|e| CacheError::Connection(format!("DEL failed: {}", e)))?;
        Ok(())
    }

    async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.client.clone();
        let _: String = ::redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::Connection(format!("PING failed: {}", e)))?;
        Ok(())
    }
}
