//! In-memory cache for development and testing

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{CacheResult, CacheStore};

struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-process cache with per-entry expiry checked on read
pub struct MemoryCache {
    data: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self { data: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// Number of live (unexpired) entries, for tests and diagnostics
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.data.read().await.values().filter(|e| e.expires_at > now).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let data = self.data.read().await;
        Ok(data
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let mut data = self.data.write().await;
        data.insert(
            key.to_string(),
            Entry { value: value.to_string(), expires_at: Instant::now() + ttl },
        );
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> CacheResult<()> {
        let mut data = self.data.write().await;
        for key in keys {
            data.remove(key);
        }
        Ok(())
    }

    async fn ping(&self) -> CacheResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_round_trip() {
        let cache = MemoryCache::new();
        cache.set("users:all", "[]", Duration::from_secs(60)).await.unwrap();

        assert_eq!(cache.get("users:all").await.unwrap(), Some("[]".to_string()));
        assert_eq!(cache.get("users:missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn entries_expire() {
        let cache = MemoryCache::new();
        cache.set("users:all", "[]", Duration::from_millis(10)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(cache.get("users:all").await.unwrap(), None);
    }

    #[tokio::test]
    async fn deleting_absent_keys_is_not_an_error() {
        let cache = MemoryCache::new();
        cache.set("users:all", "[]", Duration::from_secs(60)).await.unwrap();

        cache
            .del(&["users:all".to_string(), "users:missing".to_string()])
            .await
            .unwrap();

        assert!(cache.is_empty().await);
    }
}
