//! Storage factory for creating backend instances
//!
//! Provides a single place to instantiate storage backends without exposing
//! implementation details to consumers.

use std::str::FromStr;
use std::sync::Arc;

use repohub_types::StoreError;

use crate::memory::MemoryBackend;
use crate::{Result, Store};

#[cfg(feature = "postgres")]
use crate::postgres::PostgresBackend;

/// Storage backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// In-process document store (for development and testing)
    Memory,
    /// PostgreSQL (for production)
    #[cfg(feature = "postgres")]
    Postgres,
}

impl FromStr for BackendType {
    type Err = StoreError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(BackendType::Memory),
            #[cfg(feature = "postgres")]
            "postgres" | "postgresql" | "pg" => Ok(BackendType::Postgres),
            _ => Err(StoreError::Database(format!("unknown backend type: {}", s))),
        }
    }
}

impl BackendType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendType::Memory => "memory",
            #[cfg(feature = "postgres")]
            BackendType::Postgres => "postgres",
        }
    }
}

/// Configuration for the storage backend
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: BackendType,
    /// Connection string for database backends
    pub connection_string: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { backend: BackendType::Memory, connection_string: None }
    }
}

impl StorageConfig {
    pub fn memory() -> Self {
        Self::default()
    }

    #[cfg(feature = "postgres")]
    pub fn postgres(connection_string: impl Into<String>) -> Self {
        Self { backend: BackendType::Postgres, connection_string: Some(connection_string.into()) }
    }
}

/// Storage factory for creating backend instances
pub struct StorageFactory;

impl StorageFactory {
    /// Create a storage backend from configuration
    pub async fn create(config: StorageConfig) -> Result<Arc<dyn Store>> {
        match config.backend {
            BackendType::Memory => Ok(Arc::new(MemoryBackend::new()) as Arc<dyn Store>),
            #[cfg(feature = "postgres")]
            BackendType::Postgres => {
                let connection_string = config.connection_string.as_deref().ok_or_else(|| {
                    StoreError::Connection(
                        "postgres backend requires a connection string".to_string(),
                    )
                })?;
                let backend = PostgresBackend::connect(connection_string).await?;
                backend.ensure_schema().await?;
                Ok(Arc::new(backend) as Arc<dyn Store>)
            }
        }
    }

    /// Create a storage backend from string configuration
    pub async fn from_str(
        backend_str: &str,
        connection_string: Option<String>,
    ) -> Result<Arc<dyn Store>> {
        let backend = BackendType::from_str(backend_str)?;
        Self::create(StorageConfig { backend, connection_string }).await
    }

    /// Create the default memory backend
    pub fn memory() -> Arc<dyn Store> {
        Arc::new(MemoryBackend::new()) as Arc<dyn Store>
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UserStore;

    #[test]
    fn backend_type_from_str() {
        assert_eq!(BackendType::from_str("memory").unwrap(), BackendType::Memory);
        assert_eq!(BackendType::from_str("MEMORY").unwrap(), BackendType::Memory);
        assert!(BackendType::from_str("mainframe").is_err());

        #[cfg(feature = "postgres")]
        {
            assert_eq!(BackendType::from_str("postgres").unwrap(), BackendType::Postgres);
            assert_eq!(BackendType::from_str("pg").unwrap(), BackendType::Postgres);
        }
    }

    #[tokio::test]
    async fn factory_creates_memory_backend() {
        let store = StorageFactory::from_str("memory", None).await.unwrap();
        assert!(store.list_users().await.unwrap().is_empty());
        store.ping().await.unwrap();
    }

    #[cfg(feature = "postgres")]
    #[tokio::test]
    async fn postgres_requires_connection_string() {
        let config = StorageConfig { backend: BackendType::Postgres, connection_string: None };
        let result = StorageFactory::create(config).await;
        assert!(matches!(result, Err(StoreError::Connection(_))));
    }
}
