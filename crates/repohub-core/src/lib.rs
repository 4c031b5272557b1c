//! # RepoHub Core - Orchestration Layer
//!
//! Composes storage, cache invalidation, event emission, and the circuit
//! breaker into one consistency and failure story. Each entity kind gets a
//! service holding injected collaborators; nothing in this crate touches a
//! transport or a global.

use std::time::Duration;

pub mod breaker;
pub mod error;
pub mod record;
pub mod user;

pub use breaker::{BreakerConfig, BreakerPermit, BreakerRejected, BreakerSnapshot, CircuitBreaker};
pub use error::{ServiceError, ServiceResult};
pub use record::RecordService;
pub use user::UserService;

/// Per-service timeouts applied to storage and publish calls
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub storage_timeout: Duration,
    pub publish_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            storage_timeout: Duration::from_secs(5),
            publish_timeout: Duration::from_secs(5),
        }
    }
}
