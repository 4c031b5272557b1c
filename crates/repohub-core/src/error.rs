//! Service-level error taxonomy
//!
//! The transport layer maps these kinds to status codes; nothing here knows
//! about HTTP.

use repohub_types::{InvalidIdentifier, PublishError, StoreError, ValidationError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Entity-level validation rejected the input before any storage call
    #[error("validation failed: {0}")]
    Validation(String),

    /// The supplied identifier parses as neither identifier kind
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("not found")]
    NotFound,

    /// Breaker rejection or guarded-call failure on the bulk-read path
    #[error("service unavailable: {reason}")]
    Unavailable { reason: String },

    /// The storage write succeeded but the event publish did not. The
    /// operation is reported failed anyway; see the service docs.
    #[error("event publish failed: {0}")]
    Publish(#[from] PublishError),

    #[error("connection error: {0}")]
    Connection(String),

    /// A storage or publish call exceeded its deadline or was canceled
    #[error("operation canceled or timed out")]
    Canceled,

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ServiceError::NotFound,
            StoreError::Connection(msg) => ServiceError::Connection(msg),
            StoreError::Database(msg) => ServiceError::Internal(msg),
            StoreError::Serialization(e) => ServiceError::Internal(e.to_string()),
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::Validation(err.0)
    }
}

impl From<InvalidIdentifier> for ServiceError {
    fn from(err: InvalidIdentifier) -> Self {
        ServiceError::InvalidId(err.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_service_kinds() {
        assert!(matches!(ServiceError::from(StoreError::NotFound), ServiceError::NotFound));
        assert!(matches!(
            ServiceError::from(StoreError::Connection("refused".into())),
            ServiceError::Connection(_)
        ));
        assert!(matches!(
            ServiceError::from(StoreError::Database("syntax".into())),
            ServiceError::Internal(_)
        ));
    }

    #[test]
    fn parse_and_validation_errors_convert() {
        let err: ServiceError = InvalidIdentifier("xyz".into()).into();
        assert!(matches!(err, ServiceError::InvalidId(_)));

        let err: ServiceError = ValidationError("name is required".into()).into();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}
