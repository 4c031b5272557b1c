//! # RepoHub Types
//!
//! Shared type definitions for the RepoHub CRUD service.
//!
//! This crate provides the entity model, the identifier abstraction, the
//! event envelope, and the error enums used across the workspace, ensuring
//! a single source of truth and preventing circular dependencies.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// A backend-generated document key.
///
/// 12 bytes: 4-byte big-endian unix timestamp, 5 random bytes, and a 3-byte
/// incrementing counter. Rendered as 24 lowercase hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocKey([u8; 12]);

fn next_doc_counter() -> u32 {
    static COUNTER: OnceLock<AtomicU32> = OnceLock::new();
    COUNTER
        .get_or_init(|| AtomicU32::new(rand::random::<u32>() & 0x00FF_FFFF))
        .fetch_add(1, Ordering::Relaxed)
        & 0x00FF_FFFF
}

impl DocKey {
    /// Generates a fresh document key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 12];
        let ts = Utc::now().timestamp() as u32;
        bytes[..4].copy_from_slice(&ts.to_be_bytes());
        bytes[4..9].copy_from_slice(&rand::random::<[u8; 5]>());
        bytes[9..].copy_from_slice(&next_doc_counter().to_be_bytes()[1..]);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }
}

impl fmt::Display for DocKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for DocKey {
    type Err = InvalidIdentifier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 24 {
            return Err(InvalidIdentifier(s.to_string()));
        }
        let decoded = hex::decode(s).map_err(|_| InvalidIdentifier(s.to_string()))?;
        let mut bytes = [0u8; 12];
        bytes.copy_from_slice(&decoded);
        Ok(Self(bytes))
    }
}

/// Error returned when a string is not a valid identifier of either kind
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid identifier: {0}")]
pub struct InvalidIdentifier(pub String);

/// Opaque entity identifier.
///
/// Exactly one of two concrete kinds: a 128-bit random key assigned by the
/// relational backend, or a document key assigned by the document backend.
/// A single deployment only ever produces one kind, but externally supplied
/// identifiers of either kind must parse and dispatch correctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityId {
    Uuid(Uuid),
    Doc(DocKey),
}

impl EntityId {
    /// Generates a fresh random 128-bit identifier (relational kind).
    pub fn new_uuid() -> Self {
        Self::Uuid(Uuid::new_v4())
    }

    /// Generates a fresh document-key identifier (document kind).
    pub fn new_doc() -> Self {
        Self::Doc(DocKey::generate())
    }
}

impl fmt::Display for EntityId {
    /// Canonical external representation: hyphenated lowercase UUID or
    /// 24-char lowercase hex. `format(x).parse() == x` for all valid `x`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Uuid(u) => write!(f, "{}", u),
            EntityId::Doc(d) => write!(f, "{}", d),
        }
    }
}

impl FromStr for EntityId {
    type Err = InvalidIdentifier;

    /// Parse order is fixed: UUID first, then document key. A 24-char hex
    /// string is never a valid UUID, so dispatch is unambiguous.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(uuid) = Uuid::parse_str(s) {
            return Ok(Self::Uuid(uuid));
        }
        if let Ok(key) = DocKey::from_str(s) {
            return Ok(Self::Doc(key));
        }
        Err(InvalidIdentifier(s.to_string()))
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Entity kinds
// ============================================================================

/// The two entity kinds the service manages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    User,
    Repo,
}

impl EntityKind {
    /// Kind string used as cache-key prefix. External reconciliation tooling
    /// depends on these exact values.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "users",
            EntityKind::Repo => "repositories",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Entities and drafts
// ============================================================================

/// A registered user.
///
/// The identifier and both timestamps are assigned exclusively by the storage
/// adapter at write time, never by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: EntityId,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied input for creating or updating a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDraft {
    pub name: String,
    pub email: String,
}

impl UserDraft {
    /// Normalizes and validates the draft. Run by the orchestration layer
    /// before any storage call; adapters do not re-validate.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        self.name = self.name.trim().to_string();
        self.email = self.email.trim().to_string();

        if self.name.is_empty() {
            return Err(ValidationError("name is required".to_string()));
        }
        if self.email.is_empty() {
            return Err(ValidationError("email is required".to_string()));
        }
        Ok(())
    }
}

/// A tracked source repository owned by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoRecord {
    pub id: EntityId,
    pub user_id: EntityId,
    pub name: String,
    pub url: String,
    pub ai_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied input for creating or updating a repository record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordDraft {
    pub user_id: Option<EntityId>,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub ai_enabled: bool,
}

impl RecordDraft {
    /// Normalizes and validates the draft
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        self.name = self.name.trim().to_string();
        self.url = self.url.trim().to_string();

        if self.user_id.is_none() {
            return Err(ValidationError("user_id is required".to_string()));
        }
        if self.name.is_empty() {
            return Err(ValidationError("name is required".to_string()));
        }
        if self.url.is_empty() {
            return Err(ValidationError("url is required".to_string()));
        }
        if url::Url::parse(&self.url).is_err() {
            return Err(ValidationError("url must be a valid absolute URL".to_string()));
        }
        Ok(())
    }
}

/// Entity-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("validation failed: {0}")]
pub struct ValidationError(pub String);

// ============================================================================
// Event envelope
// ============================================================================

/// Domain event emitted once per successful mutation.
///
/// The envelope is immutable after construction and is never retried by the
/// orchestration layer; retry, if any, is the event bus's responsibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: serde_json::Value,
}

impl Event {
    pub fn new(event_type: impl Into<String>, data: serde_json::Value) -> Self {
        Self { event_type: event_type.into(), data }
    }
}

// ============================================================================
// Error types
// ============================================================================

/// Storage adapter errors. Behaviorally equivalent across backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Event publisher errors
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("broker error: {0}")]
    Broker(String),

    #[error("publish timed out")]
    Timeout,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_id_round_trips() {
        let id = EntityId::new_uuid();
        let parsed: EntityId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn doc_id_round_trips() {
        let id = EntityId::new_doc();
        let formatted = id.to_string();
        assert_eq!(formatted.len(), 24);
        assert_eq!(formatted, formatted.to_lowercase());
        let parsed: EntityId = formatted.parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn parse_dispatches_on_kind() {
        let uuid: EntityId = "f47ac10b-58cc-4372-a567-0e02b2c3d479".parse().unwrap();
        assert!(matches!(uuid, EntityId::Uuid(_)));

        let doc: EntityId = "65f1a2b3c4d5e6f708091a0b".parse().unwrap();
        assert!(matches!(doc, EntityId::Doc(_)));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("".parse::<EntityId>().is_err());
        assert!("not-an-id".parse::<EntityId>().is_err());
        // Right length, not hex
        assert!("zzzzzzzzzzzzzzzzzzzzzzzz".parse::<EntityId>().is_err());
    }

    #[test]
    fn doc_keys_are_unique() {
        let a = DocKey::generate();
        let b = DocKey::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn entity_id_serializes_as_string() {
        let id = EntityId::new_uuid();
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json, serde_json::Value::String(id.to_string()));

        let back: EntityId = serde_json::from_value(json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn user_draft_trims_and_validates() {
        let mut draft = UserDraft { name: "  alice  ".to_string(), email: " a@b.io ".to_string() };
        draft.validate().unwrap();
        assert_eq!(draft.name, "alice");
        assert_eq!(draft.email, "a@b.io");
    }

    #[test]
    fn user_draft_requires_fields() {
        let mut draft = UserDraft { name: "   ".to_string(), email: "a@b.io".to_string() };
        assert!(draft.validate().is_err());

        let mut draft = UserDraft { name: "alice".to_string(), email: "".to_string() };
        assert!(draft.validate().is_err());
    }

    #[test]
    fn record_draft_requires_owner_and_absolute_url() {
        let mut draft = RecordDraft {
            user_id: None,
            name: "repohub".to_string(),
            url: "https://example.com/repohub".to_string(),
            ai_enabled: false,
        };
        assert!(draft.validate().is_err());

        let mut draft = RecordDraft {
            user_id: Some(EntityId::new_uuid()),
            name: "repohub".to_string(),
            url: "not a url".to_string(),
            ai_enabled: false,
        };
        assert!(draft.validate().is_err());

        let mut draft = RecordDraft {
            user_id: Some(EntityId::new_uuid()),
            name: "repohub".to_string(),
            url: "https://example.com/repohub".to_string(),
            ai_enabled: true,
        };
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn record_draft_ai_enabled_defaults_false() {
        let draft: RecordDraft = serde_json::from_str(
            r#"{"user_id":"f47ac10b-58cc-4372-a567-0e02b2c3d479","name":"r","url":"https://x.io"}"#,
        )
        .unwrap();
        assert!(!draft.ai_enabled);
    }

    #[test]
    fn kind_strings_are_stable() {
        assert_eq!(EntityKind::User.as_str(), "users");
        assert_eq!(EntityKind::Repo.as_str(), "repositories");
    }
}
