//! Cache-key derivation
//!
//! Pure functions from (entity kind, mutation, identifier) to the keys a
//! mutation must evict. The `"<kind>:all"` / `"<kind>:<id>"` patterns are a
//! contract: external reconciliation tooling depends on them exactly.

use repohub_types::{EntityId, EntityKind};

/// The three mutation kinds the invalidation policy distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Create,
    Update,
    Delete,
}

/// Collection-level key, evicted on every mutation
pub fn collection_key(kind: EntityKind) -> String {
    format!("{}:all", kind.as_str())
}

/// Per-entity key, evicted on update and delete
pub fn entity_key(kind: EntityKind, id: &EntityId) -> String {
    format!("{}:{}", kind.as_str(), id)
}

/// Keys a successful mutation must evict.
///
/// Creates only invalidate the collection; updates and deletes additionally
/// invalidate the entity itself.
pub fn keys_to_evict(kind: EntityKind, mutation: Mutation, id: &EntityId) -> Vec<String> {
    match mutation {
        Mutation::Create => vec![collection_key(kind)],
        Mutation::Update | Mutation::Delete => {
            vec![collection_key(kind), entity_key(kind, id)]
        }
    }
}
