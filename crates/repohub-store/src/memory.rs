//! In-memory document backend for development and testing
//!
//! Assigns document-kind identifiers, mirroring what a hosted document
//! database would generate server-side.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use repohub_types::{EntityId, RecordDraft, RepoRecord, StoreError, User, UserDraft};
use tokio::sync::RwLock;

use crate::{RecordStore, Result, Store, UserStore};

/// In-memory backend holding both collections behind one lock
pub struct MemoryBackend {
    data: Arc<RwLock<MemoryStore>>,
}

#[derive(Default)]
struct MemoryStore {
    users: HashMap<EntityId, User>,
    records: HashMap<EntityId, RepoRecord>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self { data: Arc::new(RwLock::new(MemoryStore::default())) }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for MemoryBackend {
    async fn create_user(&self, draft: UserDraft) -> Result<User> {
        let now = Utc::now();
        let user = User {
            id: EntityId::new_doc(),
            name: draft.name,
            email: draft.email,
            created_at: now,
            updated_at: now,
        };

        let mut store = self.data.write().await;
        store.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: &EntityId) -> Result<User> {
        let store = self.data.read().await;
        store.users.get(id).cloned().ok_or(StoreError::NotFound)
    }

    async fn update_user(&self, id: &EntityId, draft: UserDraft) -> Result<User> {
        let mut store = self.data.write().await;
        let user = store.users.get_mut(id).ok_or(StoreError::NotFound)?;

        user.name = draft.name;
        user.email = draft.email;
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn delete_user(&self, id: &EntityId) -> Result<()> {
        let mut store = self.data.write().await;
        store.users.remove(id).map(|_| ()).ok_or(StoreError::NotFound)
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let store = self.data.read().await;
        let mut users: Vec<User> = store.users.values().cloned().collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }
}

#[async_trait]
impl RecordStore for MemoryBackend {
    async fn create_record(&self, draft: RecordDraft) -> Result<RepoRecord> {
        let now = Utc::now();
        let record = RepoRecord {
            id: EntityId::new_doc(),
            // Drafts are validated upstream; a missing owner cannot reach here
            user_id: draft.user_id.ok_or(StoreError::Database(
                "record draft missing user_id".to_string(),
            ))?,
            name: draft.name,
            url: draft.url,
            ai_enabled: draft.ai_enabled,
            created_at: now,
            updated_at: now,
        };

        let mut store = self.data.write().await;
        store.records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_record(&self, id: &EntityId) -> Result<RepoRecord> {
        let store = self.data.read().await;
        store.records.get(id).cloned().ok_or(StoreError::NotFound)
    }

    async fn update_record(&self, id: &EntityId, draft: RecordDraft) -> Result<RepoRecord> {
        let mut store = self.data.write().await;
        let record = store.records.get_mut(id).ok_or(StoreError::NotFound)?;

        if let Some(user_id) = draft.user_id {
            record.user_id = user_id;
        }
        record.name = draft.name;
        record.url = draft.url;
        record.ai_enabled = draft.ai_enabled;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn delete_record(&self, id: &EntityId) -> Result<()> {
        let mut store = self.data.write().await;
        store.records.remove(id).map(|_| ()).ok_or(StoreError::NotFound)
    }

    async fn list_records(&self) -> Result<Vec<RepoRecord>> {
        let store = self.data.read().await;
        let mut records: Vec<RepoRecord> = store.records.values().cloned().collect();
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }
}

#[async_trait]
impl Store for MemoryBackend {
    async fn ping(&self) -> Result<()> {
        // Always reachable in-process
        Ok(())
    }
}
