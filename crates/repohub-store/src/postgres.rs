//! PostgreSQL backend
//!
//! Assigns uuid-kind identifiers client-side before insert. Repository owner
//! references are stored as TEXT in canonical form so identifiers of either
//! kind survive verbatim.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use repohub_types::{EntityId, RecordDraft, RepoRecord, StoreError, User, UserDraft};
use sqlx::postgres::PgPool;
use uuid::Uuid;

use crate::{RecordStore, Result, Store, UserStore};

/// PostgreSQL storage adapter over a shared connection pool
pub struct PostgresBackend {
    pool: PgPool,
}

impl PostgresBackend {
    /// Connects to the database and verifies the connection
    pub async fn connect(connection_string: &str) -> Result<Self> {
        let pool = PgPool::connect(connection_string)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(Self { pool })
    }

    /// Creates the backing tables if they do not exist
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS repositories (
                id UUID PRIMARY KEY,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                url TEXT NOT NULL,
                ai_enabled BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(())
    }
}

fn map_sqlx(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::Io(e) => StoreError::Connection(e.to_string()),
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            StoreError::Connection(err.to_string())
        }
        other => StoreError::Database(other.to_string()),
    }
}

/// Only uuid-kind identifiers can exist in this backend; anything else is
/// reported as absent rather than malformed.
fn as_uuid(id: &EntityId) -> Option<Uuid> {
    match id {
        EntityId::Uuid(u) => Some(*u),
        EntityId::Doc(_) => None,
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: EntityId::Uuid(row.id),
            name: row.name,
            email: row.email,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RecordRow {
    id: Uuid,
    user_id: String,
    name: String,
    url: String,
    ai_enabled: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RecordRow> for RepoRecord {
    type Error = StoreError;

    fn try_from(row: RecordRow) -> Result<Self> {
        let user_id = row
            .user_id
            .parse()
            .map_err(|e| StoreError::Database(format!("corrupt owner reference: {}", e)))?;
        Ok(RepoRecord {
            id: EntityId::Uuid(row.id),
            user_id,
            name: row.name,
            url: row.url,
            ai_enabled: row.ai_enabled,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl UserStore for PostgresBackend {
    async fn create_user(&self, draft: UserDraft) -> Result<User> {
        let now = Utc::now();
        let id = Uuid::new_v4();

        sqlx::query(
            "INSERT INTO users (id, name, email, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(&draft.name)
        .bind(&draft.email)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(User {
            id: EntityId::Uuid(id),
            name: draft.name,
            email: draft.email,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_user(&self, id: &EntityId) -> Result<User> {
        let Some(uuid) = as_uuid(id) else { return Err(StoreError::NotFound) };

        let row: UserRow = sqlx::query_as(
            "SELECT id, name, email, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?
        .ok_or(StoreError::NotFound)?;

        Ok(row.into())
    }

    async fn update_user(&self, id: &EntityId, draft: UserDraft) -> Result<User> {
        let Some(uuid) = as_uuid(id) else { return Err(StoreError::NotFound) };
        let now = Utc::now();

        let row: UserRow = sqlx::query_as(
            "UPDATE users SET name = $1, email = $2, updated_at = $3 WHERE id = $4 \
             RETURNING id, name, email, created_at, updated_at",
        )
        .bind(&draft.name)
        .bind(&draft.email)
        .bind(now)
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?
        .ok_or(StoreError::NotFound)?;

        Ok(row.into())
    }

    async fn delete_user(&self, id: &EntityId) -> Result<()> {
        let Some(uuid) = as_uuid(id) else { return Err(StoreError::NotFound) };

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(uuid)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as(
            "SELECT id, name, email, created_at, updated_at FROM users ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(rows.into_iter().map(User::from).collect())
    }
}

#[async_trait]
impl RecordStore for PostgresBackend {
    async fn create_record(&self, draft: RecordDraft) -> Result<RepoRecord> {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let user_id = draft
            .user_id
            .ok_or(StoreError::Database("record draft missing user_id".to_string()))?;

        sqlx::query(
            "INSERT INTO repositories (id, user_id, name, url, ai_enabled, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(id)
        .bind(user_id.to_string())
        .bind(&draft.name)
        .bind(&draft.url)
        .bind(draft.ai_enabled)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(RepoRecord {
            id: EntityId::Uuid(id),
            user_id,
            name: draft.name,
            url: draft.url,
            ai_enabled: draft.ai_enabled,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_record(&self, id: &EntityId) -> Result<RepoRecord> {
        let Some(uuid) = as_uuid(id) else { return Err(StoreError::NotFound) };

        let row: RecordRow = sqlx::query_as(
            "SELECT id, user_id, name, url, ai_enabled, created_at, updated_at \
             FROM repositories WHERE id = $1",
        )
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?
        .ok_or(StoreError::NotFound)?;

        row.try_into()
    }

    async fn update_record(&self, id: &EntityId, draft: RecordDraft) -> Result<RepoRecord> {
        let Some(uuid) = as_uuid(id) else { return Err(StoreError::NotFound) };
        let now = Utc::now();

        let row: RecordRow = sqlx::query_as(
            "UPDATE repositories SET user_id = COALESCE($1, user_id), name = $2, url = $3, \
             ai_enabled = $4, updated_at = $5 WHERE id = $6 \
             RETURNING id, user_id, name, url, ai_enabled, created_at, updated_at",
        )
        .bind(draft.user_id.map(|u| u.to_string()))
        .bind(&draft.name)
        .bind(&draft.url)
        .bind(draft.ai_enabled)
        .bind(now)
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?
        .ok_or(StoreError::NotFound)?;

        row.try_into()
    }

    async fn delete_record(&self, id: &EntityId) -> Result<()> {
        let Some(uuid) = as_uuid(id) else { return Err(StoreError::NotFound) };

        let result = sqlx::query("DELETE FROM repositories WHERE id = $1")
            .bind(uuid)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_records(&self) -> Result<Vec<RepoRecord>> {
        let rows: Vec<RecordRow> = sqlx::query_as(
            "SELECT id, user_id, name, url, ai_enabled, created_at, updated_at \
             FROM repositories ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        rows.into_iter().map(RepoRecord::try_from).collect()
    }
}

#[async_trait]
impl Store for PostgresBackend {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await.map_err(map_sqlx)?;
        Ok(())
    }
}
