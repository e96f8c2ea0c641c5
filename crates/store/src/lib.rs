//! Durable store for the orchestrator: authorized contacts, channel
//! instances, per-sender conversation contexts, dataset bindings, the
//! append-only message log, and per-connection model documentation.
//!
//! Every webhook turn reads this store fresh; nothing is cached in process.
//! Cross-turn convergence relies on upsert-by-key (`ON CONFLICT ... DO
//! UPDATE`) rather than row locks.

pub mod schema;

mod contacts;
mod context;
mod docs;
mod messages;

pub use {
    context::end_of_day_ts,
    schema::{
        AuthorizedContact, ChannelInstance, ConversationContext, DatasetBinding, Direction,
        Message, NewMessage,
    },
};

use sqlx::SqlitePool;

/// Handle to the SQLite-backed durable store.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Connect to the database at `url` and initialize the schema.
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let pool = SqlitePool::connect(url).await?;
        Self::with_pool(pool).await
    }

    /// Wrap an existing pool and initialize the schema.
    pub async fn with_pool(pool: SqlitePool) -> anyhow::Result<Self> {
        let store = Self { pool };
        store.init().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS authorized_contacts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                phone TEXT NOT NULL,
                tenant_id TEXT NOT NULL,
                instance_id TEXT NOT NULL,
                active INTEGER NOT NULL DEFAULT 1,
                UNIQUE(phone, tenant_id, instance_id)
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS channel_instances (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                endpoint TEXT NOT NULL,
                credential TEXT NOT NULL,
                connected INTEGER NOT NULL DEFAULT 0
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS conversation_contexts (
                phone TEXT PRIMARY KEY,
                instance_id TEXT,
                connection_id TEXT,
                dataset_id TEXT,
                dataset_name TEXT,
                created_at INTEGER NOT NULL,
                expires_at INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS dataset_bindings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                phone TEXT NOT NULL,
                tenant_id TEXT NOT NULL,
                connection_id TEXT NOT NULL,
                dataset_id TEXT NOT NULL,
                dataset_name TEXT NOT NULL,
                position INTEGER NOT NULL DEFAULT 0
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tenant_id TEXT NOT NULL,
                phone TEXT NOT NULL,
                content TEXT NOT NULL,
                direction TEXT NOT NULL CHECK (direction IN ('in', 'out')),
                sender_label TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_messages_phone_created
             ON messages(phone, created_at)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS model_docs (
                connection_id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                active INTEGER NOT NULL DEFAULT 1
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
pub(crate) async fn memory_store() -> Store {
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("in-memory pool");
    Store::with_pool(pool).await.expect("schema init")
}
