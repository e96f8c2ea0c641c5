//! Conversation-context reads and upserts.
//!
//! One live row per phone, keyed by primary key. Writes always stamp
//! `expires_at` to the end of the current calendar day; reads past that
//! boundary behave as if no context exists (the stale row is dropped
//! lazily on the next read).

use {
    chrono::{Local, TimeZone},
    tracing::debug,
    voxbi_common::types::DatasetRef,
};

use crate::{Store, schema::ConversationContext};

/// Unix timestamp of the last second of the calendar day containing `now`,
/// in the server's local timezone.
#[must_use]
pub fn end_of_day_ts(now: i64) -> i64 {
    let Some(dt) = Local.timestamp_opt(now, 0).single() else {
        return now + 86_400;
    };
    dt.date_naive()
        .and_hms_opt(23, 59, 59)
        .and_then(|naive| naive.and_local_timezone(Local).single())
        .map_or(now + 86_400, |eod| eod.timestamp())
}

impl Store {
    /// The live context for a phone, if any. A row whose `expires_at` is in
    /// the past is deleted and reported as absent.
    pub async fn context(
        &self,
        phone: &str,
        now: i64,
    ) -> anyhow::Result<Option<ConversationContext>> {
        let row: Option<(
            String,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
            i64,
            i64,
        )> = sqlx::query_as(
            "SELECT phone, instance_id, connection_id, dataset_id, dataset_name,
                    created_at, expires_at
             FROM conversation_contexts WHERE phone = ?",
        )
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;

        let Some((phone, instance_id, connection_id, dataset_id, dataset_name, created_at, expires_at)) =
            row
        else {
            return Ok(None);
        };

        if expires_at < now {
            debug!(phone = %phone, "dropping expired conversation context");
            self.clear_context(&phone).await?;
            return Ok(None);
        }

        let dataset = match (connection_id, dataset_id, dataset_name) {
            (Some(connection_id), Some(dataset_id), Some(dataset_name)) => Some(DatasetRef {
                connection_id,
                dataset_id,
                dataset_name,
            }),
            _ => None,
        };

        Ok(Some(ConversationContext {
            phone,
            instance_id,
            dataset,
            created_at,
            expires_at,
        }))
    }

    /// Persist a channel-instance selection. Any previously selected dataset
    /// is cleared, since it belonged to the old instance's tenant.
    pub async fn save_instance_selection(
        &self,
        phone: &str,
        instance_id: &str,
        now: i64,
    ) -> anyhow::Result<()> {
        let expires_at = end_of_day_ts(now);
        sqlx::query(
            "INSERT INTO conversation_contexts
                 (phone, instance_id, connection_id, dataset_id, dataset_name,
                  created_at, expires_at)
             VALUES (?, ?, NULL, NULL, NULL, ?, ?)
             ON CONFLICT(phone) DO UPDATE SET
                 instance_id = excluded.instance_id,
                 connection_id = NULL,
                 dataset_id = NULL,
                 dataset_name = NULL,
                 created_at = excluded.created_at,
                 expires_at = excluded.expires_at",
        )
        .bind(phone)
        .bind(instance_id)
        .bind(now)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Persist a dataset selection alongside the resolved instance.
    pub async fn save_dataset_selection(
        &self,
        phone: &str,
        instance_id: &str,
        dataset: &DatasetRef,
        now: i64,
    ) -> anyhow::Result<()> {
        let expires_at = end_of_day_ts(now);
        sqlx::query(
            "INSERT INTO conversation_contexts
                 (phone, instance_id, connection_id, dataset_id, dataset_name,
                  created_at, expires_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(phone) DO UPDATE SET
                 instance_id = excluded.instance_id,
                 connection_id = excluded.connection_id,
                 dataset_id = excluded.dataset_id,
                 dataset_name = excluded.dataset_name,
                 created_at = excluded.created_at,
                 expires_at = excluded.expires_at",
        )
        .bind(phone)
        .bind(instance_id)
        .bind(&dataset.connection_id)
        .bind(&dataset.dataset_id)
        .bind(&dataset.dataset_name)
        .bind(now)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Drop only the dataset selection, keeping the instance selection.
    pub async fn clear_dataset_selection(&self, phone: &str) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE conversation_contexts
             SET connection_id = NULL, dataset_id = NULL, dataset_name = NULL
             WHERE phone = ?",
        )
        .bind(phone)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Drop the whole context row for a phone.
    pub async fn clear_context(&self, phone: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM conversation_contexts WHERE phone = ?")
            .bind(phone)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
