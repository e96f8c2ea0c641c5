//! Append-only message log. Feeds rolling history into the agent loop.

use crate::{
    Store,
    schema::{Direction, Message, NewMessage},
};

impl Store {
    /// Append one message to the log.
    pub async fn append_message(&self, message: NewMessage) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO messages (tenant_id, phone, content, direction, sender_label, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&message.tenant_id)
        .bind(&message.phone)
        .bind(&message.content)
        .bind(message.direction.as_str())
        .bind(&message.sender_label)
        .bind(message.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// The most recent `limit` messages for a phone, oldest first.
    pub async fn recent_messages(&self, phone: &str, limit: u32) -> anyhow::Result<Vec<Message>> {
        let rows: Vec<(i64, String, String, String, String, String, i64)> = sqlx::query_as(
            "SELECT id, tenant_id, phone, content, direction, sender_label, created_at
             FROM messages WHERE phone = ?
             ORDER BY created_at DESC, id DESC
             LIMIT ?",
        )
        .bind(phone)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        let mut messages: Vec<Message> = rows
            .into_iter()
            .filter_map(
                |(id, tenant_id, phone, content, direction, sender_label, created_at)| {
                    Some(Message {
                        id,
                        tenant_id,
                        phone,
                        content,
                        direction: Direction::parse(&direction)?,
                        sender_label,
                        created_at,
                    })
                },
            )
            .collect();
        messages.reverse();
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{memory_store, schema::Direction},
    };

    fn msg(content: &str, direction: Direction, created_at: i64) -> NewMessage {
        NewMessage {
            tenant_id: "acme".into(),
            phone: "5511990000001".into(),
            content: content.into(),
            direction,
            sender_label: match direction {
                Direction::In => "user".into(),
                Direction::Out => "Voxbi".into(),
            },
            created_at,
        }
    }

    #[tokio::test]
    async fn recent_returns_newest_window_oldest_first() {
        let store = memory_store().await;
        for i in 0..10i64 {
            store
                .append_message(msg(&format!("m{i}"), Direction::In, 1_000 + i))
                .await
                .unwrap();
        }
        let recent = store.recent_messages("5511990000001", 3).await.unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].content, "m7");
        assert_eq!(recent[2].content, "m9");
    }

    #[tokio::test]
    async fn directions_survive_the_roundtrip() {
        let store = memory_store().await;
        store
            .append_message(msg("pergunta", Direction::In, 1))
            .await
            .unwrap();
        store
            .append_message(msg("resposta", Direction::Out, 2))
            .await
            .unwrap();
        let recent = store.recent_messages("5511990000001", 10).await.unwrap();
        assert_eq!(recent[0].direction, Direction::In);
        assert_eq!(recent[1].direction, Direction::Out);
        assert_eq!(recent[1].sender_label, "Voxbi");
    }

    #[tokio::test]
    async fn log_is_scoped_by_phone() {
        let store = memory_store().await;
        store
            .append_message(msg("mine", Direction::In, 1))
            .await
            .unwrap();
        let other = store.recent_messages("5511999999999", 10).await.unwrap();
        assert!(other.is_empty());
    }
}
