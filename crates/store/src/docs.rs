//! Model-documentation blobs, one active blob per analytics connection.

use crate::Store;

impl Store {
    /// The active documentation blob for a connection, truncated to
    /// `max_bytes` at a char boundary. At most one is consulted per turn.
    pub async fn model_doc(
        &self,
        connection_id: &str,
        max_bytes: usize,
    ) -> anyhow::Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT content FROM model_docs WHERE connection_id = ? AND active = 1",
        )
        .bind(connection_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(mut content,)| {
            if content.len() > max_bytes {
                let mut end = max_bytes;
                while end > 0 && !content.is_char_boundary(end) {
                    end -= 1;
                }
                content.truncate(end);
            }
            content
        }))
    }
}
