use crate::error::AppError;
use crate::models::{Conversation, LastMessage, Message};
use crate::store::{normalize_pair, ConversationStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn conversation_from_row(row: &sqlx::postgres::PgRow) -> Conversation {
        let last_content: Option<String> = row.get("last_content");
        let last_sender: Option<Uuid> = row.get("last_sender");
        let last_at: Option<DateTime<Utc>> = row.get("last_at");
        let last_message = match (last_content, last_sender, last_at) {
            (Some(content), Some(sender_id), Some(timestamp)) => Some(LastMessage {
                content,
                sender_id,
                timestamp,
            }),
            _ => None,
        };
        Conversation {
            id: row.get("id"),
            participants: [row.get("participant_a"), row.get("participant_b")],
            last_message,
            created_at: row.get("created_at"),
        }
    }

    async fn exists(&self, conversation_id: Uuid) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT 1 AS one FROM conversations WHERE id = $1")
            .bind(conversation_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl ConversationStore for PgStore {
    async fn create_or_get(&self, a: Uuid, b: Uuid) -> Result<(Conversation, bool), AppError> {
        let (lo, hi) = normalize_pair(a, b);
        // Pair uniqueness rides on the canonical column order; a concurrent
        // duplicate insert loses the conflict and the follow-up select wins.
        let inserted = sqlx::query(
            "INSERT INTO conversations (id, participant_a, participant_b)
             VALUES ($1, $2, $3)
             ON CONFLICT (participant_a, participant_b) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(lo)
        .bind(hi)
        .execute(&self.pool)
        .await?
        .rows_affected();

        let row = sqlx::query(
            "SELECT id, participant_a, participant_b, last_content, last_sender, last_at, created_at
             FROM conversations WHERE participant_a = $1 AND participant_b = $2",
        )
        .bind(lo)
        .bind(hi)
        .fetch_one(&self.pool)
        .await?;
        Ok((Self::conversation_from_row(&row), inserted > 0))
    }

    async fn get(&self, conversation_id: Uuid) -> Result<Option<Conversation>, AppError> {
        let row = sqlx::query(
            "SELECT id, participant_a, participant_b, last_content, last_sender, last_at, created_at
             FROM conversations WHERE id = $1",
        )
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(Self::conversation_from_row))
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Conversation>, AppError> {
        let rows = sqlx::query(
            "SELECT id, participant_a, participant_b, last_content, last_sender, last_at, created_at
             FROM conversations
             WHERE participant_a = $1 OR participant_b = $1
             ORDER BY COALESCE(last_at, created_at) DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(Self::conversation_from_row).collect())
    }

    async fn delete(&self, conversation_id: Uuid) -> Result<(), AppError> {
        // Messages go with the conversation via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM conversations WHERE id = $1")
            .bind(conversation_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn append_message(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: &str,
    ) -> Result<Message, AppError> {
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query("SELECT 1 AS one FROM conversations WHERE id = $1")
            .bind(conversation_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(AppError::NotFound);
        }

        let id = Uuid::new_v4();
        let row = sqlx::query(
            "INSERT INTO messages (id, conversation_id, sender_id, content)
             VALUES ($1, $2, $3, $4)
             RETURNING created_at",
        )
        .bind(id)
        .bind(conversation_id)
        .bind(sender_id)
        .bind(content)
        .fetch_one(&mut *tx)
        .await?;
        let created_at: DateTime<Utc> = row.get("created_at");

        sqlx::query(
            "UPDATE conversations SET last_content = $2, last_sender = $3, last_at = $4
             WHERE id = $1",
        )
        .bind(conversation_id)
        .bind(content)
        .bind(sender_id)
        .bind(created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Message {
            id,
            conversation_id,
            sender_id,
            content: content.to_string(),
            created_at,
            read: false,
            read_at: None,
        })
    }

    async fn messages(&self, conversation_id: Uuid) -> Result<Vec<Message>, AppError> {
        if !self.exists(conversation_id).await? {
            return Err(AppError::NotFound);
        }
        let rows = sqlx::query(
            "SELECT id, conversation_id, sender_id, content, created_at, read, read_at
             FROM messages WHERE conversation_id = $1
             ORDER BY seq ASC",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|row| Message {
                id: row.get("id"),
                conversation_id: row.get("conversation_id"),
                sender_id: row.get("sender_id"),
                content: row.get("content"),
                created_at: row.get("created_at"),
                read: row.get("read"),
                read_at: row.get("read_at"),
            })
            .collect())
    }

    async fn mark_read(&self, conversation_id: Uuid, reader_id: Uuid) -> Result<u64, AppError> {
        if !self.exists(conversation_id).await? {
            return Err(AppError::NotFound);
        }
        let result = sqlx::query(
            "UPDATE messages SET read = TRUE, read_at = NOW()
             WHERE conversation_id = $1 AND sender_id <> $2 AND read = FALSE",
        )
        .bind(conversation_id)
        .bind(reader_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
