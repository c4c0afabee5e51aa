use crate::error::AppResult;
use crate::models::{ChatSummary, MessageMeta, StoredMessage};
use crate::services::chat_store::ChatStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

/// Postgres-backed storage collaborator
#[derive(Clone)]
pub struct PgChatStore {
    db: Pool<Postgres>,
}

impl PgChatStore {
    pub fn new(db: Pool<Postgres>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ChatStore for PgChatStore {
    async fn rooms_of(&self, user_id: Uuid) -> AppResult<Vec<Uuid>> {
        let rows = sqlx::query("SELECT id FROM chats WHERE user1_id = $1 OR user2_id = $1")
            .bind(user_id)
            .fetch_all(&self.db)
            .await?;
        Ok(rows.into_iter().map(|row| row.get("id")).collect())
    }

    async fn other_member_of(&self, chat_id: Uuid, user_id: Uuid) -> AppResult<Option<Uuid>> {
        let row = sqlx::query(
            r#"
            SELECT CASE WHEN user1_id = $2 THEN user2_id ELSE user1_id END AS other_user_id
            FROM chats
            WHERE id = $1 AND (user1_id = $2 OR user2_id = $2)
            "#,
        )
        .bind(chat_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(|r| r.get("other_user_id")))
    }

    async fn is_member(&self, chat_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let row = sqlx::query(
            "SELECT 1 FROM chats WHERE id = $1 AND (user1_id = $2 OR user2_id = $2) LIMIT 1",
        )
        .bind(chat_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.is_some())
    }

    async fn persist_message(
        &self,
        chat_id: Uuid,
        sender_id: Uuid,
        content: &str,
        encrypted_keys: &serde_json::Value,
    ) -> AppResult<StoredMessage> {
        let id = Uuid::new_v4();
        let row = sqlx::query(
            r#"
            INSERT INTO messages (id, chat_id, sender_id, content, encrypted_keys, timestamp, is_deleted)
            VALUES ($1, $2, $3, $4, $5, NOW(), FALSE)
            RETURNING timestamp
            "#,
        )
        .bind(id)
        .bind(chat_id)
        .bind(sender_id)
        .bind(content)
        .bind(encrypted_keys)
        .fetch_one(&self.db)
        .await?;

        let timestamp: DateTime<Utc> = row.get("timestamp");
        Ok(StoredMessage {
            id,
            chat_id,
            sender_id,
            content: content.to_string(),
            encrypted_keys: encrypted_keys.clone(),
            timestamp,
            is_deleted: false,
        })
    }

    async fn message_meta(&self, message_id: Uuid) -> AppResult<Option<MessageMeta>> {
        let row = sqlx::query("SELECT chat_id, sender_id FROM messages WHERE id = $1")
            .bind(message_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row.map(|r| MessageMeta {
            chat_id: r.get("chat_id"),
            sender_id: r.get("sender_id"),
        }))
    }

    async fn mark_deleted(&self, message_id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE messages SET is_deleted = TRUE WHERE id = $1")
            .bind(message_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn purge_messages(&self, chat_id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM messages WHERE chat_id = $1")
            .bind(chat_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn delete_chat(&self, chat_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM messages WHERE chat_id = $1")
            .bind(chat_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM chats WHERE id = $1")
            .bind(chat_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn chats_snapshot(&self, user_id: Uuid) -> AppResult<Vec<ChatSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT c.id,
              CASE WHEN c.user1_id = $1 THEN c.user2_id ELSE c.user1_id END AS partner_id,
              CASE WHEN c.user1_id = $1 THEN u2.nickname ELSE u1.nickname END AS partner_nickname,
              CASE WHEN c.user1_id = $1 THEN u2.last_seen ELSE u1.last_seen END AS partner_last_seen
            FROM chats c
            JOIN users u1 ON c.user1_id = u1.id
            JOIN users u2 ON c.user2_id = u2.id
            WHERE c.user1_id = $1 OR c.user2_id = $1
            ORDER BY c.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ChatSummary {
                id: row.get("id"),
                partner_id: row.get("partner_id"),
                partner_nickname: row.get("partner_nickname"),
                partner_last_seen: row.try_get("partner_last_seen").ok(),
            })
            .collect())
    }

    async fn touch_last_seen(&self, user_id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE users SET last_seen = NOW() WHERE id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}
