use crate::error::AppResult;
use crate::models::{ChatSummary, MessageMeta, StoredMessage};
use async_trait::async_trait;
use uuid::Uuid;

/// Narrow interface to the durable storage collaborator.
///
/// The relay is read-mostly here: membership resolution on admission and
/// per-send authorization, plus the writes it owns (message persistence,
/// the monotonic delete flag, purges, last-seen touches). Everything else
/// about the store (schema, user accounts, history pagination) belongs to
/// the excluded request/response subsystem.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// All chat ids the user is currently a member of
    async fn rooms_of(&self, user_id: Uuid) -> AppResult<Vec<Uuid>>;

    /// The other member of a two-party chat; None when the chat does not
    /// exist or the user is not in it
    async fn other_member_of(&self, chat_id: Uuid, user_id: Uuid) -> AppResult<Option<Uuid>>;

    async fn is_member(&self, chat_id: Uuid, user_id: Uuid) -> AppResult<bool>;

    /// Persist a message and return the stored row (id and timestamp
    /// are assigned here)
    async fn persist_message(
        &self,
        chat_id: Uuid,
        sender_id: Uuid,
        content: &str,
        encrypted_keys: &serde_json::Value,
    ) -> AppResult<StoredMessage>;

    async fn message_meta(&self, message_id: Uuid) -> AppResult<Option<MessageMeta>>;

    /// Set the monotonic deleted flag; never reverts
    async fn mark_deleted(&self, message_id: Uuid) -> AppResult<()>;

    /// Purge all messages of a chat, keeping the chat itself
    async fn purge_messages(&self, chat_id: Uuid) -> AppResult<()>;

    /// Purge all messages of a chat and the chat row itself
    async fn delete_chat(&self, chat_id: Uuid) -> AppResult<()>;

    /// Chat-list snapshot for `chat_update`
    async fn chats_snapshot(&self, user_id: Uuid) -> AppResult<Vec<ChatSummary>>;

    async fn touch_last_seen(&self, user_id: Uuid) -> AppResult<()>;
}
