use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One entry of the chat-list snapshot sent in `chat_update`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSummary {
    pub id: Uuid,
    pub partner_id: Uuid,
    pub partner_nickname: String,
    pub partner_last_seen: Option<DateTime<Utc>>,
}
