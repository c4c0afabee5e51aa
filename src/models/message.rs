use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted message row. `content` is opaque ciphertext and
/// `encrypted_keys` an opaque per-recipient key map; the relay never
/// interprets either. `is_deleted` is monotonic (false -> true).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub encrypted_keys: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    pub is_deleted: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct MessageMeta {
    pub chat_id: Uuid,
    pub sender_id: Uuid,
}
