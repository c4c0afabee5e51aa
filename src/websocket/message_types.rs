use crate::models::{ChatSummary, StoredMessage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Events accepted from a connected client. A closed set: unknown
/// `type` tags are a validation error, not an extension point.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum WsInboundEvent {
    #[serde(rename = "send_message", rename_all = "camelCase")]
    SendMessage {
        chat_id: Uuid,
        content: String,
        #[serde(default)]
        encrypted_keys: Option<Value>,
    },
    #[serde(rename = "call_user", rename_all = "camelCase")]
    CallUser { target_user_id: Uuid, offer: Value },
    #[serde(rename = "answer_call", rename_all = "camelCase")]
    AnswerCall { target_user_id: Uuid, answer: Value },
    #[serde(rename = "ice_candidate", rename_all = "camelCase")]
    IceCandidate {
        target_user_id: Uuid,
        candidate: Value,
    },
    #[serde(rename = "end_call", rename_all = "camelCase")]
    EndCall { target_user_id: Uuid },
    #[serde(rename = "get_chats")]
    GetChats,
}

/// Events emitted to connected clients. The tag strings are the public
/// contract; field casing mirrors what each event carried originally
/// (persisted rows in snake_case, signaling and status in camelCase).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum WsOutboundEvent {
    #[serde(rename = "new_message")]
    NewMessage {
        id: Uuid,
        chat_id: Uuid,
        sender_id: Uuid,
        content: String,
        encrypted_keys: Value,
        timestamp: DateTime<Utc>,
        is_deleted: bool,
        sender_nickname: String,
    },
    #[serde(rename = "message_deleted", rename_all = "camelCase")]
    MessageDeleted { message_id: Uuid, chat_id: Uuid },
    #[serde(rename = "chat_deleted", rename_all = "camelCase")]
    ChatDeleted { chat_id: Uuid },
    #[serde(rename = "messages_cleared", rename_all = "camelCase")]
    MessagesCleared { chat_id: Uuid },
    #[serde(rename = "chat_update")]
    ChatUpdate { chats: Vec<ChatSummary> },
    #[serde(rename = "user_status_changed", rename_all = "camelCase")]
    UserStatusChanged {
        user_id: Uuid,
        is_online: bool,
        last_seen: Option<DateTime<Utc>>,
    },
    #[serde(rename = "incoming_call", rename_all = "camelCase")]
    IncomingCall {
        from: Uuid,
        from_nickname: String,
        offer: Value,
    },
    #[serde(rename = "call_answered")]
    CallAnswered { from: Uuid, answer: Value },
    #[serde(rename = "ice_candidate")]
    IceCandidate { from: Uuid, candidate: Value },
    #[serde(rename = "call_ended")]
    CallEnded { from: Uuid },
    #[serde(rename = "call_failed")]
    CallFailed { message: String },
    #[serde(rename = "error")]
    Error { message: String },
}

impl WsOutboundEvent {
    pub fn new_message(message: StoredMessage, sender_nickname: String) -> Self {
        Self::NewMessage {
            id: message.id,
            chat_id: message.chat_id,
            sender_id: message.sender_id,
            content: message.content,
            encrypted_keys: message.encrypted_keys,
            timestamp: message.timestamp,
            is_deleted: message.is_deleted,
            sender_nickname,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
