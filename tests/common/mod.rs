#![allow(dead_code)]

use async_trait::async_trait;
use chat_relay_service::error::{AppError, AppResult};
use chat_relay_service::middleware::auth::AuthUser;
use chat_relay_service::models::{ChatSummary, MessageMeta, StoredMessage};
use chat_relay_service::services::chat_store::ChatStore;
use chat_relay_service::services::relay::RelayEngine;
use chat_relay_service::websocket::{ConnectionId, RelayRegistry};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    chats: HashMap<Uuid, (Uuid, Uuid)>,
    messages: HashMap<Uuid, StoredMessage>,
    nicknames: HashMap<Uuid, String>,
}

/// In-memory storage collaborator for engine tests
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    pub fail_persistence: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, nickname: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.inner
            .lock()
            .unwrap()
            .nicknames
            .insert(id, nickname.to_string());
        id
    }

    pub fn add_chat(&self, a: Uuid, b: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        self.inner.lock().unwrap().chats.insert(id, (a, b));
        id
    }

    pub fn message(&self, id: Uuid) -> Option<StoredMessage> {
        self.inner.lock().unwrap().messages.get(&id).cloned()
    }

    pub fn message_count(&self, chat_id: Uuid) -> usize {
        self.inner
            .lock()
            .unwrap()
            .messages
            .values()
            .filter(|m| m.chat_id == chat_id)
            .count()
    }

    pub fn chat_exists(&self, chat_id: Uuid) -> bool {
        self.inner.lock().unwrap().chats.contains_key(&chat_id)
    }

    pub fn fail_persistence(&self, fail: bool) {
        self.fail_persistence.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChatStore for MemoryStore {
    async fn rooms_of(&self, user_id: Uuid) -> AppResult<Vec<Uuid>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .chats
            .iter()
            .filter(|(_, (a, b))| *a == user_id || *b == user_id)
            .map(|(id, _)| *id)
            .collect())
    }

    async fn other_member_of(&self, chat_id: Uuid, user_id: Uuid) -> AppResult<Option<Uuid>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.chats.get(&chat_id).and_then(|(a, b)| {
            if *a == user_id {
                Some(*b)
            } else if *b == user_id {
                Some(*a)
            } else {
                None
            }
        }))
    }

    async fn is_member(&self, chat_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .chats
            .get(&chat_id)
            .map(|(a, b)| *a == user_id || *b == user_id)
            .unwrap_or(false))
    }

    async fn persist_message(
        &self,
        chat_id: Uuid,
        sender_id: Uuid,
        content: &str,
        encrypted_keys: &serde_json::Value,
    ) -> AppResult<StoredMessage> {
        if self.fail_persistence.load(Ordering::SeqCst) {
            return Err(AppError::Internal);
        }
        let message = StoredMessage {
            id: Uuid::new_v4(),
            chat_id,
            sender_id,
            content: content.to_string(),
            encrypted_keys: encrypted_keys.clone(),
            timestamp: Utc::now(),
            is_deleted: false,
        };
        self.inner
            .lock()
            .unwrap()
            .messages
            .insert(message.id, message.clone());
        Ok(message)
    }

    async fn message_meta(&self, message_id: Uuid) -> AppResult<Option<MessageMeta>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.messages.get(&message_id).map(|m| MessageMeta {
            chat_id: m.chat_id,
            sender_id: m.sender_id,
        }))
    }

    async fn mark_deleted(&self, message_id: Uuid) -> AppResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(message) = inner.messages.get_mut(&message_id) {
            message.is_deleted = true;
        }
        Ok(())
    }

    async fn purge_messages(&self, chat_id: Uuid) -> AppResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.messages.retain(|_, m| m.chat_id != chat_id);
        Ok(())
    }

    async fn delete_chat(&self, chat_id: Uuid) -> AppResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.messages.retain(|_, m| m.chat_id != chat_id);
        inner.chats.remove(&chat_id);
        Ok(())
    }

    async fn chats_snapshot(&self, user_id: Uuid) -> AppResult<Vec<ChatSummary>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .chats
            .iter()
            .filter_map(|(id, (a, b))| {
                let partner = if *a == user_id {
                    *b
                } else if *b == user_id {
                    *a
                } else {
                    return None;
                };
                Some(ChatSummary {
                    id: *id,
                    partner_id: partner,
                    partner_nickname: inner
                        .nicknames
                        .get(&partner)
                        .cloned()
                        .unwrap_or_default(),
                    partner_last_seen: None,
                })
            })
            .collect())
    }

    async fn touch_last_seen(&self, _user_id: Uuid) -> AppResult<()> {
        Ok(())
    }
}

pub fn auth_user(id: Uuid, nickname: &str) -> AuthUser {
    AuthUser {
        id,
        nickname: nickname.to_string(),
    }
}

/// Admit a fake connection for a user, returning its id, outbound
/// channel sender and the receiving end the tests assert on
pub async fn connect(
    store: &MemoryStore,
    registry: &RelayRegistry,
    user: &AuthUser,
) -> (
    ConnectionId,
    UnboundedSender<String>,
    UnboundedReceiver<String>,
) {
    let (tx, rx) = unbounded_channel();
    let connection_id = RelayEngine::admit(store, registry, user, tx.clone())
        .await
        .expect("admission failed");
    (connection_id, tx, rx)
}

pub fn next_event(rx: &mut UnboundedReceiver<String>) -> serde_json::Value {
    let payload = rx.try_recv().expect("expected an event");
    serde_json::from_str(&payload).expect("event is not valid JSON")
}

pub fn drain(rx: &mut UnboundedReceiver<String>) -> Vec<serde_json::Value> {
    let mut events = Vec::new();
    while let Ok(payload) = rx.try_recv() {
        events.push(serde_json::from_str(&payload).expect("event is not valid JSON"));
    }
    events
}
