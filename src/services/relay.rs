use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::services::chat_store::ChatStore;
use crate::websocket::message_types::WsOutboundEvent;
use crate::websocket::presence::PresenceBroadcaster;
use crate::websocket::{ConnectionId, RelayRegistry};
use chrono::Utc;
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;
use uuid::Uuid;

/// The control core of the relay.
///
/// Orchestrates the per-connection lifecycle (admission, steady-state
/// events, disconnect) against the registry, the storage collaborator
/// and the presence broadcaster. All operations report failures to the
/// originating side only and never retry.
pub struct RelayEngine;

fn encode(event: &WsOutboundEvent) -> AppResult<String> {
    event.to_json().map_err(|_| AppError::Internal)
}

impl RelayEngine {
    /// Admit an authenticated connection: install the registry handle
    /// (overwriting any previous one for the same user), join every room
    /// the user belongs to, touch last-seen and announce the user
    /// online. On failure the partial registration is rolled back and
    /// the connection must be closed by the caller.
    pub async fn admit(
        store: &dyn ChatStore,
        registry: &RelayRegistry,
        user: &AuthUser,
        sender: UnboundedSender<String>,
    ) -> AppResult<ConnectionId> {
        let connection_id = registry.register(user.id, sender.clone()).await;

        let joined = async {
            let rooms = store.rooms_of(user.id).await?;
            for room in rooms {
                registry.join_room(room, connection_id, sender.clone()).await;
            }
            store.touch_last_seen(user.id).await
        }
        .await;

        if let Err(e) = joined {
            registry.unregister(user.id, connection_id).await;
            registry.leave_all(connection_id).await;
            return Err(e);
        }

        PresenceBroadcaster::broadcast(store, registry, user.id, true, None).await;
        Ok(connection_id)
    }

    /// Tear a connection down. Registry removal is guarded by the
    /// connection id so a stale teardown never evicts a fresher handle;
    /// the offline announcement is emitted only when this connection was
    /// the current one. Always runs to completion.
    pub async fn disconnect(
        store: &dyn ChatStore,
        registry: &RelayRegistry,
        user_id: Uuid,
        connection_id: ConnectionId,
    ) {
        let was_current = registry.unregister(user_id, connection_id).await;
        registry.leave_all(connection_id).await;

        if let Err(e) = store.touch_last_seen(user_id).await {
            warn!(%user_id, error = %e, "disconnect: last-seen update failed");
        }

        if was_current {
            PresenceBroadcaster::broadcast(store, registry, user_id, false, Some(Utc::now()))
                .await;
        }
    }

    /// Persist a message, then fan it out to every connection joined to
    /// the room. Persistence strictly precedes fan-out: a failed store
    /// call means nobody receives anything.
    pub async fn send_message(
        store: &dyn ChatStore,
        registry: &RelayRegistry,
        sender: &AuthUser,
        chat_id: Uuid,
        content: String,
        encrypted_keys: Option<Value>,
    ) -> AppResult<()> {
        if !store.is_member(chat_id, sender.id).await? {
            return Err(AppError::Forbidden);
        }

        let keys = encrypted_keys.unwrap_or_else(|| Value::Object(Default::default()));
        let message = store
            .persist_message(chat_id, sender.id, &content, &keys)
            .await?;

        let event = WsOutboundEvent::new_message(message, sender.nickname.clone());
        registry.broadcast_to_room(chat_id, encode(&event)?).await;
        Ok(())
    }

    /// Relay a call offer to the target's current connection. The only
    /// signal kind that reports an offline target back to the caller.
    pub async fn call_user(
        registry: &RelayRegistry,
        from: &AuthUser,
        target_user_id: Uuid,
        offer: Value,
    ) -> AppResult<()> {
        let event = WsOutboundEvent::IncomingCall {
            from: from.id,
            from_nickname: from.nickname.clone(),
            offer,
        };
        if !registry.send_to_user(target_user_id, encode(&event)?).await {
            return Err(AppError::TargetOffline);
        }
        Ok(())
    }

    /// Relay an answer; silently a no-op when the target is offline
    pub async fn answer_call(
        registry: &RelayRegistry,
        from: &AuthUser,
        target_user_id: Uuid,
        answer: Value,
    ) -> AppResult<()> {
        let event = WsOutboundEvent::CallAnswered {
            from: from.id,
            answer,
        };
        registry.send_to_user(target_user_id, encode(&event)?).await;
        Ok(())
    }

    /// Relay an ICE candidate; silently a no-op when the target is offline
    pub async fn ice_candidate(
        registry: &RelayRegistry,
        from: &AuthUser,
        target_user_id: Uuid,
        candidate: Value,
    ) -> AppResult<()> {
        let event = WsOutboundEvent::IceCandidate {
            from: from.id,
            candidate,
        };
        registry.send_to_user(target_user_id, encode(&event)?).await;
        Ok(())
    }

    /// Relay a hang-up; silently a no-op when the target is offline
    pub async fn end_call(
        registry: &RelayRegistry,
        from: &AuthUser,
        target_user_id: Uuid,
    ) -> AppResult<()> {
        let event = WsOutboundEvent::CallEnded { from: from.id };
        registry.send_to_user(target_user_id, encode(&event)?).await;
        Ok(())
    }

    /// Snapshot refresh: re-resolve membership, join any rooms created
    /// since admission (chats started over the request/response path
    /// while connected) and answer with the current chat list. This is
    /// the consistency bridge between the two layers.
    pub async fn refresh_chats(
        store: &dyn ChatStore,
        registry: &RelayRegistry,
        user: &AuthUser,
        connection_id: ConnectionId,
        sender: &UnboundedSender<String>,
    ) -> AppResult<()> {
        let rooms = store.rooms_of(user.id).await?;
        for room in rooms {
            registry.join_room(room, connection_id, sender.clone()).await;
        }

        let chats = store.chats_snapshot(user.id).await?;
        let event = WsOutboundEvent::ChatUpdate { chats };
        let _ = sender.send(encode(&event)?);
        Ok(())
    }

    /// Soft-delete a message (sender-only) and fan the deletion notice
    /// to the room. The deleted flag is monotonic; a rejected attempt
    /// leaves it untouched.
    pub async fn delete_message(
        store: &dyn ChatStore,
        registry: &RelayRegistry,
        caller_id: Uuid,
        message_id: Uuid,
    ) -> AppResult<()> {
        let meta = store
            .message_meta(message_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if meta.sender_id != caller_id {
            return Err(AppError::Forbidden);
        }

        store.mark_deleted(message_id).await?;

        let event = WsOutboundEvent::MessageDeleted {
            message_id,
            chat_id: meta.chat_id,
        };
        registry
            .broadcast_to_room(meta.chat_id, encode(&event)?)
            .await;
        Ok(())
    }

    /// Purge a chat and its messages, then notify the members over both
    /// paths: the room broadcast and a point-to-point notice to each
    /// member's registry entry. The redundancy is intentional: it covers
    /// members who are connected but not joined to this room context.
    pub async fn delete_chat(
        store: &dyn ChatStore,
        registry: &RelayRegistry,
        caller_id: Uuid,
        chat_id: Uuid,
    ) -> AppResult<()> {
        if !store.is_member(chat_id, caller_id).await? {
            return Err(AppError::Forbidden);
        }
        // Member set must be resolved before the chat row goes away
        let other = store.other_member_of(chat_id, caller_id).await?;

        store.delete_chat(chat_id).await?;

        let payload = encode(&WsOutboundEvent::ChatDeleted { chat_id })?;
        registry.broadcast_to_room(chat_id, payload.clone()).await;
        registry.send_to_user(caller_id, payload.clone()).await;
        if let Some(other) = other {
            registry.send_to_user(other, payload).await;
        }
        Ok(())
    }

    /// Purge a chat's messages, keeping the chat. Same dual-path
    /// notification as chat deletion.
    pub async fn clear_chat(
        store: &dyn ChatStore,
        registry: &RelayRegistry,
        caller_id: Uuid,
        chat_id: Uuid,
    ) -> AppResult<()> {
        if !store.is_member(chat_id, caller_id).await? {
            return Err(AppError::Forbidden);
        }
        let other = store.other_member_of(chat_id, caller_id).await?;

        store.purge_messages(chat_id).await?;

        let payload = encode(&WsOutboundEvent::MessagesCleared { chat_id })?;
        registry.broadcast_to_room(chat_id, payload.clone()).await;
        registry.send_to_user(caller_id, payload.clone()).await;
        if let Some(other) = other {
            registry.send_to_user(other, payload).await;
        }
        Ok(())
    }
}
