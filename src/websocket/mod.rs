use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc::UnboundedSender, RwLock};
use uuid::Uuid;

pub mod handlers;
pub mod message_types;
pub mod presence;

/// Unique identifier for a live connection
///
/// Every admitted WebSocket connection gets one. Registry removal is
/// guarded by it so a stale teardown never evicts a fresher connection
/// for the same user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// The single live handle tracked per user
struct UserEntry {
    connection_id: ConnectionId,
    sender: UnboundedSender<String>,
}

/// One connection joined to a room
struct RoomSubscriber {
    connection_id: ConnectionId,
    sender: UnboundedSender<String>,
}

/// Process-wide registry of live connections
///
/// Two internally synchronized maps: user id -> single current handle
/// (last-connected-wins; at most one entry per user at any instant), and
/// room id -> connections joined for delivery. All mutation goes through
/// the relay engine's join/disconnect transitions. No guard is ever held
/// across a storage await.
#[derive(Default, Clone)]
pub struct RelayRegistry {
    users: Arc<RwLock<HashMap<Uuid, UserEntry>>>,
    rooms: Arc<RwLock<HashMap<Uuid, Vec<RoomSubscriber>>>>,
}

impl RelayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the handle for a user, overwriting any previous one.
    ///
    /// The previous connection (if any) is considered stale from here on
    /// but is not proactively closed; its own teardown becomes a guarded
    /// no-op on the user map.
    pub async fn register(&self, user_id: Uuid, sender: UnboundedSender<String>) -> ConnectionId {
        let connection_id = ConnectionId::new();
        let mut guard = self.users.write().await;
        if guard
            .insert(
                user_id,
                UserEntry {
                    connection_id,
                    sender,
                },
            )
            .is_some()
        {
            tracing::debug!("replaced existing connection handle for user {}", user_id);
        }
        connection_id
    }

    /// Remove the user's handle, but only if it still points at this
    /// connection. Returns whether an entry was actually removed.
    pub async fn unregister(&self, user_id: Uuid, connection_id: ConnectionId) -> bool {
        let mut guard = self.users.write().await;
        match guard.get(&user_id) {
            Some(entry) if entry.connection_id == connection_id => {
                guard.remove(&user_id);
                true
            }
            _ => false,
        }
    }

    pub async fn is_online(&self, user_id: Uuid) -> bool {
        self.users.read().await.contains_key(&user_id)
    }

    /// Deliver a payload to the user's current connection, if any.
    /// Returns false when the user has no live handle or the handle's
    /// channel is gone.
    pub async fn send_to_user(&self, user_id: Uuid, payload: String) -> bool {
        let guard = self.users.read().await;
        match guard.get(&user_id) {
            Some(entry) => entry.sender.send(payload).is_ok(),
            None => false,
        }
    }

    /// Join a connection to a room's delivery set (idempotent per connection)
    pub async fn join_room(
        &self,
        room_id: Uuid,
        connection_id: ConnectionId,
        sender: UnboundedSender<String>,
    ) {
        let mut guard = self.rooms.write().await;
        let subscribers = guard.entry(room_id).or_default();
        if subscribers
            .iter()
            .any(|s| s.connection_id == connection_id)
        {
            return;
        }
        subscribers.push(RoomSubscriber {
            connection_id,
            sender,
        });
    }

    /// Remove a connection from every room it joined
    pub async fn leave_all(&self, connection_id: ConnectionId) {
        let mut guard = self.rooms.write().await;
        guard.retain(|_, subscribers| {
            subscribers.retain(|s| s.connection_id != connection_id);
            !subscribers.is_empty()
        });
    }

    /// Fan a payload out to every connection joined to the room.
    /// Dead senders are cleaned up on the way.
    pub async fn broadcast_to_room(&self, room_id: Uuid, payload: String) {
        let mut guard = self.rooms.write().await;
        if let Some(subscribers) = guard.get_mut(&room_id) {
            let before = subscribers.len();
            subscribers.retain(|s| s.sender.send(payload.clone()).is_ok());
            let after = subscribers.len();
            if before != after {
                tracing::debug!(
                    "broadcast to room {}: {} dead senders cleaned up, {} active",
                    room_id,
                    before - after,
                    after
                );
            }
            if subscribers.is_empty() {
                guard.remove(&room_id);
            }
        }
    }

    pub async fn room_subscriber_count(&self, room_id: Uuid) -> usize {
        let guard = self.rooms.read().await;
        guard.get(&room_id).map(|v| v.len()).unwrap_or(0)
    }
}
