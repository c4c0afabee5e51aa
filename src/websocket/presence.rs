use crate::services::chat_store::ChatStore;
use crate::websocket::message_types::WsOutboundEvent;
use crate::websocket::RelayRegistry;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::warn;
use uuid::Uuid;

pub struct PresenceBroadcaster;

impl PresenceBroadcaster {
    /// Notify every online contact of the user about an online/offline
    /// transition. Contacts are the distinct other member of each room
    /// the user belongs to; each contact gets at most one event per
    /// broadcast. Failures are logged and swallowed: presence is
    /// best-effort and must never fail the surrounding transition.
    pub async fn broadcast(
        store: &dyn ChatStore,
        registry: &RelayRegistry,
        user_id: Uuid,
        is_online: bool,
        last_seen: Option<DateTime<Utc>>,
    ) {
        let rooms = match store.rooms_of(user_id).await {
            Ok(rooms) => rooms,
            Err(e) => {
                warn!(%user_id, error = %e, "presence broadcast: membership lookup failed");
                return;
            }
        };

        let mut contacts: HashSet<Uuid> = HashSet::new();
        for room in rooms {
            match store.other_member_of(room, user_id).await {
                Ok(Some(other)) => {
                    contacts.insert(other);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(%room, error = %e, "presence broadcast: contact lookup failed");
                }
            }
        }

        let event = WsOutboundEvent::UserStatusChanged {
            user_id,
            is_online,
            last_seen,
        };
        let payload = match event.to_json() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "presence broadcast: serialization failed");
                return;
            }
        };

        for contact in contacts {
            registry.send_to_user(contact, payload.clone()).await;
        }
    }
}
