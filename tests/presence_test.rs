mod common;

use chat_relay_service::services::relay::RelayEngine;
use chat_relay_service::websocket::RelayRegistry;
use common::{auth_user, connect, drain, next_event, MemoryStore};

#[tokio::test]
async fn connecting_announces_online_to_connected_contacts() {
    let store = MemoryStore::new();
    let registry = RelayRegistry::new();
    let alice = auth_user(store.add_user("alice"), "alice");
    let bob = auth_user(store.add_user("bob"), "bob");
    store.add_chat(alice.id, bob.id);

    // Nobody online yet, so alice's admission announces to no one
    let (_a_conn, _a_tx, mut a_rx) = connect(&store, &registry, &alice).await;
    assert!(drain(&mut a_rx).is_empty());

    let (_b_conn, _b_tx, mut b_rx) = connect(&store, &registry, &bob).await;
    assert!(drain(&mut b_rx).is_empty());

    let event = next_event(&mut a_rx);
    assert_eq!(event["type"], "user_status_changed");
    assert_eq!(event["userId"], bob.id.to_string());
    assert_eq!(event["isOnline"], true);
    assert!(event["lastSeen"].is_null());
    assert!(a_rx.try_recv().is_err());
}

#[tokio::test]
async fn disconnecting_announces_offline_with_last_seen() {
    let store = MemoryStore::new();
    let registry = RelayRegistry::new();
    let alice = auth_user(store.add_user("alice"), "alice");
    let bob = auth_user(store.add_user("bob"), "bob");
    store.add_chat(alice.id, bob.id);

    let (_a_conn, _a_tx, mut a_rx) = connect(&store, &registry, &alice).await;
    let (b_conn, _b_tx, _b_rx) = connect(&store, &registry, &bob).await;
    drain(&mut a_rx);

    RelayEngine::disconnect(&store, &registry, bob.id, b_conn).await;

    assert!(!registry.is_online(bob.id).await);
    let event = next_event(&mut a_rx);
    assert_eq!(event["type"], "user_status_changed");
    assert_eq!(event["userId"], bob.id.to_string());
    assert_eq!(event["isOnline"], false);
    assert!(event["lastSeen"].is_string());
}

#[tokio::test]
async fn stale_teardown_does_not_announce_offline() {
    let store = MemoryStore::new();
    let registry = RelayRegistry::new();
    let alice = auth_user(store.add_user("alice"), "alice");
    let bob = auth_user(store.add_user("bob"), "bob");
    store.add_chat(alice.id, bob.id);

    let (_a_conn, _a_tx, mut a_rx) = connect(&store, &registry, &alice).await;

    // Bob reconnects; the first handle is now stale
    let (b_first, _b_tx1, _b_rx1) = connect(&store, &registry, &bob).await;
    let (b_second, _b_tx2, _b_rx2) = connect(&store, &registry, &bob).await;
    drain(&mut a_rx);

    RelayEngine::disconnect(&store, &registry, bob.id, b_first).await;
    assert!(registry.is_online(bob.id).await);
    assert!(drain(&mut a_rx).is_empty());

    RelayEngine::disconnect(&store, &registry, bob.id, b_second).await;
    assert!(!registry.is_online(bob.id).await);
    let event = next_event(&mut a_rx);
    assert_eq!(event["isOnline"], false);
}

#[tokio::test]
async fn each_contact_is_notified_at_most_once_per_transition() {
    let store = MemoryStore::new();
    let registry = RelayRegistry::new();
    let alice = auth_user(store.add_user("alice"), "alice");
    let bob = auth_user(store.add_user("bob"), "bob");
    let carol = auth_user(store.add_user("carol"), "carol");
    store.add_chat(alice.id, bob.id);
    store.add_chat(alice.id, carol.id);

    let (_b_conn, _b_tx, mut b_rx) = connect(&store, &registry, &bob).await;
    let (_c_conn, _c_tx, mut c_rx) = connect(&store, &registry, &carol).await;
    drain(&mut b_rx);
    drain(&mut c_rx);

    let (_a_conn, _a_tx, _a_rx) = connect(&store, &registry, &alice).await;

    for rx in [&mut b_rx, &mut c_rx] {
        let events = drain(rx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["userId"], alice.id.to_string());
        assert_eq!(events[0]["isOnline"], true);
    }
}
