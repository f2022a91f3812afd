use tokio::sync::mpsc;

use crate::relay::ListenerRegistry;
use crate::types::{PlaybackAction, TrackRef, UserId};

fn user(id: &str) -> UserId {
    UserId::from(id)
}

fn chan() -> mpsc::Sender<crate::protocol::ServerMessage> {
    mpsc::channel(8).0
}

// ===== Edges =====

#[tokio::test]
async fn test_start_listening_replaces_previous_edge() {
    let registry = ListenerRegistry::new();

    assert_eq!(registry.start_listening(user("l"), user("a")).await, None);
    assert_eq!(
        registry.start_listening(user("l"), user("b")).await,
        Some(user("a"))
    );
    assert_eq!(registry.listening_to(&user("l")).await, Some(user("b")));
    assert_eq!(registry.edge_count().await, 1);
}

#[tokio::test]
async fn test_stop_listening_is_idempotent() {
    let registry = ListenerRegistry::new();
    registry.start_listening(user("l"), user("b")).await;

    assert!(registry.stop_listening(&user("l")).await);
    assert!(!registry.stop_listening(&user("l")).await);
    assert_eq!(registry.listening_to(&user("l")).await, None);
}

#[tokio::test]
async fn test_listeners_of_filters_by_broadcaster_and_connection() {
    let registry = ListenerRegistry::new();
    registry.register(user("l1"), chan()).await;
    registry.register(user("l2"), chan()).await;
    registry.start_listening(user("l1"), user("b")).await;
    registry.start_listening(user("l2"), user("b")).await;
    // l3 has an edge but never connected: skipped in fan-out.
    registry.start_listening(user("l3"), user("b")).await;
    // l4 follows someone else.
    registry.register(user("l4"), chan()).await;
    registry.start_listening(user("l4"), user("c")).await;

    let mut listeners: Vec<String> = registry
        .listeners_of(&user("b"))
        .await
        .into_iter()
        .map(|(id, _)| id.0)
        .collect();
    listeners.sort();
    assert_eq!(listeners, vec!["l1", "l2"]);
}

// ===== Disconnect cascade =====

#[tokio::test]
async fn test_unregister_removes_own_listener_edge() {
    let registry = ListenerRegistry::new();
    let tx = chan();
    registry.register(user("l"), tx.clone()).await;
    registry.start_listening(user("l"), user("b")).await;

    registry.unregister(&user("l"), &tx).await;

    assert!(!registry.is_connected(&user("l")).await);
    assert_eq!(registry.edge_count().await, 0);
}

#[tokio::test]
async fn test_unregister_broadcaster_removes_all_inbound_edges() {
    let registry = ListenerRegistry::new();
    let b_tx = chan();
    registry.register(user("b"), b_tx.clone()).await;
    registry.register(user("l1"), chan()).await;
    registry.register(user("l2"), chan()).await;
    registry.start_listening(user("l1"), user("b")).await;
    registry.start_listening(user("l2"), user("b")).await;
    registry
        .record_state(&user("b"), PlaybackAction::play(TrackRef::new("T"), 0.0))
        .await;

    registry.unregister(&user("b"), &b_tx).await;

    // Listeners stay connected but their edges are gone, so a later
    // broadcast from a reconnected "b" reaches nobody until they rejoin.
    assert!(registry.is_connected(&user("l1")).await);
    assert_eq!(registry.edge_count().await, 0);
    assert!(registry.listeners_of(&user("b")).await.is_empty());
    assert_eq!(registry.last_state(&user("b")).await, None);
}

// ===== State recording =====

#[tokio::test]
async fn test_record_state_overwrites() {
    let registry = ListenerRegistry::new();
    registry
        .record_state(&user("b"), PlaybackAction::play(TrackRef::new("T"), 5.0))
        .await;
    registry
        .record_state(&user("b"), PlaybackAction::pause(TrackRef::new("T"), 9.0))
        .await;

    let state = registry.last_state(&user("b")).await.unwrap();
    assert_eq!(state.kind, crate::types::ActionKind::Pause);
    assert!((state.track_time_seconds - 9.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_stale_connection_close_does_not_unregister_reconnect() {
    let registry = ListenerRegistry::new();
    let old_tx = chan();
    registry.register(user("u"), old_tx.clone()).await;

    // Reconnect before the old socket goes away.
    let new_tx = chan();
    registry.register(user("u"), new_tx.clone()).await;
    registry.start_listening(user("u"), user("b")).await;

    // The old connection's close is a no-op for the new registration.
    registry.unregister(&user("u"), &old_tx).await;
    assert!(registry.is_connected(&user("u")).await);
    assert_eq!(registry.edge_count().await, 1);

    // The current connection's close still cascades.
    registry.unregister(&user("u"), &new_tx).await;
    assert!(!registry.is_connected(&user("u")).await);
    assert_eq!(registry.edge_count().await, 0);
}

#[tokio::test]
async fn test_reconnect_replaces_queue() {
    let registry = ListenerRegistry::new();
    let (old_tx, old_rx) = mpsc::channel(8);
    registry.register(user("u"), old_tx).await;
    drop(old_rx);

    let (new_tx, _new_rx) = mpsc::channel(8);
    registry.register(user("u"), new_tx).await;

    assert_eq!(registry.client_count().await, 1);
    registry.start_listening(user("u"), user("b")).await;
    let listeners = registry.listeners_of(&user("b")).await;
    assert!(!listeners[0].1.is_closed());
}
