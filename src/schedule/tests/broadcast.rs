use tokio::sync::mpsc;

use crate::protocol::ClientMessage;
use crate::schedule::PlaybackBroadcaster;
use crate::types::{ActionKind, TrackRef};

#[tokio::test]
async fn test_announce_emits_broadcast_action() {
    let (tx, mut rx) = mpsc::channel(8);
    let broadcaster = PlaybackBroadcaster::new(tx);

    assert!(broadcaster.announce_play(TrackRef::new("X"), 10.0));

    match rx.recv().await.unwrap() {
        ClientMessage::BroadcastAction { payload } => {
            assert_eq!(payload.kind, ActionKind::Play);
            assert_eq!(payload.track.id, "X");
            assert!((payload.track_time_seconds - 10.0).abs() < f64::EPSILON);
        }
        other => panic!("unexpected message: {other:?}"),
    }
}

#[tokio::test]
async fn test_listening_along_suppresses_broadcasts() {
    let (tx, mut rx) = mpsc::channel(8);
    let mut broadcaster = PlaybackBroadcaster::new(tx);

    broadcaster.set_listening_along(true);
    assert!(broadcaster.is_suppressed());
    assert!(!broadcaster.announce_pause(TrackRef::new("X"), 3.0));
    assert!(rx.try_recv().is_err());

    // Suppression lifts when the session ends.
    broadcaster.set_listening_along(false);
    assert!(broadcaster.announce_pause(TrackRef::new("X"), 3.0));
    assert!(rx.try_recv().is_ok());
}

#[tokio::test]
async fn test_seek_preserves_play_state() {
    let (tx, mut rx) = mpsc::channel(8);
    let broadcaster = PlaybackBroadcaster::new(tx);

    broadcaster.announce_seek(TrackRef::new("X"), 30.0, true);
    broadcaster.announce_seek(TrackRef::new("X"), 45.0, false);

    let kinds: Vec<ActionKind> = [rx.recv().await.unwrap(), rx.recv().await.unwrap()]
        .into_iter()
        .map(|m| match m {
            ClientMessage::BroadcastAction { payload } => payload.kind,
            other => panic!("unexpected message: {other:?}"),
        })
        .collect();

    assert_eq!(kinds, vec![ActionKind::Play, ActionKind::Pause]);
}

#[tokio::test]
async fn test_broadcast_dropped_when_transport_gone() {
    let (tx, rx) = mpsc::channel(8);
    drop(rx);
    let broadcaster = PlaybackBroadcaster::new(tx);

    // Fails open: no panic, no error surfaced.
    assert!(!broadcaster.announce_play(TrackRef::new("X"), 0.0));
}
