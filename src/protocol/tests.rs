use super::*;
use crate::types::{PlaybackAction, ScheduledAction, TrackRef, UserId};

// ===== Client messages =====

#[test]
fn test_authenticate_frame() {
    let msg = ClientMessage::Authenticate {
        token: "jwt-abc".to_string(),
    };
    let json: serde_json::Value = serde_json::from_str(&msg.to_frame().unwrap()).unwrap();

    assert_eq!(json["type"], "authenticate");
    assert_eq!(json["token"], "jwt-abc");
}

#[test]
fn test_ntp_request_uses_uppercase_t0() {
    let msg = ClientMessage::NtpRequest { t0: 1234.5 };
    let json: serde_json::Value = serde_json::from_str(&msg.to_frame().unwrap()).unwrap();

    assert_eq!(json["type"], "NTP_REQUEST");
    assert_eq!(json["T0"], 1234.5);
}

#[test]
fn test_start_listening_frame() {
    let frame = r#"{"type":"START_LISTENING","targetUserId":"user-7"}"#;
    let msg = ClientMessage::from_frame(frame).unwrap();

    assert_eq!(
        msg,
        ClientMessage::StartListening {
            target_user_id: UserId::new("user-7"),
        }
    );
}

#[test]
fn test_stop_listening_has_no_payload() {
    let msg = ClientMessage::StopListening;
    assert_eq!(msg.to_frame().unwrap(), r#"{"type":"STOP_LISTENING"}"#);
}

#[test]
fn test_broadcast_action_frame() {
    let frame = r#"{
        "type": "BROADCAST_ACTION",
        "payload": {"type": "play", "track": {"id": "X"}, "trackTimeSeconds": 10.0}
    }"#;
    let msg = ClientMessage::from_frame(frame).unwrap();

    match msg {
        ClientMessage::BroadcastAction { payload } => {
            assert_eq!(payload.track.id, "X");
            assert!((payload.track_time_seconds - 10.0).abs() < f64::EPSILON);
        }
        other => panic!("unexpected message: {other:?}"),
    }
}

// ===== Server messages =====

#[test]
fn test_ntp_response_roundtrip() {
    let msg = ServerMessage::NtpResponse {
        t0: 1.0,
        t1: 2.0,
        t2: 3.0,
    };
    let json: serde_json::Value = serde_json::from_str(&msg.to_frame().unwrap()).unwrap();

    assert_eq!(json["type"], "NTP_RESPONSE");
    assert_eq!(json["T0"], 1.0);
    assert_eq!(json["T1"], 2.0);
    assert_eq!(json["T2"], 3.0);

    let parsed = ServerMessage::from_frame(&msg.to_frame().unwrap()).unwrap();
    assert_eq!(parsed, msg);
}

#[test]
fn test_scheduled_action_flattens_fields() {
    let msg = ServerMessage::ScheduledAction(ScheduledAction {
        action: PlaybackAction::play(TrackRef::new("X"), 10.0),
        server_time_to_execute: 1250.0,
    });
    let json: serde_json::Value = serde_json::from_str(&msg.to_frame().unwrap()).unwrap();

    assert_eq!(json["type"], "SCHEDULED_ACTION");
    assert_eq!(json["serverTimeToExecute"], 1250.0);
    assert_eq!(json["action"]["type"], "play");
}

// ===== Robustness =====

#[test]
fn test_unknown_type_is_an_error_not_a_panic() {
    assert!(ClientMessage::from_frame(r#"{"type":"DANCE"}"#).is_err());
    assert!(ServerMessage::from_frame("not json at all").is_err());
}
