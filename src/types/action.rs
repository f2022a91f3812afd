use serde::{Deserialize, Serialize};

use super::track::TrackRef;

/// What a playback action does to the media surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// Start or resume playback
    Play,
    /// Pause playback
    Pause,
}

/// A playback state change: what should happen and where in the audio.
///
/// Produced by a broadcaster when its local playback state changes; the
/// same shape is stored as a client's last known state for late joiners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackAction {
    /// Play or pause
    #[serde(rename = "type")]
    pub kind: ActionKind,

    /// The track the action applies to
    pub track: TrackRef,

    /// In-track position in seconds at the moment the action fires
    #[serde(rename = "trackTimeSeconds")]
    pub track_time_seconds: f64,
}

impl PlaybackAction {
    /// Create a play action
    #[must_use]
    pub fn play(track: TrackRef, position_secs: f64) -> Self {
        Self {
            kind: ActionKind::Play,
            track,
            track_time_seconds: position_secs,
        }
    }

    /// Create a pause action
    #[must_use]
    pub fn pause(track: TrackRef, position_secs: f64) -> Self {
        Self {
            kind: ActionKind::Pause,
            track,
            track_time_seconds: position_secs,
        }
    }
}

/// A [`PlaybackAction`] annotated with the absolute relay-clock instant at
/// which every listener must apply it.
///
/// Created by the relay at broadcast time, consumed once by each listener.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledAction {
    /// The action to apply
    pub action: PlaybackAction,

    /// Execution deadline on the relay's clock, in epoch milliseconds
    #[serde(rename = "serverTimeToExecute")]
    pub server_time_to_execute: f64,
}

/// One measurement from a single timing exchange.
///
/// Ephemeral; retained only in the sync engine's bounded rolling window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockSample {
    /// Estimated relay-minus-local clock offset in milliseconds
    pub offset_ms: f64,
    /// Round-trip time with relay processing subtracted, in milliseconds
    pub round_trip_ms: f64,
}
