//! Wire message definitions.
//!
//! Messages are JSON text frames over a persistent WebSocket connection.
//! The `type` field selects the handler; all other fields are payload.
//! Field names are fixed by the deployed web clients and must not change.

use serde::{Deserialize, Serialize};

use crate::types::{PlaybackAction, ScheduledAction, UserId};

/// Messages sent from a client to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Bind this connection to a verified client identity
    #[serde(rename = "authenticate")]
    Authenticate {
        /// Opaque credential, verified by the relay's user directory
        token: String,
    },

    /// Begin one timing exchange
    #[serde(rename = "NTP_REQUEST")]
    NtpRequest {
        /// Client send time in epoch milliseconds
        #[serde(rename = "T0")]
        t0: f64,
    },

    /// Announce a playback state change to be fanned out to listeners
    #[serde(rename = "BROADCAST_ACTION")]
    BroadcastAction {
        /// The state change
        payload: PlaybackAction,
    },

    /// Begin following a broadcaster
    #[serde(rename = "START_LISTENING")]
    StartListening {
        /// The broadcaster to follow
        #[serde(rename = "targetUserId")]
        target_user_id: UserId,
    },

    /// Stop following
    #[serde(rename = "STOP_LISTENING")]
    StopListening,
}

/// Messages sent from the relay to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Timing exchange reply
    #[serde(rename = "NTP_RESPONSE")]
    NtpResponse {
        /// Client send time, echoed from the request
        #[serde(rename = "T0")]
        t0: f64,
        /// Relay receipt time
        #[serde(rename = "T1")]
        t1: f64,
        /// Relay send time
        #[serde(rename = "T2")]
        t2: f64,
    },

    /// Deliver a deadline-bearing action to a listener
    #[serde(rename = "SCHEDULED_ACTION")]
    ScheduledAction(ScheduledAction),
}

impl ClientMessage {
    /// Serialize to a JSON text frame.
    ///
    /// # Errors
    /// Returns an error if serialization fails (should not happen for
    /// well-formed messages).
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse from a JSON text frame.
    ///
    /// # Errors
    /// Returns an error if the frame is not a known client message.
    pub fn from_frame(frame: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(frame)
    }
}

impl ServerMessage {
    /// Serialize to a JSON text frame.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse from a JSON text frame.
    ///
    /// # Errors
    /// Returns an error if the frame is not a known server message.
    pub fn from_frame(frame: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(frame)
    }
}
