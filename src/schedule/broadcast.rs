//! Broadcaster-side action emission.
//!
//! Whenever the local playback state changes (play, pause, or seek), a
//! `BROADCAST_ACTION` carrying the track identity and exact in-track
//! position goes out to the relay. A client that is itself listening
//! along suppresses outgoing broadcasts entirely: a listener is never
//! simultaneously a broadcaster of the same session, so there are no
//! relay chains.

use tokio::sync::mpsc;

use crate::protocol::ClientMessage;
use crate::types::{PlaybackAction, TrackRef};

/// Emits playback state changes to the relay.
pub struct PlaybackBroadcaster {
    outgoing: mpsc::Sender<ClientMessage>,
    listening_along: bool,
}

impl PlaybackBroadcaster {
    /// Create a broadcaster writing to the connection's outgoing queue.
    #[must_use]
    pub fn new(outgoing: mpsc::Sender<ClientMessage>) -> Self {
        Self {
            outgoing,
            listening_along: false,
        }
    }

    /// Mark whether this client is currently listening along.
    pub fn set_listening_along(&mut self, listening: bool) {
        self.listening_along = listening;
    }

    /// Whether outgoing broadcasts are currently suppressed.
    #[must_use]
    pub fn is_suppressed(&self) -> bool {
        self.listening_along
    }

    /// Announce a playback state change.
    ///
    /// Returns whether the message was handed to the transport. Fails
    /// open: a suppressed or disconnected broadcast is dropped silently,
    /// there is nothing useful to recover.
    pub fn announce(&self, action: PlaybackAction) -> bool {
        if self.listening_along {
            tracing::debug!("suppressing broadcast while listening along");
            return false;
        }
        match self
            .outgoing
            .try_send(ClientMessage::BroadcastAction { payload: action })
        {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!("broadcast dropped, transport unavailable: {e}");
                false
            }
        }
    }

    /// Announce that playback (re)started at `position_secs`.
    pub fn announce_play(&self, track: TrackRef, position_secs: f64) -> bool {
        self.announce(PlaybackAction::play(track, position_secs))
    }

    /// Announce that playback paused at `position_secs`.
    pub fn announce_pause(&self, track: TrackRef, position_secs: f64) -> bool {
        self.announce(PlaybackAction::pause(track, position_secs))
    }

    /// Announce a seek, preserving the current play/pause state.
    pub fn announce_seek(&self, track: TrackRef, position_secs: f64, playing: bool) -> bool {
        if playing {
            self.announce_play(track, position_secs)
        } else {
            self.announce_pause(track, position_secs)
        }
    }
}
