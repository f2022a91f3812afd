//! The client side of listen-along.
//!
//! [`RelayClient`] owns one WebSocket connection to the relay and wires
//! the other halves of the crate together:
//!
//! ```text
//!                    ┌──────────────┐
//!   NTP_RESPONSE ──▶ │  SyncRunner  │ ──▶ shared offset estimate
//!                    └──────────────┘          │
//!                    ┌──────────────┐          ▼
//! SCHEDULED_ACTION ─▶│ActionSchedule│ ──▶ media surface
//!                    └──────────────┘
//!                    ┌──────────────┐
//!   play/pause/seek ─│ Broadcaster  │ ──▶ BROADCAST_ACTION
//!                    └──────────────┘
//! ```
//!
//! All receive-path work happens on a background reader task; the client
//! handle itself only enqueues outgoing messages and flips session state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::clock::{SharedClock, system_clock};
use crate::error::{ListenAlongError, Result};
use crate::media::MediaSurface;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::schedule::{ActionScheduler, PlaybackBroadcaster};
use crate::sync::{
    SharedSyncClock, SyncRunner, SyncTransport, TimingReply, shared_sync_clock,
};
use crate::types::{PlaybackAction, SyncConfig, TrackRef, UserId};

/// Outgoing queue depth. Traffic is a handful of small frames per user
/// gesture, so a shallow queue is plenty.
const OUTGOING_QUEUE: usize = 64;

/// Timing replies buffered between the reader task and a sync run.
const TIMING_QUEUE: usize = 8;

/// A connected listen-along client.
pub struct RelayClient {
    outgoing: mpsc::Sender<ClientMessage>,
    ntp_rx: Option<mpsc::Receiver<TimingReply>>,
    estimate: SharedSyncClock,
    scheduler: Arc<Mutex<ActionScheduler>>,
    broadcaster: PlaybackBroadcaster,
    wall_clock: SharedClock,
    sync_config: SyncConfig,
    connected: Arc<AtomicBool>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl RelayClient {
    /// Connect to a relay, authenticate, and start the background tasks.
    ///
    /// The relay does not acknowledge authentication; a rejected token
    /// surfaces as the connection closing shortly after.
    ///
    /// # Errors
    /// Returns an error if the WebSocket handshake fails or the
    /// connection drops before the credential is queued.
    pub async fn connect(url: &str, token: &str, media: Arc<dyn MediaSurface>) -> Result<Self> {
        Self::connect_with(url, token, media, SyncConfig::default(), system_clock()).await
    }

    /// Connect with explicit sync configuration and wall clock.
    ///
    /// # Errors
    /// Same failure modes as [`RelayClient::connect`].
    pub async fn connect_with(
        url: &str,
        token: &str,
        media: Arc<dyn MediaSurface>,
        sync_config: SyncConfig,
        wall_clock: SharedClock,
    ) -> Result<Self> {
        let (ws, _response) = connect_async(url).await?;
        let (mut ws_tx, mut ws_rx) = ws.split();
        tracing::info!(url, "connected to relay");

        let (out_tx, mut out_rx) = mpsc::channel::<ClientMessage>(OUTGOING_QUEUE);
        let (ntp_tx, ntp_rx) = mpsc::channel::<TimingReply>(TIMING_QUEUE);

        let connected = Arc::new(AtomicBool::new(true));
        let estimate = shared_sync_clock(sync_config.clone());
        let scheduler = Arc::new(Mutex::new(ActionScheduler::new(
            media,
            Arc::clone(&wall_clock),
        )));

        let writer = {
            let connected = Arc::clone(&connected);
            tokio::spawn(async move {
                while let Some(msg) = out_rx.recv().await {
                    let frame = match msg.to_frame() {
                        Ok(frame) => frame,
                        Err(e) => {
                            tracing::warn!("failed to encode outgoing frame: {e}");
                            continue;
                        }
                    };
                    if ws_tx.send(Message::Text(frame)).await.is_err() {
                        break;
                    }
                }
                connected.store(false, Ordering::SeqCst);
            })
        };

        let reader = {
            let connected = Arc::clone(&connected);
            let estimate = Arc::clone(&estimate);
            let scheduler = Arc::clone(&scheduler);
            tokio::spawn(async move {
                while let Some(frame) = ws_rx.next().await {
                    let text = match frame {
                        Ok(Message::Text(text)) => text,
                        Ok(Message::Close(_)) => break,
                        Ok(_) => continue,
                        Err(e) => {
                            tracing::debug!("websocket read error: {e}");
                            break;
                        }
                    };
                    match ServerMessage::from_frame(&text) {
                        Ok(ServerMessage::NtpResponse { t0, t1, t2 }) => {
                            // Dropped when no sync run is consuming; stale
                            // replies must not poison the next run.
                            let _ = ntp_tx.try_send(TimingReply { t0, t1, t2 });
                        }
                        Ok(ServerMessage::ScheduledAction(scheduled)) => {
                            let offset_ms = estimate.read().await.offset_ms();
                            scheduler.lock().await.schedule(scheduled, offset_ms);
                        }
                        Err(e) => {
                            tracing::warn!("ignoring malformed frame: {e}");
                        }
                    }
                }
                tracing::info!("relay connection closed");
                connected.store(false, Ordering::SeqCst);
            })
        };

        out_tx
            .send(ClientMessage::Authenticate {
                token: token.to_string(),
            })
            .await
            .map_err(|_| ListenAlongError::ConnectionClosed)?;

        Ok(Self {
            broadcaster: PlaybackBroadcaster::new(out_tx.clone()),
            outgoing: out_tx,
            ntp_rx: Some(ntp_rx),
            estimate,
            scheduler,
            wall_clock,
            sync_config,
            connected,
            reader,
            writer,
        })
    }

    /// Whether the connection is still open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && !self.outgoing.is_closed()
    }

    /// Run one full clock synchronization and return the mean offset.
    ///
    /// Exchanges run back-to-back until the configured sample count is
    /// reached. Fails open like the underlying runner: a dead connection
    /// or a mid-run drop resolves with the best estimate so far (0 when
    /// there is none) rather than erroring.
    pub async fn start_sync(&mut self) -> f64 {
        let Some(replies) = self.ntp_rx.take() else {
            tracing::warn!("clock sync already in progress");
            return self.offset_ms().await;
        };

        let transport = WsSyncTransport {
            outgoing: self.outgoing.clone(),
            replies,
            connected: Arc::clone(&self.connected),
        };
        let mut runner = SyncRunner::new(
            transport,
            Arc::clone(&self.wall_clock),
            Arc::clone(&self.estimate),
            &self.sync_config,
        );
        let offset = runner.run().await;
        self.ntp_rx = Some(runner.into_transport().replies);
        offset
    }

    /// Current mean clock offset (relay minus local) in milliseconds.
    pub async fn offset_ms(&self) -> f64 {
        self.estimate.read().await.offset_ms()
    }

    /// Shared handle to the offset estimate, for observers.
    #[must_use]
    pub fn estimate(&self) -> SharedSyncClock {
        Arc::clone(&self.estimate)
    }

    /// Start listening along to `target`.
    ///
    /// Suppresses this client's own broadcasts for the duration and
    /// discards any action still pending from a previous session.
    ///
    /// # Errors
    /// Returns an error if the connection has gone away.
    pub async fn start_listening(&mut self, target: UserId) -> Result<()> {
        self.scheduler.lock().await.cancel();
        self.broadcaster.set_listening_along(true);
        self.outgoing
            .send(ClientMessage::StartListening {
                target_user_id: target,
            })
            .await
            .map_err(|_| ListenAlongError::ConnectionClosed)
    }

    /// Stop listening along and resume broadcasting.
    ///
    /// Any not-yet-fired action from the session is cancelled; local
    /// playback stays wherever the session left it.
    ///
    /// # Errors
    /// Returns an error if the connection has gone away.
    pub async fn stop_listening(&mut self) -> Result<()> {
        self.scheduler.lock().await.cancel();
        self.broadcaster.set_listening_along(false);
        self.outgoing
            .send(ClientMessage::StopListening)
            .await
            .map_err(|_| ListenAlongError::ConnectionClosed)
    }

    /// Whether this client is currently in a listen-along session.
    #[must_use]
    pub fn is_listening_along(&self) -> bool {
        self.broadcaster.is_suppressed()
    }

    /// Announce an arbitrary playback state change.
    ///
    /// Returns whether the message was handed to the transport; see
    /// [`PlaybackBroadcaster::announce`] for the suppression rules.
    pub fn announce(&self, action: PlaybackAction) -> bool {
        self.broadcaster.announce(action)
    }

    /// Announce that playback (re)started at `position_secs`.
    pub fn announce_play(&self, track: TrackRef, position_secs: f64) -> bool {
        self.broadcaster.announce_play(track, position_secs)
    }

    /// Announce that playback paused at `position_secs`.
    pub fn announce_pause(&self, track: TrackRef, position_secs: f64) -> bool {
        self.broadcaster.announce_pause(track, position_secs)
    }

    /// Announce a seek, preserving the current play/pause state.
    pub fn announce_seek(&self, track: TrackRef, position_secs: f64, playing: bool) -> bool {
        self.broadcaster.announce_seek(track, position_secs, playing)
    }

    /// Tear the connection down and stop the background tasks.
    pub async fn close(&mut self) {
        self.scheduler.lock().await.cancel();
        self.connected.store(false, Ordering::SeqCst);
        self.reader.abort();
        self.writer.abort();
    }
}

impl Drop for RelayClient {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}

/// [`SyncTransport`] over the client's WebSocket connection.
///
/// Borrows the outgoing queue and owns the timing-reply receiver for the
/// duration of one sync run.
struct WsSyncTransport {
    outgoing: mpsc::Sender<ClientMessage>,
    replies: mpsc::Receiver<TimingReply>,
    connected: Arc<AtomicBool>,
}

#[async_trait]
impl SyncTransport for WsSyncTransport {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && !self.outgoing.is_closed()
    }

    async fn send_request(&mut self, t0: f64) -> Result<()> {
        self.outgoing
            .send(ClientMessage::NtpRequest { t0 })
            .await
            .map_err(|_| ListenAlongError::TransportUnavailable {
                operation: "NTP_REQUEST".to_string(),
            })
    }

    async fn recv_reply(&mut self) -> Option<TimingReply> {
        self.replies.recv().await
    }
}
