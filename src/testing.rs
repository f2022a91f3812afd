//! Testing utilities.
//!
//! Deterministic stand-ins for the wall clock, the media surface, and the
//! sync transport, shared between unit tests and downstream consumers.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::clock::WallClock;
use crate::error::{ListenAlongError, Result};
use crate::media::MediaSurface;
use crate::sync::{SyncTransport, TimingReply};
use crate::types::TrackRef;

/// A wall clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: Mutex<f64>,
}

impl ManualClock {
    /// Create a clock starting at the given epoch-milliseconds value.
    #[must_use]
    pub fn starting_at(now_ms: f64) -> Arc<Self> {
        Arc::new(Self {
            now_ms: Mutex::new(now_ms),
        })
    }

    /// Advance the clock.
    pub fn advance(&self, delta_ms: f64) {
        *self.now_ms.lock().unwrap() += delta_ms;
    }

    /// Set the clock to an absolute value.
    pub fn set(&self, now_ms: f64) {
        *self.now_ms.lock().unwrap() = now_ms;
    }
}

impl WallClock for ManualClock {
    fn now_ms(&self) -> f64 {
        *self.now_ms.lock().unwrap()
    }
}

/// One observable effect applied to a [`MockMediaSurface`].
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    /// A new source was loaded
    Loaded(TrackRef),
    /// Playback position was moved
    Seeked(f64),
    /// Playback started
    Played,
    /// Playback paused
    Paused,
}

/// A media surface that records every call made against it.
#[derive(Debug, Default)]
pub struct MockMediaSurface {
    loaded: Mutex<Option<TrackRef>>,
    position: Mutex<f64>,
    events: Mutex<Vec<MediaEvent>>,
    load_delay: Mutex<Duration>,
    applied: tokio::sync::Notify,
}

impl MockMediaSurface {
    /// Create an empty surface with no track loaded.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Create a surface with a track already loaded.
    #[must_use]
    pub fn with_track(track: TrackRef) -> Arc<Self> {
        let surface = Self::default();
        *surface.loaded.lock().unwrap() = Some(track);
        Arc::new(surface)
    }

    /// Make `load` take this long before reporting ready.
    pub fn set_load_delay(&self, delay: Duration) {
        *self.load_delay.lock().unwrap() = delay;
    }

    /// Everything that has been applied, in order.
    #[must_use]
    pub fn events(&self) -> Vec<MediaEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Wait until a play or pause has been applied.
    pub async fn wait_applied(&self) {
        self.applied.notified().await;
    }

    fn record(&self, event: MediaEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl MediaSurface for MockMediaSurface {
    fn current_track(&self) -> Option<TrackRef> {
        self.loaded.lock().unwrap().clone()
    }

    fn current_time(&self) -> f64 {
        *self.position.lock().unwrap()
    }

    async fn load(&self, track: &TrackRef) {
        let delay = *self.load_delay.lock().unwrap();
        if delay > Duration::ZERO {
            tokio::time::sleep(delay).await;
        }
        *self.loaded.lock().unwrap() = Some(track.clone());
        self.record(MediaEvent::Loaded(track.clone()));
    }

    fn seek(&self, position_secs: f64) {
        *self.position.lock().unwrap() = position_secs;
        self.record(MediaEvent::Seeked(position_secs));
    }

    fn play(&self) {
        self.record(MediaEvent::Played);
        self.applied.notify_one();
    }

    fn pause(&self) {
        self.record(MediaEvent::Paused);
        self.applied.notify_one();
    }
}

/// A [`SyncTransport`] over plain channel halves.
///
/// The test (or harness task) holding the other ends sees every `T0`
/// sent and decides what replies come back, with no timing model at all.
pub struct ChannelTransport {
    requests: tokio::sync::mpsc::Sender<f64>,
    replies: tokio::sync::mpsc::Receiver<TimingReply>,
}

impl ChannelTransport {
    /// Create a transport plus the harness-side channel ends.
    #[must_use]
    pub fn pair() -> (
        Self,
        tokio::sync::mpsc::Receiver<f64>,
        tokio::sync::mpsc::Sender<TimingReply>,
    ) {
        let (req_tx, req_rx) = tokio::sync::mpsc::channel(16);
        let (rep_tx, rep_rx) = tokio::sync::mpsc::channel(16);
        (
            Self {
                requests: req_tx,
                replies: rep_rx,
            },
            req_rx,
            rep_tx,
        )
    }
}

#[async_trait]
impl SyncTransport for ChannelTransport {
    fn is_connected(&self) -> bool {
        !self.requests.is_closed()
    }

    async fn send_request(&mut self, t0: f64) -> Result<()> {
        self.requests
            .send(t0)
            .await
            .map_err(|_| ListenAlongError::TransportUnavailable {
                operation: "NTP_REQUEST".to_string(),
            })
    }

    async fn recv_reply(&mut self) -> Option<TimingReply> {
        self.replies.recv().await
    }
}

/// A sync transport simulating a relay with configurable one-way delays
/// and a constant clock skew, driven off a [`ManualClock`].
///
/// Deterministic: each `recv_reply` advances the clock by the uplink
/// delay, timestamps with the skewed relay clock, then advances by the
/// downlink delay, so the caller's `T3` read lands after the full trip.
pub struct SimulatedRelayTransport {
    clock: Arc<ManualClock>,
    uplink_ms: f64,
    downlink_ms: f64,
    skew_ms: f64,
    connected: bool,
    pending_t0: Option<f64>,
    /// Replies remaining before the transport reports closed
    /// (`None` = unlimited).
    replies_left: Option<usize>,
}

impl SimulatedRelayTransport {
    /// Create a transport with symmetric one-way delay and a clock skew.
    #[must_use]
    pub fn new(clock: Arc<ManualClock>, one_way_delay_ms: f64, skew_ms: f64) -> Self {
        Self {
            clock,
            uplink_ms: one_way_delay_ms,
            downlink_ms: one_way_delay_ms,
            skew_ms,
            connected: true,
            pending_t0: None,
            replies_left: None,
        }
    }

    /// Use different uplink and downlink delays (asymmetric route).
    #[must_use]
    pub fn with_asymmetric_delay(mut self, uplink_ms: f64, downlink_ms: f64) -> Self {
        self.uplink_ms = uplink_ms;
        self.downlink_ms = downlink_ms;
        self
    }

    /// Report closed after this many replies.
    #[must_use]
    pub fn closing_after(mut self, replies: usize) -> Self {
        self.replies_left = Some(replies);
        self
    }

    /// Start in the disconnected state.
    #[must_use]
    pub fn disconnected(mut self) -> Self {
        self.connected = false;
        self
    }
}

#[async_trait]
impl SyncTransport for SimulatedRelayTransport {
    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn send_request(&mut self, t0: f64) -> Result<()> {
        if !self.connected {
            return Err(ListenAlongError::TransportUnavailable {
                operation: "NTP_REQUEST".to_string(),
            });
        }
        self.pending_t0 = Some(t0);
        Ok(())
    }

    async fn recv_reply(&mut self) -> Option<TimingReply> {
        if let Some(left) = self.replies_left.as_mut() {
            if *left == 0 {
                self.connected = false;
                return None;
            }
            *left -= 1;
        }
        let t0 = self.pending_t0.take()?;

        self.clock.advance(self.uplink_ms);
        let t1 = self.clock.now_ms() + self.skew_ms;
        let t2 = t1;
        self.clock.advance(self.downlink_ms);

        Some(TimingReply { t0, t1, t2 })
    }
}
