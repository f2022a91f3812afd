//! Async driver for the clock synchronization engine.
//!
//! Fires timing exchanges back-to-back over a [`SyncTransport`] until the
//! target sample count is reached. The relay replies to each request
//! before the client sends the next, so replies are consumed in strict
//! send order and no sequence numbers are needed; an implementation that
//! sends concurrently must add them.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::engine::SyncClock;
use crate::clock::SharedClock;
use crate::error::Result;
use crate::types::SyncConfig;

/// Shared sync engine state, accessible from multiple tasks.
pub type SharedSyncClock = Arc<RwLock<SyncClock>>;

/// Create a shared sync engine instance.
#[must_use]
pub fn shared_sync_clock(config: SyncConfig) -> SharedSyncClock {
    Arc::new(RwLock::new(SyncClock::new(config)))
}

/// One timing reply from the relay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingReply {
    /// Client send time, echoed
    pub t0: f64,
    /// Relay receipt time
    pub t1: f64,
    /// Relay send time
    pub t2: f64,
}

/// Transport over which timing exchanges run.
///
/// Implemented by the relay client's WebSocket wiring; tests use an
/// in-memory channel transport.
#[async_trait]
pub trait SyncTransport: Send {
    /// Whether the underlying connection is currently open.
    fn is_connected(&self) -> bool;

    /// Send one timing request carrying the client send time `T0`.
    ///
    /// # Errors
    /// Returns an error if the connection has gone away.
    async fn send_request(&mut self, t0: f64) -> Result<()>;

    /// Wait for the next timing reply. `None` means the transport closed.
    async fn recv_reply(&mut self) -> Option<TimingReply>;
}

/// Drives one `startSync()` run to completion.
pub struct SyncRunner<T: SyncTransport> {
    transport: T,
    wall_clock: SharedClock,
    estimate: SharedSyncClock,
    exchange_timeout: Duration,
}

impl<T: SyncTransport> SyncRunner<T> {
    /// Create a runner publishing into the given shared engine.
    pub fn new(
        transport: T,
        wall_clock: SharedClock,
        estimate: SharedSyncClock,
        config: &SyncConfig,
    ) -> Self {
        Self {
            transport,
            wall_clock,
            estimate,
            exchange_timeout: config.exchange_timeout,
        }
    }

    /// Recover the transport once the run is over.
    ///
    /// Lets a caller that lent channel halves to the transport take them
    /// back for the next run.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Run exchanges until the engine converges.
    ///
    /// Resolves with the final mean offset in milliseconds. Fails open:
    /// a transport that is not connected resolves immediately with 0; a
    /// transport that drops (or times out) mid-run resolves with
    /// whatever mean was last computed. Synchronized playback degrades
    /// to best effort, it never blocks.
    pub async fn run(&mut self) -> f64 {
        if !self.transport.is_connected() {
            tracing::warn!("cannot start clock sync: transport not connected");
            return 0.0;
        }

        let run_started = self.wall_clock.now_ms();
        self.estimate.write().await.begin();

        'run: loop {
            let t0 = self.wall_clock.now_ms();
            if let Err(e) = self.transport.send_request(t0).await {
                tracing::warn!("clock sync send failed mid-run: {e}");
                break;
            }

            loop {
                match tokio::time::timeout(self.exchange_timeout, self.transport.recv_reply())
                    .await
                {
                    Ok(Some(reply)) => {
                        // A reply echoing a T0 from before this run is a
                        // leftover from an earlier run that ended on a
                        // timeout. Pairing it with a fresh T3 would smear
                        // the whole inter-run gap into the sample, and
                        // shift every later reply off by one.
                        if reply.t0 < run_started {
                            tracing::debug!(
                                stale_t0 = reply.t0,
                                "discarding timing reply from an earlier run"
                            );
                            continue;
                        }
                        let t3 = self.wall_clock.now_ms();
                        let mut estimate = self.estimate.write().await;
                        // Replies arrive in send order; trust the echoed T0.
                        let sample = estimate.record_exchange(reply.t0, reply.t1, reply.t2, t3);
                        tracing::debug!(
                            offset_ms = sample.offset_ms,
                            rtt_ms = sample.round_trip_ms,
                            samples = estimate.sample_count(),
                            "timing exchange complete"
                        );
                        if estimate.is_converged() {
                            return estimate.offset_ms();
                        }
                        continue 'run;
                    }
                    Ok(None) => {
                        tracing::warn!("transport closed mid-sync, resolving with current estimate");
                        break 'run;
                    }
                    Err(_) => {
                        tracing::warn!(
                            timeout = ?self.exchange_timeout,
                            "timing reply timed out, resolving with current estimate"
                        );
                        break 'run;
                    }
                }
            }
        }

        self.estimate.read().await.offset_ms()
    }
}
