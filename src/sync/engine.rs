//! Clock offset estimation.
//!
//! Implements the two-way clock-offset estimator over repeated
//! four-timestamp exchanges with the relay. The estimator cancels
//! symmetric network delay to first order; asymmetric routes bias the
//! offset by half the delay asymmetry. That bias is a known limitation
//! of the exchange, not something this engine attempts to correct.

use std::collections::VecDeque;

use crate::types::{ClockSample, SyncConfig};

/// Convergence state of the engine.
///
/// Modeled as an explicit tagged union so the stop-after-N and
/// completion-signal logic is auditable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SyncState {
    /// No sync run in progress.
    Idle,
    /// Collecting samples.
    Syncing {
        /// Exchanges completed in the current run.
        iterations: usize,
    },
    /// Target sample count reached.
    Converged {
        /// Final mean offset at convergence, in milliseconds.
        offset_ms: f64,
    },
}

/// Clock synchronization engine.
///
/// Maintains a bounded rolling window of [`ClockSample`]s and publishes
/// the running mean offset after every sample, so a consumer may observe
/// the estimate mid-convergence. Owned exclusively by one client.
#[derive(Debug)]
pub struct SyncClock {
    /// Recent samples, oldest first.
    window: VecDeque<ClockSample>,
    /// Configuration (window size, target sample count).
    config: SyncConfig,
    /// Current state.
    state: SyncState,
    /// Running mean offset (relay clock minus local clock) in milliseconds.
    avg_offset_ms: f64,
}

impl SyncClock {
    /// Create a new engine in the idle state.
    #[must_use]
    pub fn new(config: SyncConfig) -> Self {
        Self {
            window: VecDeque::with_capacity(config.window_size),
            config,
            state: SyncState::Idle,
            avg_offset_ms: 0.0,
        }
    }

    /// Compute one sample from a four-timestamp exchange.
    ///
    /// - `T0`: client send time
    /// - `T1`: relay receipt time
    /// - `T2`: relay send time
    /// - `T3`: client receipt time
    ///
    /// `rtt = (T3 - T0) - (T2 - T1)` subtracts relay processing time;
    /// `offset = ((T1 - T0) + (T2 - T3)) / 2` is (relay − local).
    #[must_use]
    pub fn sample_from_exchange(t0: f64, t1: f64, t2: f64, t3: f64) -> ClockSample {
        ClockSample {
            round_trip_ms: (t3 - t0) - (t2 - t1),
            offset_ms: ((t1 - t0) + (t2 - t3)) / 2.0,
        }
    }

    /// Start a new sync run, discarding the previous run's accounting.
    pub fn begin(&mut self) {
        self.window.clear();
        self.avg_offset_ms = 0.0;
        self.state = SyncState::Syncing { iterations: 0 };
    }

    /// Record one completed exchange.
    ///
    /// Pushes the sample into the rolling window (evicting the oldest
    /// beyond the window size), recomputes the mean, and transitions to
    /// `Converged` once the target sample count is reached. Returns the
    /// sample that was recorded.
    pub fn record_exchange(&mut self, t0: f64, t1: f64, t2: f64, t3: f64) -> ClockSample {
        let sample = Self::sample_from_exchange(t0, t1, t2, t3);

        self.window.push_back(sample);
        while self.window.len() > self.config.window_size {
            self.window.pop_front();
        }
        self.update_mean();

        let iterations = match self.state {
            SyncState::Syncing { iterations } => iterations + 1,
            // Samples arriving outside a run still refine the estimate.
            SyncState::Idle | SyncState::Converged { .. } => {
                return sample;
            }
        };

        if iterations >= self.config.target_samples {
            self.state = SyncState::Converged {
                offset_ms: self.avg_offset_ms,
            };
            tracing::info!(
                offset_ms = self.avg_offset_ms,
                samples = self.window.len(),
                "clock sync converged"
            );
        } else {
            self.state = SyncState::Syncing { iterations };
        }

        sample
    }

    /// Mean offset is always over the current window, never one sample.
    fn update_mean(&mut self) {
        if self.window.is_empty() {
            self.avg_offset_ms = 0.0;
            return;
        }
        #[allow(clippy::cast_precision_loss)]
        let len = self.window.len() as f64;
        self.avg_offset_ms = self.window.iter().map(|s| s.offset_ms).sum::<f64>() / len;
    }

    /// Current best estimate of (relay clock − local clock) in milliseconds.
    #[must_use]
    pub fn offset_ms(&self) -> f64 {
        self.avg_offset_ms
    }

    /// Translate a relay-clock timestamp into the local clock frame.
    #[must_use]
    pub fn relay_to_local_ms(&self, relay_ms: f64) -> f64 {
        relay_ms - self.avg_offset_ms
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Whether the current run has reached its target sample count.
    #[must_use]
    pub fn is_converged(&self) -> bool {
        matches!(self.state, SyncState::Converged { .. })
    }

    /// Number of samples currently in the window.
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.window.len()
    }

    /// Most recent round-trip time, if any sample exists.
    #[must_use]
    pub fn last_rtt_ms(&self) -> Option<f64> {
        self.window.back().map(|s| s.round_trip_ms)
    }

    /// The configured target sample count for a run.
    #[must_use]
    pub fn target_samples(&self) -> usize {
        self.config.target_samples
    }

    /// Reset to idle, clearing all samples.
    pub fn reset(&mut self) {
        self.window.clear();
        self.avg_offset_ms = 0.0;
        self.state = SyncState::Idle;
    }
}

impl Default for SyncClock {
    fn default() -> Self {
        Self::new(SyncConfig::default())
    }
}
