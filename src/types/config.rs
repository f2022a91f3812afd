use std::time::Duration;

/// Configuration for the clock synchronization engine
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Number of timing exchanges to run before the sync completes
    /// (default: 40)
    pub target_samples: usize,

    /// Maximum samples kept in the rolling window (default: 40)
    pub window_size: usize,

    /// How long to wait for a single timing reply before giving up on
    /// the run and resolving with the current mean (default: 2 seconds)
    pub exchange_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            target_samples: 40,
            window_size: 40,
            exchange_timeout: Duration::from_secs(2),
        }
    }
}

impl SyncConfig {
    /// Set the target sample count
    #[must_use]
    pub fn with_target_samples(mut self, target: usize) -> Self {
        self.target_samples = target.max(1);
        self
    }

    /// Set the rolling window size
    #[must_use]
    pub fn with_window_size(mut self, window: usize) -> Self {
        self.window_size = window.max(1);
        self
    }

    /// Set the per-exchange timeout
    #[must_use]
    pub fn with_exchange_timeout(mut self, timeout: Duration) -> Self {
        self.exchange_timeout = timeout;
        self
    }
}

/// Configuration for the relay server
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// How far in the relay's future broadcast actions are scheduled.
    ///
    /// Must exceed typical round-trip plus processing time so listeners
    /// receive an action before it fires. Under very poor network
    /// conditions a fixed buffer may be insufficient, in which case the
    /// listener applies the action late rather than dropping it.
    /// (default: 250ms)
    pub schedule_buffer: Duration,

    /// Capacity of each connection's outgoing message queue (default: 64)
    pub send_queue: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            schedule_buffer: Duration::from_millis(250),
            send_queue: 64,
        }
    }
}

impl RelayConfig {
    /// Set the schedule buffer
    #[must_use]
    pub fn with_schedule_buffer(mut self, buffer: Duration) -> Self {
        self.schedule_buffer = buffer;
        self
    }

    /// Set the outgoing queue capacity
    #[must_use]
    pub fn with_send_queue(mut self, capacity: usize) -> Self {
        self.send_queue = capacity.max(1);
        self
    }

    /// Schedule buffer in milliseconds, as used in deadline arithmetic
    #[must_use]
    pub fn schedule_buffer_ms(&self) -> f64 {
        self.schedule_buffer.as_secs_f64() * 1000.0
    }
}
