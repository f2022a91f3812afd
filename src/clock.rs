//! Wall-clock abstraction.
//!
//! All wire-level timestamps are f64 milliseconds since the Unix epoch,
//! matching the browser's `performance.timeOrigin + performance.now()`
//! convention used by the deployed web clients. Sub-millisecond precision
//! is preserved in the fractional part.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of wall-clock time in epoch milliseconds.
///
/// Abstracted so the sync engine, scheduler, and relay can be driven by a
/// settable clock in tests.
pub trait WallClock: Send + Sync {
    /// Current wall-clock time in milliseconds since the Unix epoch.
    fn now_ms(&self) -> f64;
}

/// System wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now_ms(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64()
            * 1000.0
    }
}

/// Shared clock handle used across tasks.
pub type SharedClock = Arc<dyn WallClock>;

/// Create a shared system clock instance.
#[must_use]
pub fn system_clock() -> SharedClock {
    Arc::new(SystemClock)
}
