//! Clock synchronization between a client and the relay.
//!
//! Produces a converged estimate of (relay clock − local clock) usable to
//! translate any relay-clock timestamp into an equivalent local-clock
//! timestamp.
//!
//! ## Timing exchange
//!
//! ```text
//! Client                        Relay
//!   |--- NTP_REQUEST (T0) ------->|  T1 = receipt time
//!   |<-- NTP_RESPONSE (T0,T1,T2) -|  T2 = send time
//!   T3 = receipt time
//!
//!   rtt    = (T3 - T0) - (T2 - T1)
//!   offset = ((T1 - T0) + (T2 - T3)) / 2
//! ```
//!
//! Exchanges run back-to-back until a fixed number of samples is
//! collected; the estimate is the arithmetic mean over a bounded rolling
//! window, smoothing out network jitter.

mod engine;
mod runner;

pub use engine::{SyncClock, SyncState};
pub use runner::{SharedSyncClock, SyncRunner, SyncTransport, TimingReply, shared_sync_clock};

#[cfg(test)]
mod tests;
