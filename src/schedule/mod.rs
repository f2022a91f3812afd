//! Playback scheduling.
//!
//! Listener side: converts a relay-clock execution deadline into a local
//! one-shot timer using the current offset estimate. Broadcaster side:
//! emits local playback state changes to the relay.

mod broadcast;
mod scheduler;

pub use broadcast::PlaybackBroadcaster;
pub use scheduler::{ActionScheduler, compute_local_fire_time};

#[cfg(test)]
mod tests;
