//! The relay server side of listen-along.
//!
//! ```text
//!   broadcaster ──BROADCAST_ACTION──▶ ┌───────────┐
//!                                     │   relay   │ ──SCHEDULED_ACTION──▶ listener A
//!   listener  ───START_LISTENING───▶  │  registry │ ──SCHEDULED_ACTION──▶ listener B
//!   any client ───NTP_REQUEST──────▶  └───────────┘ ──NTP_RESPONSE──────▶ requester
//! ```
//!
//! The relay never interprets playback semantics. It stamps each action
//! with a future execution deadline on its own clock and forwards it;
//! listeners translate that deadline into local time with their measured
//! clock offset.

mod directory;
mod registry;
mod server;

pub use directory::{StaticDirectory, UserDirectory, UserProfile};
pub use registry::ListenerRegistry;
pub use server::RelayServer;

#[cfg(test)]
mod tests;
