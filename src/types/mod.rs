//! Core types shared across the crate.

mod action;
mod config;
mod track;

pub use action::{ActionKind, ClockSample, PlaybackAction, ScheduledAction};
pub use config::{RelayConfig, SyncConfig};
pub use track::{TrackRef, UserId};
