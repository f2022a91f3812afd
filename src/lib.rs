//! # listenalong
//!
//! Real-time synchronized "listen along" for a personal music player:
//! one user broadcasts their playback, any number of others hear the
//! same audio at the same moment, mediated by a WebSocket relay.
//!
//! ## Features
//!
//! - WebSocket relay server with token authentication
//! - NTP-style clock synchronization between each client and the relay
//! - Deadline-based playback scheduling (play, pause, seek)
//! - Listener registry with late-joiner state replay
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use listenalong::{MediaSurface, RelayClient, UserId};
//!
//! # async fn example(media: Arc<dyn MediaSurface>) -> listenalong::Result<()> {
//! // Connect and measure the clock offset to the relay.
//! let mut client = RelayClient::connect("ws://relay.example:4000", "token", media).await?;
//! let offset_ms = client.start_sync().await;
//! tracing::info!(offset_ms, "clock sync complete");
//!
//! // Follow another user's playback.
//! client.start_listening(UserId::from("some-user")).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Relay side**: [`RelayServer`] - authenticates, answers timing
//!   requests, fans actions out with execution deadlines
//! - **Client side**: [`RelayClient`] - syncs the clock, schedules
//!   incoming actions against a [`MediaSurface`], broadcasts local changes
//! - **Low-level**: `sync`, `schedule`, and `protocol` modules - direct
//!   access to the engine, scheduler, and wire types

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Public modules
/// Error types
pub mod error;
/// Core types
pub mod types;

/// Testing utilities
pub mod testing;

// Internal modules
mod client;
pub mod clock;
pub mod media;
pub mod protocol;
pub mod relay;
pub mod schedule;
pub mod sync;

// Re-exports
pub use client::RelayClient;
pub use clock::{SharedClock, SystemClock, WallClock, system_clock};
pub use error::{ListenAlongError, Result};
pub use media::MediaSurface;
pub use relay::{ListenerRegistry, RelayServer, StaticDirectory, UserDirectory, UserProfile};
pub use schedule::{ActionScheduler, PlaybackBroadcaster, compute_local_fire_time};
pub use sync::{SharedSyncClock, SyncClock, SyncRunner, SyncState, shared_sync_clock};
pub use types::{
    ActionKind, PlaybackAction, RelayConfig, ScheduledAction, SyncConfig, TrackRef, UserId,
};

/// Commonly used types, importable in one line.
pub mod prelude {
    pub use crate::client::RelayClient;
    pub use crate::error::{ListenAlongError, Result};
    pub use crate::media::MediaSurface;
    pub use crate::relay::{RelayServer, StaticDirectory, UserDirectory};
    pub use crate::types::{
        ActionKind, PlaybackAction, RelayConfig, ScheduledAction, SyncConfig, TrackRef, UserId,
    };
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
