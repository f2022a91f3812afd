//! Media playback surface contract.
//!
//! The scheduler depends only on this trait, not on how media is fetched
//! or decoded. It mirrors the HTML media element surface the web clients
//! drive: an assignable source, `currentTime`, `play()`, `pause()`, and a
//! ready-to-play-through signal.

use async_trait::async_trait;

use crate::types::TrackRef;

/// A playback surface the scheduler can drive.
#[async_trait]
pub trait MediaSurface: Send + Sync {
    /// The track currently loaded, if any.
    fn current_track(&self) -> Option<TrackRef>;

    /// Current in-track position in seconds.
    fn current_time(&self) -> f64;

    /// Switch the media source to `track`.
    ///
    /// Resolves once the media is ready to play through without
    /// stalling. May take arbitrarily long on slow links; callers must
    /// not re-derive deadlines around it.
    async fn load(&self, track: &TrackRef);

    /// Seek to an in-track position in seconds.
    fn seek(&self, position_secs: f64);

    /// Start or resume playback.
    fn play(&self);

    /// Pause playback.
    fn pause(&self);
}
