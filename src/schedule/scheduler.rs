//! Listener-side action scheduling.
//!
//! Turns a [`ScheduledAction`] into a precisely-timed local side effect:
//! the relay-clock deadline is translated into the local clock frame via
//! the current offset estimate, and a one-shot timer fires the action.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::clock::SharedClock;
use crate::media::MediaSurface;
use crate::types::{ActionKind, PlaybackAction, ScheduledAction};

/// Translate a relay-clock deadline into a local wait.
///
/// Returns the number of milliseconds until the action must fire in the
/// local clock frame; negative means the deadline has already passed.
/// Pure, so the scheduling math is testable without a timer or socket.
#[must_use]
pub fn compute_local_fire_time(
    relay_execution_time_ms: f64,
    offset_ms: f64,
    local_now_ms: f64,
) -> f64 {
    (relay_execution_time_ms - offset_ms) - local_now_ms
}

/// Arms one-shot timers that apply playback actions to a media surface.
///
/// At most one timer is pending at a time: scheduling a new action
/// cancels any previous not-yet-executed one, so the newest action
/// always wins.
pub struct ActionScheduler {
    media: Arc<dyn MediaSurface>,
    wall_clock: SharedClock,
    pending: Option<JoinHandle<()>>,
}

impl ActionScheduler {
    /// Create a scheduler driving the given media surface.
    pub fn new(media: Arc<dyn MediaSurface>, wall_clock: SharedClock) -> Self {
        Self {
            media,
            wall_clock,
            pending: None,
        }
    }

    /// Arm a timer for `scheduled`, superseding any pending action.
    ///
    /// If the translated deadline is already in the past the action is
    /// applied immediately rather than skipped.
    pub fn schedule(&mut self, scheduled: ScheduledAction, offset_ms: f64) {
        self.cancel();

        let wait_ms = compute_local_fire_time(
            scheduled.server_time_to_execute,
            offset_ms,
            self.wall_clock.now_ms(),
        );
        tracing::debug!(
            wait_ms,
            deadline = scheduled.server_time_to_execute,
            offset_ms,
            kind = ?scheduled.action.kind,
            "arming scheduled action"
        );

        let media = Arc::clone(&self.media);
        self.pending = Some(tokio::spawn(async move {
            if wait_ms > 0.0 {
                tokio::time::sleep(Duration::from_secs_f64(wait_ms / 1000.0)).await;
            }
            apply(media.as_ref(), &scheduled.action).await;
        }));
    }

    /// Cancel any pending timer.
    ///
    /// Called when a listen-along session starts or stops.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// Whether a timer is currently armed (or its action still running).
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for ActionScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Apply one action to the media surface.
///
/// If the target track differs from what is loaded, the source is
/// switched first and the action deferred until the media is ready to
/// play through. The deadline is not re-derived if loading runs long: a
/// late application is preferred to silently dropping the action.
async fn apply(media: &dyn MediaSurface, action: &PlaybackAction) {
    let needs_switch = media
        .current_track()
        .is_none_or(|loaded| !loaded.same_track(&action.track));
    if needs_switch {
        media.load(&action.track).await;
    }

    media.seek(action.track_time_seconds);
    match action.kind {
        ActionKind::Play => media.play(),
        ActionKind::Pause => media.pause(),
    }
}
