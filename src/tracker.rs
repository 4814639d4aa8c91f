//! Detection-to-track association.
//!
//! The stream processor only needs [`Tracker`]; [`ByteTracker`] is the bundled
//! implementation (two-stage ByteTrack association over a Kalman motion model).

mod byte_tracker;
mod kalman_filter;
mod matching;
mod strack;

pub use byte_tracker::{ByteTracker, TrackerConfig};
pub use strack::{STrack, TrackLifecycle};

use crate::detection::Detection;

/// Stable per-run identifier of one physical object pass.
pub type TrackId = u64;

/// Associates each frame's detections with tracks.
pub trait Tracker {
    /// Error type for association failures.
    type Error: std::error::Error;

    /// Returns one entry per input detection, in input order. `None` means the
    /// detection is not bound to a confirmed track this frame.
    fn associate(&mut self, detections: &[Detection]) -> Result<Vec<Option<TrackId>>, Self::Error>;

    /// Clear all state; called at the start of every stream run.
    fn reset(&mut self);
}
