use std::collections::HashMap;

use crate::capture::track_state::{CaptureState, TrackState};
use crate::geometry::Rect;
use crate::tracker::TrackId;

/// Decides, per track, whether a detection may still become a snapshot.
///
/// Tracks start in [`CaptureState::Tracked`] the first time they are observed and
/// move to [`CaptureState::Captured`] exactly once. There is no way back.
#[derive(Debug, Default)]
pub struct CaptureGate {
    tracks: HashMap<TrackId, TrackState>,
}

impl CaptureGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sighting of `track_id` at `bbox`.
    pub fn observe(&mut self, track_id: TrackId, bbox: Rect) -> &TrackState {
        let track = self
            .tracks
            .entry(track_id)
            .or_insert_with(|| TrackState::new(track_id, bbox));
        track.frames_seen += 1;
        track.bbox = bbox;
        track
    }

    /// True only for observed tracks that have not been captured yet.
    pub fn should_capture(&self, track_id: TrackId) -> bool {
        self.state(track_id) == Some(CaptureState::Tracked)
    }

    /// Move `track_id` to `Captured`. Returns whether this call made the transition.
    pub fn mark_captured(&mut self, track_id: TrackId) -> bool {
        let track = self
            .tracks
            .entry(track_id)
            .or_insert_with(|| TrackState::new(track_id, Rect::default()));
        !std::mem::replace(&mut track.captured, true)
    }

    pub fn state(&self, track_id: TrackId) -> Option<CaptureState> {
        self.tracks.get(&track_id).map(TrackState::state)
    }

    pub fn track(&self, track_id: TrackId) -> Option<&TrackState> {
        self.tracks.get(&track_id)
    }

    pub fn tracks_seen(&self) -> usize {
        self.tracks.len()
    }

    pub fn captured_count(&self) -> usize {
        self.tracks.values().filter(|t| t.captured).count()
    }

    pub fn reset(&mut self) {
        self.tracks.clear();
    }
}
