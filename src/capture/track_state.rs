use crate::geometry::Rect;
use crate::tracker::TrackId;

/// Capture progress of one track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureState {
    /// Seen, still waiting for a usable driver view
    #[default]
    Tracked,
    /// Snapshot taken; later detections are ignored
    Captured,
}

/// Bookkeeping for one track within a single stream run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackState {
    pub track_id: TrackId,
    /// Latest detector box
    pub bbox: Rect,
    pub frames_seen: u32,
    /// Set once, never cleared
    pub captured: bool,
}

impl TrackState {
    pub fn new(track_id: TrackId, bbox: Rect) -> Self {
        Self {
            track_id,
            bbox,
            frames_seen: 0,
            captured: false,
        }
    }

    pub fn state(&self) -> CaptureState {
        if self.captured {
            CaptureState::Captured
        } else {
            CaptureState::Tracked
        }
    }
}
