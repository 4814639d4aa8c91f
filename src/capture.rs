//! Per-stream capture gating: at most one snapshot per physical vehicle pass.

mod gate;
mod track_state;

pub use gate::CaptureGate;
pub use track_state::{CaptureState, TrackState};
