//! Single object track with a Kalman motion state.

use ndarray::{Array1, Array2};

use crate::geometry::Rect;
use crate::tracker::TrackId;
use crate::tracker::kalman_filter::KalmanFilter;

/// Association lifecycle of a track inside the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackLifecycle {
    /// Created from a detection, not yet confirmed
    #[default]
    New,
    Tracked,
    /// Missed recently; may be recovered within the track buffer
    Lost,
    Removed,
}

#[derive(Debug, Clone)]
pub struct STrack {
    /// 0 until the track is activated
    pub track_id: TrackId,
    pub state: TrackLifecycle,
    pub is_activated: bool,
    pub score: f32,
    /// Last frame this track was matched in
    pub frame_id: u32,
    pub start_frame: u32,
    pub tracklet_len: u32,
    /// Index of the input detection that last updated this track
    pub det_index: Option<usize>,
    mean: Option<Array1<f64>>,
    covariance: Option<Array2<f64>>,
    /// Raw detection box, used until the filter is initialised
    detection_box: Rect,
}

impl STrack {
    pub fn new(bbox: Rect, score: f32, det_index: usize) -> Self {
        Self {
            track_id: 0,
            state: TrackLifecycle::New,
            is_activated: false,
            score,
            frame_id: 0,
            start_frame: 0,
            tracklet_len: 0,
            det_index: Some(det_index),
            mean: None,
            covariance: None,
            detection_box: bbox,
        }
    }

    /// Current box estimate: the filtered state if available, else the raw detection.
    pub fn rect(&self) -> Rect {
        match &self.mean {
            Some(mean) => Rect::from_xyah(mean[0] as f32, mean[1] as f32, mean[2] as f32, mean[3] as f32),
            None => self.detection_box,
        }
    }

    pub fn end_frame(&self) -> u32 {
        self.frame_id
    }

    pub fn activate(&mut self, kalman_filter: &KalmanFilter, track_id: TrackId, frame_id: u32) {
        self.track_id = track_id;
        let (mean, covariance) = kalman_filter.initiate(xyah_f64(&self.detection_box));
        self.mean = Some(mean);
        self.covariance = Some(covariance);
        self.tracklet_len = 0;
        self.state = TrackLifecycle::Tracked;
        // Only tracks born on the very first frame skip confirmation.
        self.is_activated = frame_id == 1;
        self.frame_id = frame_id;
        self.start_frame = frame_id;
    }

    pub fn re_activate(&mut self, detection: &STrack, kalman_filter: &KalmanFilter, frame_id: u32) {
        self.correct(detection, kalman_filter);
        self.tracklet_len = 0;
        self.state = TrackLifecycle::Tracked;
        self.is_activated = true;
        self.frame_id = frame_id;
    }

    pub fn update(&mut self, detection: &STrack, kalman_filter: &KalmanFilter, frame_id: u32) {
        self.correct(detection, kalman_filter);
        self.tracklet_len += 1;
        self.state = TrackLifecycle::Tracked;
        self.is_activated = true;
        self.frame_id = frame_id;
    }

    fn correct(&mut self, detection: &STrack, kalman_filter: &KalmanFilter) {
        if let (Some(mean), Some(cov)) = (&self.mean, &self.covariance) {
            if let Some((mean, cov)) = kalman_filter.update(mean, cov, xyah_f64(&detection.detection_box)) {
                self.mean = Some(mean);
                self.covariance = Some(cov);
            }
        }
        self.detection_box = detection.detection_box;
        self.score = detection.score;
        self.det_index = detection.det_index;
    }

    pub fn predict(&mut self, kalman_filter: &KalmanFilter) {
        if let (Some(mean), Some(cov)) = (&self.mean, &self.covariance) {
            let mut mean = mean.clone();
            if self.state != TrackLifecycle::Tracked {
                mean[7] = 0.0;
            }
            let (mean, cov) = kalman_filter.predict(&mean, cov);
            self.mean = Some(mean);
            self.covariance = Some(cov);
        }
        self.det_index = None;
    }

    pub fn mark_lost(&mut self) {
        self.state = TrackLifecycle::Lost;
    }

    pub fn mark_removed(&mut self) {
        self.state = TrackLifecycle::Removed;
    }
}

fn xyah_f64(rect: &Rect) -> [f64; 4] {
    rect.to_xyah().map(f64::from)
}
