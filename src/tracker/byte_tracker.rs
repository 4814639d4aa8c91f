//! ByteTrack association.
//!
//! High-confidence detections are matched first against confirmed and lost
//! tracks; low-confidence detections then get a second chance against the
//! tracks that are still unmatched.

use std::collections::HashSet;
use std::convert::Infallible;

use serde::{Deserialize, Serialize};

use crate::detection::Detection;
use crate::geometry::{Rect, iou_batch};
use crate::tracker::kalman_filter::KalmanFilter;
use crate::tracker::matching::{self, Assignment};
use crate::tracker::strack::{STrack, TrackLifecycle};
use crate::tracker::{TrackId, Tracker};

/// Detections below this score are ignored entirely.
const LOW_SCORE_FLOOR: f32 = 0.1;
const SECOND_MATCH_THRESH: f32 = 0.5;
const UNCONFIRMED_MATCH_THRESH: f32 = 0.7;
const DUPLICATE_IOU: f32 = 0.85;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub track_thresh: f32,
    pub match_thresh: f32,
    pub track_buffer: u32,
    pub frame_rate: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            track_thresh: 0.5,
            match_thresh: 0.8,
            track_buffer: 30,
            frame_rate: 30.0,
        }
    }
}

pub struct ByteTracker {
    tracked_stracks: Vec<STrack>,
    lost_stracks: Vec<STrack>,
    frame_id: u32,
    next_id: TrackId,
    config: TrackerConfig,
    max_time_lost: u32,
    kalman_filter: KalmanFilter,
}

impl ByteTracker {
    pub fn new(config: TrackerConfig) -> Self {
        let max_time_lost = (config.frame_rate / 30.0 * config.track_buffer as f32) as u32;
        Self {
            tracked_stracks: Vec::new(),
            lost_stracks: Vec::new(),
            frame_id: 0,
            next_id: 1,
            config,
            max_time_lost,
            kalman_filter: KalmanFilter::default(),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Advance one frame and return the confirmed tracks matched in it.
    pub fn update(&mut self, detections: &[Detection]) -> Vec<STrack> {
        self.frame_id += 1;
        let frame_id = self.frame_id;

        let mut activated = Vec::new();
        let mut refound = Vec::new();
        let mut lost = Vec::new();

        let mut high = Vec::new();
        let mut low = Vec::new();
        for (idx, det) in detections.iter().enumerate() {
            let candidate = STrack::new(det.bbox, det.score, idx);
            if det.score >= self.config.track_thresh {
                high.push(candidate);
            } else if det.score > LOW_SCORE_FLOOR {
                low.push(candidate);
            }
        }

        let (confirmed, mut unconfirmed): (Vec<_>, Vec<_>) = std::mem::take(&mut self.tracked_stracks)
            .into_iter()
            .partition(|t| t.is_activated);

        let mut pool = joint_stracks(confirmed, &self.lost_stracks);
        for track in pool.iter_mut() {
            track.predict(&self.kalman_filter);
        }

        // First association: high-score detections against confirmed + lost tracks.
        let mut dists = matching::iou_distance(&rects(&pool), &rects(&high));
        matching::fuse_score(&mut dists, &scores(&high));
        let Assignment {
            matches,
            unmatched_tracks,
            unmatched_detections,
        } = matching::linear_assignment(&dists, self.config.match_thresh);

        for (itrack, idet) in matches {
            let mut track = pool[itrack].clone();
            self.absorb(&mut track, &high[idet], &mut activated, &mut refound);
        }

        // Second association: low-score detections against still-tracked leftovers.
        let remaining: Vec<STrack> = unmatched_tracks
            .iter()
            .map(|&i| &pool[i])
            .filter(|t| t.state == TrackLifecycle::Tracked)
            .cloned()
            .collect();
        let dists = matching::iou_distance(&rects(&remaining), &rects(&low));
        let second = matching::linear_assignment(&dists, SECOND_MATCH_THRESH);

        for (itrack, idet) in second.matches {
            let mut track = remaining[itrack].clone();
            self.absorb(&mut track, &low[idet], &mut activated, &mut refound);
        }
        for idx in second.unmatched_tracks {
            let mut track = remaining[idx].clone();
            track.mark_lost();
            lost.push(track);
        }

        // Unconfirmed tracks (usually a single frame old) get one more shot.
        let leftovers: Vec<STrack> = unmatched_detections.iter().map(|&i| high[i].clone()).collect();
        let mut dists = matching::iou_distance(&rects(&unconfirmed), &rects(&leftovers));
        matching::fuse_score(&mut dists, &scores(&leftovers));
        let third = matching::linear_assignment(&dists, UNCONFIRMED_MATCH_THRESH);

        for (itrack, idet) in third.matches {
            unconfirmed[itrack].update(&leftovers[idet], &self.kalman_filter, frame_id);
            activated.push(unconfirmed[itrack].clone());
        }

        // New tracks from confident, unclaimed detections.
        for idx in third.unmatched_detections {
            let mut track = leftovers[idx].clone();
            if track.score < self.config.track_thresh + 0.1 {
                continue;
            }
            let id = self.allocate_id();
            track.activate(&self.kalman_filter, id, frame_id);
            activated.push(track);
        }

        for track in std::mem::take(&mut self.lost_stracks) {
            if frame_id - track.end_frame() <= self.max_time_lost {
                lost.push(track);
            }
        }

        let tracked: Vec<STrack> = activated
            .into_iter()
            .chain(refound)
            .filter(|t| t.state == TrackLifecycle::Tracked)
            .collect();
        let lost = sub_stracks(lost, &tracked);

        let (tracked, lost) = remove_duplicate_stracks(tracked, lost);
        self.tracked_stracks = tracked;
        self.lost_stracks = lost;

        self.tracked_stracks
            .iter()
            .filter(|t| t.is_activated)
            .cloned()
            .collect()
    }

    fn absorb(&self, track: &mut STrack, det: &STrack, activated: &mut Vec<STrack>, refound: &mut Vec<STrack>) {
        if track.state == TrackLifecycle::Tracked {
            track.update(det, &self.kalman_filter, self.frame_id);
            activated.push(track.clone());
        } else {
            track.re_activate(det, &self.kalman_filter, self.frame_id);
            refound.push(track.clone());
        }
    }

    fn allocate_id(&mut self) -> TrackId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl Tracker for ByteTracker {
    type Error = Infallible;

    fn associate(&mut self, detections: &[Detection]) -> Result<Vec<Option<TrackId>>, Self::Error> {
        let mut ids = vec![None; detections.len()];
        for track in self.update(detections) {
            if let Some(idx) = track.det_index {
                ids[idx] = Some(track.track_id);
            }
        }
        Ok(ids)
    }

    fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }
}

fn rects(tracks: &[STrack]) -> Vec<Rect> {
    tracks.iter().map(STrack::rect).collect()
}

fn scores(tracks: &[STrack]) -> Vec<f32> {
    tracks.iter().map(|t| t.score).collect()
}

fn joint_stracks(first: Vec<STrack>, second: &[STrack]) -> Vec<STrack> {
    let mut seen: HashSet<TrackId> = first.iter().map(|t| t.track_id).collect();
    let mut joined = first;
    joined.extend(second.iter().filter(|t| seen.insert(t.track_id)).cloned());
    joined
}

fn sub_stracks(tracks: Vec<STrack>, remove: &[STrack]) -> Vec<STrack> {
    let ids: HashSet<TrackId> = remove.iter().map(|t| t.track_id).collect();
    tracks.into_iter().filter(|t| !ids.contains(&t.track_id)).collect()
}

/// Drop near-identical tracked/lost pairs, keeping the longer-lived one.
fn remove_duplicate_stracks(tracked: Vec<STrack>, lost: Vec<STrack>) -> (Vec<STrack>, Vec<STrack>) {
    if tracked.is_empty() || lost.is_empty() {
        return (tracked, lost);
    }

    let ious = iou_batch(&rects(&tracked), &rects(&lost));
    let mut drop_tracked = vec![false; tracked.len()];
    let mut drop_lost = vec![false; lost.len()];
    for ((i, j), &iou) in ious.indexed_iter() {
        if iou <= DUPLICATE_IOU {
            continue;
        }
        let age_tracked = tracked[i].frame_id - tracked[i].start_frame;
        let age_lost = lost[j].frame_id - lost[j].start_frame;
        if age_tracked > age_lost {
            drop_lost[j] = true;
        } else {
            drop_tracked[i] = true;
        }
    }

    let keep = |tracks: Vec<STrack>, dropped: &[bool]| -> Vec<STrack> {
        tracks
            .into_iter()
            .zip(dropped)
            .filter_map(|(t, &d)| (!d).then_some(t))
            .collect()
    };
    (keep(tracked, &drop_tracked), keep(lost, &drop_lost))
}
