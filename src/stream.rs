//! Turns one checkpoint's frame sequence into snapshots.
//!
//! Frames are handled strictly in order: detection, track association,
//! capture gating and driver-face search all happen per frame. Embedding of the
//! captured crops is deferred to the end of the run and spread over a bounded
//! worker pool, since captures do not depend on each other.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use image::RgbImage;
use rayon::ThreadPool;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::capture::CaptureGate;
use crate::error::{FrameError, Result};
use crate::frame::{Frame, FrameRef};
use crate::geometry::Rect;
use crate::integration::{Detector, Embedder, FaceLocalizer};
use crate::snapshot::{Snapshot, StreamSide};
use crate::tracker::{TrackId, Tracker};

/// Vehicle and driver embedders plus the pool they run on.
#[derive(Clone)]
pub struct EmbeddingStage {
    vehicle: Arc<dyn Embedder>,
    driver: Arc<dyn Embedder>,
    pool: Arc<ThreadPool>,
}

impl EmbeddingStage {
    pub fn new(vehicle: Arc<dyn Embedder>, driver: Arc<dyn Embedder>, workers: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("embed-{i}"))
            .build()?;
        Ok(Self {
            vehicle,
            driver,
            pool: Arc::new(pool),
        })
    }

    pub fn vehicle_dimension(&self) -> usize {
        self.vehicle.dimension()
    }

    pub fn driver_dimension(&self) -> usize {
        self.driver.dimension()
    }

    /// Embed all captures; output order equals input order.
    fn embed(&self, side: StreamSide, captures: Vec<PendingCapture>) -> Vec<Snapshot> {
        let (vehicle, driver) = (&self.vehicle, &self.driver);
        self.pool.install(|| {
            captures
                .into_par_iter()
                .map(|capture| capture.into_snapshot(side, vehicle.as_ref(), driver.as_ref()))
                .collect()
        })
    }
}

/// A capture decision whose embeddings are not computed yet.
#[derive(Debug)]
struct PendingCapture {
    track_id: TrackId,
    frame: FrameRef,
    bbox: Rect,
    vehicle_crop: RgbImage,
    driver_crops: Vec<RgbImage>,
    captured_at: DateTime<Utc>,
}

impl PendingCapture {
    fn into_snapshot(self, side: StreamSide, vehicle: &dyn Embedder, driver: &dyn Embedder) -> Snapshot {
        let vehicle_embedding = vehicle.embed(std::slice::from_ref(&self.vehicle_crop));
        let driver_embedding = driver.embed(&self.driver_crops);
        Snapshot::builder(self.track_id, side)
            .frame(self.frame)
            .bbox(self.bbox)
            .vehicle_crop(self.vehicle_crop)
            .driver_crops(self.driver_crops)
            .vehicle_embedding(vehicle_embedding)
            .driver_embedding(driver_embedding)
            .timestamp(self.captured_at)
            .build()
    }
}

/// Result of processing one stream.
#[derive(Debug, Clone)]
pub struct StreamRun {
    pub side: StreamSide,
    /// In capture order
    pub snapshots: Vec<Snapshot>,
    pub frames_processed: usize,
    pub frames_skipped: usize,
    pub tracks_seen: usize,
}

pub struct StreamProcessor<D, T, F> {
    side: StreamSide,
    detector: D,
    tracker: T,
    faces: F,
    embedding: EmbeddingStage,
}

impl<D, T, F> StreamProcessor<D, T, F>
where
    D: Detector,
    T: Tracker,
    F: FaceLocalizer,
{
    pub fn new(side: StreamSide, detector: D, tracker: T, faces: F, embedding: EmbeddingStage) -> Self {
        Self {
            side,
            detector,
            tracker,
            faces,
            embedding,
        }
    }

    pub fn side(&self) -> StreamSide {
        self.side
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    pub fn face_localizer(&self) -> &F {
        &self.faces
    }

    pub fn embedding(&self) -> &EmbeddingStage {
        &self.embedding
    }

    /// Run the whole frame sequence. Track and capture state live only for the
    /// duration of this call; the tracker is reset first.
    pub fn process<I>(&mut self, frames: I) -> StreamRun
    where
        I: IntoIterator<Item = std::result::Result<Frame, FrameError>>,
    {
        self.tracker.reset();
        let mut gate = CaptureGate::new();
        let mut captures = Vec::new();
        let mut frames_processed = 0;
        let mut frames_skipped = 0;

        for item in frames {
            let frame = match item {
                Ok(frame) => frame,
                Err(err) => {
                    warn!(side = %self.side, error = %err, "skipping unreadable frame");
                    frames_skipped += 1;
                    continue;
                }
            };
            match self.process_frame(&frame, &mut gate, &mut captures) {
                Ok(()) => frames_processed += 1,
                Err(err) => {
                    warn!(side = %self.side, frame = frame.reference.index, error = %err, "skipping frame");
                    frames_skipped += 1;
                }
            }
        }

        let snapshots = self.embedding.embed(self.side, captures);
        info!(
            side = %self.side,
            frames_processed,
            frames_skipped,
            tracks = gate.tracks_seen(),
            snapshots = snapshots.len(),
            "stream processed"
        );

        StreamRun {
            side: self.side,
            snapshots,
            frames_processed,
            frames_skipped,
            tracks_seen: gate.tracks_seen(),
        }
    }

    fn process_frame(
        &mut self,
        frame: &Frame,
        gate: &mut CaptureGate,
        captures: &mut Vec<PendingCapture>,
    ) -> std::result::Result<(), FrameError> {
        let detections = self
            .detector
            .detect(frame)
            .map_err(|e| FrameError::Detector(e.to_string()))?;
        let track_ids = self
            .tracker
            .associate(&detections)
            .map_err(|e| FrameError::Tracker(e.to_string()))?;
        if track_ids.len() != detections.len() {
            return Err(FrameError::Tracker(format!(
                "{} track ids for {} detections",
                track_ids.len(),
                detections.len()
            )));
        }

        // Everything fallible is done; from here on state only moves forward.
        let tracked: Vec<_> = detections
            .iter()
            .zip(track_ids)
            .filter_map(|(det, id)| id.map(|id| (id, det.bbox)))
            .collect();
        for &(track_id, bbox) in &tracked {
            gate.observe(track_id, bbox);
        }

        for (track_id, bbox) in tracked {
            if !gate.should_capture(track_id) {
                continue;
            }
            let Some(region) = bbox.clip_to_frame(frame.width(), frame.height()) else {
                debug!(track_id, ?bbox, "vehicle box empty after clipping; retrying next frame");
                continue;
            };

            let faces = self.faces.locate_driver_faces(frame, region);
            let driver_crops: Vec<RgbImage> = faces
                .iter()
                .filter_map(|face| face.to_rect().clip_to_frame(frame.width(), frame.height()))
                .map(|face| frame.crop(face))
                .collect();
            if driver_crops.is_empty() {
                debug!(
                    track_id,
                    frames_seen = gate.track(track_id).map_or(0, |t| t.frames_seen),
                    "no driver face yet; retrying next frame"
                );
                continue;
            }

            captures.push(PendingCapture {
                track_id,
                frame: frame.reference.clone(),
                bbox: region.to_rect(),
                vehicle_crop: frame.crop(region),
                driver_crops,
                captured_at: Utc::now(),
            });
            gate.mark_captured(track_id);
            info!(side = %self.side, track_id, frame = frame.reference.index, "captured snapshot");
        }
        Ok(())
    }
}
