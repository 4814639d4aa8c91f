//! Forensic captures: one immutable record per captured track.

use chrono::{DateTime, Utc};
use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::embedding::Embedding;
use crate::frame::FrameRef;
use crate::geometry::Rect;
use crate::tracker::TrackId;

/// Which checkpoint a stream belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamSide {
    Entry,
    Exit,
}

impl StreamSide {
    /// Prefix used for cluster ids.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Entry => "EN",
            Self::Exit => "EX",
        }
    }
}

impl std::fmt::Display for StreamSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Entry => write!(f, "entry"),
            Self::Exit => write!(f, "exit"),
        }
    }
}

/// Points a presentation layer at a capture without carrying pixels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleRef {
    pub track_id: TrackId,
    pub frame: FrameRef,
}

#[derive(Debug, Clone)]
pub struct Snapshot {
    track_id: TrackId,
    frame: FrameRef,
    bbox: Rect,
    vehicle_crop: RgbImage,
    driver_crops: Vec<RgbImage>,
    vehicle_embedding: Embedding,
    driver_embedding: Embedding,
    timestamp: DateTime<Utc>,
    side: StreamSide,
}

impl Snapshot {
    pub fn builder(track_id: TrackId, side: StreamSide) -> SnapshotBuilder {
        SnapshotBuilder::new(track_id, side)
    }

    pub fn track_id(&self) -> TrackId {
        self.track_id
    }

    pub fn frame(&self) -> &FrameRef {
        &self.frame
    }

    pub fn bbox(&self) -> Rect {
        self.bbox
    }

    pub fn vehicle_crop(&self) -> &RgbImage {
        &self.vehicle_crop
    }

    pub fn driver_crops(&self) -> &[RgbImage] {
        &self.driver_crops
    }

    pub fn vehicle_embedding(&self) -> &Embedding {
        &self.vehicle_embedding
    }

    pub fn driver_embedding(&self) -> &Embedding {
        &self.driver_embedding
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn side(&self) -> StreamSide {
        self.side
    }

    pub fn sample_ref(&self) -> SampleRef {
        SampleRef {
            track_id: self.track_id,
            frame: self.frame.clone(),
        }
    }
}

/// Builder for [`Snapshot`]. Unset embeddings default to the empty absent vector.
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    track_id: TrackId,
    side: StreamSide,
    frame: FrameRef,
    bbox: Rect,
    vehicle_crop: RgbImage,
    driver_crops: Vec<RgbImage>,
    vehicle_embedding: Embedding,
    driver_embedding: Embedding,
    timestamp: Option<DateTime<Utc>>,
}

impl SnapshotBuilder {
    pub fn new(track_id: TrackId, side: StreamSide) -> Self {
        Self {
            track_id,
            side,
            frame: FrameRef {
                index: 0,
                path: None,
            },
            bbox: Rect::default(),
            vehicle_crop: RgbImage::new(0, 0),
            driver_crops: Vec::new(),
            vehicle_embedding: Embedding::absent(0),
            driver_embedding: Embedding::absent(0),
            timestamp: None,
        }
    }

    pub fn frame(mut self, frame: FrameRef) -> Self {
        self.frame = frame;
        self
    }

    pub fn bbox(mut self, bbox: Rect) -> Self {
        self.bbox = bbox;
        self
    }

    pub fn vehicle_crop(mut self, crop: RgbImage) -> Self {
        self.vehicle_crop = crop;
        self
    }

    pub fn driver_crops(mut self, crops: Vec<RgbImage>) -> Self {
        self.driver_crops = crops;
        self
    }

    pub fn vehicle_embedding(mut self, embedding: impl Into<Embedding>) -> Self {
        self.vehicle_embedding = embedding.into();
        self
    }

    pub fn driver_embedding(mut self, embedding: impl Into<Embedding>) -> Self {
        self.driver_embedding = embedding.into();
        self
    }

    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn build(self) -> Snapshot {
        Snapshot {
            track_id: self.track_id,
            frame: self.frame,
            bbox: self.bbox,
            vehicle_crop: self.vehicle_crop,
            driver_crops: self.driver_crops,
            vehicle_embedding: self.vehicle_embedding,
            driver_embedding: self.driver_embedding,
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            side: self.side,
        }
    }
}
