#![allow(dead_code)]

use std::collections::HashSet;
use std::convert::Infallible;
use std::io;
use std::sync::Arc;

use checkpoint_reid::integration::{Detector, Embedder, FaceLocalizer, FrameIter, FrameSource};
use checkpoint_reid::{
    ByteTracker, Detection, Embedding, EmbeddingStage, Frame, FrameError, PixelRegion, StreamProcessor, StreamSide,
    TrackId, Tracker, TrackerConfig,
};
use image::{Rgb, RgbImage};

pub const RED: [u8; 3] = [255, 0, 0];
pub const GREEN: [u8; 3] = [0, 255, 0];
pub const BLUE: [u8; 3] = [0, 0, 255];

/// A vehicle painted into a frame, with its driver patch right next to it.
#[derive(Debug, Clone, Copy)]
pub struct Car {
    pub x: u32,
    pub y: u32,
    pub body: [u8; 3],
    pub driver: [u8; 3],
}

pub const CAR_SIZE: u32 = 40;
pub const FACE_SIZE: u32 = 10;

impl Car {
    pub fn new(x: u32, y: u32, body: [u8; 3], driver: [u8; 3]) -> Self {
        Self { x, y, body, driver }
    }

    pub fn detection(&self) -> Detection {
        Detection::new(
            self.x as f32,
            self.y as f32,
            (self.x + CAR_SIZE) as f32,
            (self.y + CAR_SIZE) as f32,
            0.9,
        )
    }
}

pub fn paint(img: &mut RgbImage, x: u32, y: u32, w: u32, h: u32, colour: [u8; 3]) {
    for py in y..(y + h).min(img.height()) {
        for px in x..(x + w).min(img.width()) {
            img.put_pixel(px, py, Rgb(colour));
        }
    }
}

pub fn scene(cars: &[Car]) -> RgbImage {
    let mut img = RgbImage::new(200, 100);
    for car in cars {
        paint(&mut img, car.x, car.y, CAR_SIZE, CAR_SIZE, car.body);
        paint(&mut img, car.x + CAR_SIZE, car.y, FACE_SIZE, FACE_SIZE, car.driver);
    }
    img
}

/// Returns scripted detections by frame index and fails on chosen frames.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDetector {
    pub frames: Vec<Vec<Detection>>,
    pub fail_on: HashSet<usize>,
}

impl ScriptedDetector {
    pub fn repeating(cars: &[Car], frames: usize) -> Self {
        let dets: Vec<Detection> = cars.iter().map(Car::detection).collect();
        Self {
            frames: vec![dets; frames],
            fail_on: HashSet::new(),
        }
    }

    pub fn failing_on(mut self, frame: usize) -> Self {
        self.fail_on.insert(frame);
        self
    }
}

impl Detector for ScriptedDetector {
    type Error = io::Error;

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Self::Error> {
        let index = frame.reference.index;
        if self.fail_on.contains(&index) {
            return Err(io::Error::other(format!("detector crashed on frame {index}")));
        }
        Ok(self.frames.get(index).cloned().unwrap_or_default())
    }
}

/// Reports the driver patch painted by [`scene`], once `from_frame` is reached.
#[derive(Debug, Clone, Default)]
pub struct PatchFaceLocalizer {
    pub from_frame: usize,
    pub calls: usize,
}

impl PatchFaceLocalizer {
    pub fn from_frame(from_frame: usize) -> Self {
        Self { from_frame, calls: 0 }
    }
}

impl FaceLocalizer for PatchFaceLocalizer {
    fn locate_driver_faces(&mut self, frame: &Frame, vehicle: PixelRegion) -> Vec<PixelRegion> {
        self.calls += 1;
        if frame.reference.index < self.from_frame {
            return Vec::new();
        }
        vec![PixelRegion {
            x: vehicle.x + vehicle.width,
            y: vehicle.y,
            width: FACE_SIZE,
            height: FACE_SIZE,
        }]
    }
}

/// Mean RGB of all crop pixels, zero-padded to `dim`.
#[derive(Debug, Clone)]
pub struct MeanColourEmbedder {
    pub dim: usize,
}

impl Embedder for MeanColourEmbedder {
    fn dimension(&self) -> usize {
        self.dim
    }

    fn embed(&self, crops: &[RgbImage]) -> Embedding {
        let mut sum = [0.0f32; 3];
        let mut count = 0.0f32;
        for pixel in crops.iter().flat_map(|c| c.pixels()) {
            for c in 0..3 {
                sum[c] += f32::from(pixel.0[c]);
            }
            count += 1.0;
        }
        let mut values = vec![0.0; self.dim];
        if count > 0.0 {
            for c in 0..self.dim.min(3) {
                values[c] = sum[c] / count;
            }
        }
        Embedding::from_vec(values)
    }
}

/// Declares one dimension but emits another.
#[derive(Debug, Clone)]
pub struct MisreportingEmbedder {
    pub declared: usize,
    pub inner: MeanColourEmbedder,
}

impl Embedder for MisreportingEmbedder {
    fn dimension(&self) -> usize {
        self.declared
    }

    fn embed(&self, crops: &[RgbImage]) -> Embedding {
        self.inner.embed(crops)
    }
}

/// Binds every detection to the same track.
#[derive(Debug, Clone)]
pub struct FixedIdTracker {
    pub id: TrackId,
}

impl Tracker for FixedIdTracker {
    type Error = Infallible;

    fn associate(&mut self, detections: &[Detection]) -> Result<Vec<Option<TrackId>>, Self::Error> {
        Ok(vec![Some(self.id); detections.len()])
    }

    fn reset(&mut self) {}
}

pub fn embedding_stage(dim: usize) -> EmbeddingStage {
    EmbeddingStage::new(
        Arc::new(MeanColourEmbedder { dim }),
        Arc::new(MeanColourEmbedder { dim }),
        2,
    )
    .unwrap()
}

pub type TestProcessor = StreamProcessor<ScriptedDetector, ByteTracker, PatchFaceLocalizer>;

pub fn processor(side: StreamSide, detector: ScriptedDetector, faces: PatchFaceLocalizer) -> TestProcessor {
    StreamProcessor::new(
        side,
        detector,
        ByteTracker::new(TrackerConfig::default()),
        faces,
        embedding_stage(3),
    )
}

/// Yields in-memory frames, with decode failures at chosen positions.
pub struct FlakySource {
    pub images: Vec<RgbImage>,
    pub broken: HashSet<usize>,
}

impl FrameSource for FlakySource {
    fn open(&self) -> checkpoint_reid::Result<FrameIter<'_>> {
        Ok(Box::new(self.images.iter().enumerate().map(|(index, img)| {
            if self.broken.contains(&index) {
                Err(FrameError::Decode {
                    path: format!("frame_{index:04}.jpg").into(),
                    source: image::ImageError::IoError(io::Error::other("truncated file")),
                })
            } else {
                Ok(Frame::new(index, img.clone()))
            }
        })))
    }
}
