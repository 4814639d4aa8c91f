//! Collaborator seams: frame sources, detectors, driver-face localizers and
//! embedders, plus the model-free implementations that ship with the crate.

mod builder;
mod detector;
mod embedder;
mod face;
mod source;

pub use builder::DetectionBuilder;
pub use detector::Detector;
pub use embedder::{Embedder, HISTOGRAM_DIM, HistogramEmbedder, HistogramLayout};
pub use face::{FaceDetector, FaceLocalizer, FaceQuality, RegionFaceLocalizer};
pub use source::{DirectoryFrameSource, FrameIter, FrameSource, InMemoryFrames};

#[cfg(feature = "burn-backend")]
mod burn_backend;

#[cfg(feature = "burn-backend")]
pub use burn_backend::{BurnEmbedder, BurnModel};
