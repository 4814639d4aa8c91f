//! Decoded frames and lightweight references back to them.

use std::path::PathBuf;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::geometry::PixelRegion;

/// Identifies the frame a capture was taken from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRef {
    /// Position in the stream, counting every frame the source yielded
    pub index: usize,
    /// Backing file, when the frame came from disk
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Frame {
    pub reference: FrameRef,
    pub image: RgbImage,
}

impl Frame {
    pub fn new(index: usize, image: RgbImage) -> Self {
        Self {
            reference: FrameRef { index, path: None },
            image,
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.reference.path = Some(path.into());
        self
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Copy out a region. The region must lie inside the frame.
    pub fn crop(&self, region: PixelRegion) -> RgbImage {
        image::imageops::crop_imm(&self.image, region.x, region.y, region.width, region.height)
            .to_image()
    }
}
