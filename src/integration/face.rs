//! Driver-face localization inside a vehicle box.

use image::RgbImage;

use crate::frame::Frame;
use crate::geometry::{PixelRegion, Rect};

/// Finds driver faces for one vehicle.
pub trait FaceLocalizer {
    /// Face regions in frame coordinates; empty when none are found or trusted.
    fn locate_driver_faces(&mut self, frame: &Frame, vehicle: PixelRegion) -> Vec<PixelRegion>;
}

/// Raw face detector over an arbitrary image, returning boxes in that image's
/// coordinates.
pub trait FaceDetector {
    fn detect_faces(&mut self, image: &RgbImage) -> Vec<Rect>;
}

/// Rejects faces that are too small, too flat, or badly exposed.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceQuality {
    pub min_side: u32,
    /// Minimum standard deviation of grey levels
    pub min_contrast: f32,
    pub min_brightness: f32,
    pub max_brightness: f32,
}

impl Default for FaceQuality {
    fn default() -> Self {
        Self {
            min_side: 20,
            min_contrast: 10.0,
            min_brightness: 15.0,
            max_brightness: 240.0,
        }
    }
}

impl FaceQuality {
    pub fn accepts(&self, face: &RgbImage) -> bool {
        if face.width() < self.min_side || face.height() < self.min_side {
            return false;
        }
        let n = (face.width() * face.height()) as f64;
        let (sum, sum_sq) = face.pixels().fold((0.0f64, 0.0f64), |(s, sq), p| {
            let [r, g, b] = p.0;
            let grey = 0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b);
            (s + grey, sq + grey * grey)
        });
        let mean = sum / n;
        let std = (sum_sq / n - mean * mean).max(0.0).sqrt();
        std >= f64::from(self.min_contrast)
            && mean >= f64::from(self.min_brightness)
            && mean <= f64::from(self.max_brightness)
    }
}

/// Search windows as fractions of the vehicle box (x1, y1, x2, y2), most
/// likely driver position first: right-upper, left-upper, centre-upper, whole.
const DRIVER_WINDOWS: [(f32, f32, f32, f32); 4] = [
    (0.4, 0.0, 1.0, 0.6),
    (0.0, 0.0, 0.6, 0.6),
    (0.25, 0.0, 0.75, 0.5),
    (0.0, 0.0, 1.0, 1.0),
];

/// Runs a [`FaceDetector`] over driver-side windows of the vehicle and returns
/// the first window's faces that pass [`FaceQuality`].
pub struct RegionFaceLocalizer<F: FaceDetector> {
    detector: F,
    quality: FaceQuality,
}

impl<F: FaceDetector> RegionFaceLocalizer<F> {
    pub fn new(detector: F) -> Self {
        Self {
            detector,
            quality: FaceQuality::default(),
        }
    }

    pub fn with_quality(mut self, quality: FaceQuality) -> Self {
        self.quality = quality;
        self
    }

    pub fn detector(&self) -> &F {
        &self.detector
    }
}

impl<F: FaceDetector> FaceLocalizer for RegionFaceLocalizer<F> {
    fn locate_driver_faces(&mut self, frame: &Frame, vehicle: PixelRegion) -> Vec<PixelRegion> {
        let vehicle = vehicle.to_rect();
        for (fx1, fy1, fx2, fy2) in DRIVER_WINDOWS {
            let Some(window) = vehicle
                .fraction(fx1, fy1, fx2, fy2)
                .clip_to_frame(frame.width(), frame.height())
            else {
                continue;
            };
            let crop = frame.crop(window);

            let faces: Vec<PixelRegion> = self
                .detector
                .detect_faces(&crop)
                .into_iter()
                .filter_map(|face| face.clip_to_frame(window.width, window.height))
                .filter(|face| {
                    let pixels = image::imageops::crop_imm(&crop, face.x, face.y, face.width, face.height);
                    self.quality.accepts(&pixels.to_image())
                })
                .map(|face| PixelRegion {
                    x: face.x + window.x,
                    y: face.y + window.y,
                    ..face
                })
                .collect();

            if !faces.is_empty() {
                tracing::trace!(faces = faces.len(), ?window, "driver faces found");
                return faces;
            }
        }
        Vec::new()
    }
}
