//! Appearance embedders and the model-free HSV histogram implementation.

use image::RgbImage;
use ndarray::Array1;

use crate::embedding::Embedding;

/// Turns one or more crops into a fixed-length appearance vector.
///
/// Implementations must not fail: if no vector can be produced they return
/// [`Embedding::absent`] of their [`dimension`](Embedder::dimension).
/// Embedders are shared between worker threads.
pub trait Embedder: Send + Sync {
    fn dimension(&self) -> usize;

    fn embed(&self, crops: &[RgbImage]) -> Embedding;
}

pub const HISTOGRAM_DIM: usize = 512;

/// Hue range in the 8-bit HSV convention (degrees / 2).
const HUE_RANGE: f32 = 180.0;
const CHANNEL_BINS: usize = 64;
const JOINT_BINS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistogramLayout {
    /// Separate 64-bin H, S and V histograms, concatenated and zero-padded.
    PerChannel,
    /// One 8x8x8 joint H/S/V histogram.
    Joint,
}

/// Colour-profile embedder for deployments without a learned model.
///
/// Each crop's histogram is L2-normalized, the crops are averaged, and the
/// average is normalized again, so large crops do not dominate small ones.
#[derive(Debug, Clone)]
pub struct HistogramEmbedder {
    layout: HistogramLayout,
}

impl HistogramEmbedder {
    pub fn new(layout: HistogramLayout) -> Self {
        Self { layout }
    }

    /// Per-channel layout, suited to whole-vehicle crops.
    pub fn vehicle() -> Self {
        Self::new(HistogramLayout::PerChannel)
    }

    /// Joint layout, suited to face crops.
    pub fn driver() -> Self {
        Self::new(HistogramLayout::Joint)
    }

    fn histogram(&self, crop: &RgbImage) -> Array1<f32> {
        let mut hist = Array1::<f32>::zeros(HISTOGRAM_DIM);
        for pixel in crop.pixels() {
            let (h, s, v) = rgb_to_hsv(pixel.0);
            match self.layout {
                HistogramLayout::PerChannel => {
                    hist[bin(h, HUE_RANGE, CHANNEL_BINS)] += 1.0;
                    hist[CHANNEL_BINS + bin(s, 256.0, CHANNEL_BINS)] += 1.0;
                    hist[2 * CHANNEL_BINS + bin(v, 256.0, CHANNEL_BINS)] += 1.0;
                }
                HistogramLayout::Joint => {
                    let idx = (bin(h, HUE_RANGE, JOINT_BINS) * JOINT_BINS + bin(s, 256.0, JOINT_BINS))
                        * JOINT_BINS
                        + bin(v, 256.0, JOINT_BINS);
                    hist[idx] += 1.0;
                }
            }
        }
        hist
    }
}

impl Embedder for HistogramEmbedder {
    fn dimension(&self) -> usize {
        HISTOGRAM_DIM
    }

    fn embed(&self, crops: &[RgbImage]) -> Embedding {
        let per_crop = crops
            .iter()
            .filter(|c| c.width() > 0 && c.height() > 0)
            .filter_map(|c| Embedding::new(self.histogram(c)).normalized())
            .collect::<Vec<_>>();
        crate::embedding::centroid(per_crop.iter()).unwrap_or_else(|| Embedding::absent(HISTOGRAM_DIM))
    }
}

fn bin(value: f32, range: f32, bins: usize) -> usize {
    ((value / range * bins as f32) as usize).min(bins - 1)
}

/// 8-bit RGB to HSV with H in [0, 180), S and V in [0, 255].
fn rgb_to_hsv([r, g, b]: [u8; 3]) -> (f32, f32, f32) {
    let (r, g, b) = (f32::from(r), f32::from(g), f32::from(b));
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let s = if max > 0.0 { delta / max * 255.0 } else { 0.0 };
    let mut h = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (g - b) / delta
    } else if max == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    if h < 0.0 {
        h += 360.0;
    }
    (h / 2.0, s, max)
}
