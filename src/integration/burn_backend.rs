//! Burn inference backend for appearance embeddings.
//!
//! # Example
//!
//! ```ignore
//! use checkpoint_reid::integration::{BurnEmbedder, BurnModel};
//! use burn::backend::NdArray;
//!
//! struct ReidNet { /* ... */ }
//!
//! impl BurnModel<NdArray> for ReidNet {
//!     fn forward(&self, input: burn::tensor::Tensor<NdArray, 4>) -> Vec<f32> {
//!         // Run inference, return one feature vector
//!     }
//!
//!     fn output_dim(&self) -> usize {
//!         2048
//!     }
//! }
//!
//! let embedder = BurnEmbedder::new(ReidNet::load("reid.bin"), Default::default());
//! ```

use burn::prelude::*;
use burn::tensor::Tensor;
use image::RgbImage;
use image::imageops::{self, FilterType};
use ndarray::Array1;

use super::Embedder;
use crate::embedding::{Embedding, centroid};

/// Trait for Burn-based re-identification models.
pub trait BurnModel<B: Backend>: Send + Sync {
    /// Feature vector for an input of shape [1, channels, height, width].
    fn forward(&self, input: Tensor<B, 4>) -> Vec<f32>;

    /// Length of the vector returned by [`forward`](BurnModel::forward).
    fn output_dim(&self) -> usize;

    /// Expected input size (channels, height, width).
    fn input_size(&self) -> (u32, u32, u32) {
        (3, 256, 128) // Common person/vehicle re-id input size
    }
}

/// Runs a [`BurnModel`] over each crop and averages the per-crop features.
pub struct BurnEmbedder<B: Backend, M: BurnModel<B>> {
    model: M,
    device: B::Device,
}

impl<B: Backend, M: BurnModel<B>> BurnEmbedder<B, M> {
    pub fn new(model: M, device: B::Device) -> Self {
        Self { model, device }
    }

    /// Resize to the model input and lay out as CHW in [0, 1].
    pub fn preprocess(&self, crop: &RgbImage) -> Tensor<B, 4> {
        let (channels, height, width) = self.model.input_size();
        let resized = imageops::resize(crop, width, height, FilterType::Triangle);

        let plane = (width * height) as usize;
        let mut data = vec![0.0f32; channels as usize * plane];
        for (i, pixel) in resized.pixels().enumerate() {
            for c in 0..(channels as usize).min(3) {
                data[c * plane + i] = f32::from(pixel.0[c]) / 255.0;
            }
        }

        Tensor::<B, 1>::from_floats(data.as_slice(), &self.device).reshape([
            1,
            channels as usize,
            height as usize,
            width as usize,
        ])
    }
}

impl<B, M> Embedder for BurnEmbedder<B, M>
where
    B: Backend,
    B::Device: Sync,
    M: BurnModel<B>,
{
    fn dimension(&self) -> usize {
        self.model.output_dim()
    }

    fn embed(&self, crops: &[RgbImage]) -> Embedding {
        let dim = self.dimension();
        let features: Vec<Embedding> = crops
            .iter()
            .filter(|c| c.width() > 0 && c.height() > 0)
            .filter_map(|crop| {
                let output = self.model.forward(self.preprocess(crop));
                if output.len() != dim {
                    tracing::warn!(expected = dim, found = output.len(), "model output has wrong length");
                    return None;
                }
                Embedding::new(Array1::from_vec(output)).normalized()
            })
            .collect();
        centroid(features.iter()).unwrap_or_else(|| Embedding::absent(dim))
    }
}
