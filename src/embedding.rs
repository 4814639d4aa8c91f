//! Fixed-length appearance vectors and the similarity math used on them.
//!
//! Embedders never return "nothing": when a vector cannot be produced they hand
//! back an all-zero vector, the *absent* sentinel. Cosine similarity against an
//! absent vector is defined as 0.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding(Array1<f32>);

impl Embedding {
    pub fn new(values: Array1<f32>) -> Self {
        Self(values)
    }

    pub fn from_vec(values: Vec<f32>) -> Self {
        Self(Array1::from_vec(values))
    }

    /// The absent sentinel of the given dimension.
    pub fn absent(dim: usize) -> Self {
        Self(Array1::zeros(dim))
    }

    pub fn dim(&self) -> usize {
        self.0.len()
    }

    pub fn values(&self) -> &Array1<f32> {
        &self.0
    }

    pub fn as_slice(&self) -> Option<&[f32]> {
        self.0.as_slice()
    }

    pub fn norm(&self) -> f32 {
        self.0.dot(&self.0).sqrt()
    }

    /// True for the zero sentinel, and for vectors that cannot be normalized.
    pub fn is_absent(&self) -> bool {
        let norm = self.norm();
        norm == 0.0 || !norm.is_finite()
    }

    /// Unit-length copy, or `None` if this vector is absent.
    pub fn normalized(&self) -> Option<Self> {
        if self.is_absent() {
            return None;
        }
        Some(Self(&self.0 / self.norm()))
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(values: Vec<f32>) -> Self {
        Self::from_vec(values)
    }
}

/// `dot(a, b) / (|a| |b|)`. Never assumes unit length.
///
/// Returns 0 if either side is absent or the dimensions differ.
pub fn cosine_similarity(a: &Embedding, b: &Embedding) -> f32 {
    if a.dim() != b.dim() {
        return 0.0;
    }
    let denom = a.norm() * b.norm();
    if denom == 0.0 || !denom.is_finite() {
        return 0.0;
    }
    (a.0.dot(&b.0) / denom).clamp(-1.0, 1.0)
}

/// Cosine similarity over optional centroids; a missing side scores 0.
pub fn optional_similarity(a: Option<&Embedding>, b: Option<&Embedding>) -> f32 {
    match (a, b) {
        (Some(a), Some(b)) => cosine_similarity(a, b),
        _ => 0.0,
    }
}

/// L2-normalized arithmetic mean of the present embeddings.
///
/// Absent vectors are skipped. Returns `None` when nothing is left, when the
/// present vectors disagree on dimension, or when the mean itself is zero.
pub fn centroid<'a, I>(embeddings: I) -> Option<Embedding>
where
    I: IntoIterator<Item = &'a Embedding>,
{
    let mut sum: Option<Array1<f64>> = None;
    let mut count = 0usize;
    for emb in embeddings.into_iter().filter(|e| !e.is_absent()) {
        let acc = sum.get_or_insert_with(|| Array1::zeros(emb.dim()));
        if acc.len() != emb.dim() {
            return None;
        }
        acc.zip_mut_with(&emb.0, |s, &v| *s += f64::from(v));
        count += 1;
    }

    let mean = sum? / count as f64;
    Embedding(mean.mapv(|v| v as f32)).normalized()
}
