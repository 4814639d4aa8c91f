//! Error types.
//!
//! [`ReconcileError`] is fatal to a run and surfaces before clustering starts.
//! [`FrameError`] is a transient per-frame fault: it is logged and the frame is
//! skipped.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReconcileError>;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("stream source {path:?} is unavailable: {reason}")]
    SourceUnavailable { path: PathBuf, reason: String },

    #[error("{what} embedding dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to read configuration: {0}")]
    ConfigRead(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    #[error("failed to build embedding worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("failed to decode frame {path:?}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("detector failed: {0}")]
    Detector(String),

    #[error("tracker association failed: {0}")]
    Tracker(String),
}
