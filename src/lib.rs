//! Appearance-based reconciliation of vehicles and drivers between an entry
//! and an exit checkpoint.
//!
//! Each checkpoint stream is tracked with ByteTrack, one forensic
//! [`Snapshot`] is captured per track once a driver face is visible, and the
//! snapshots are clustered per stream. Every exit cluster is then scored
//! against the entry clusters and labelled [`MatchStatus::Verified`],
//! [`MatchStatus::Mismatch`] or [`MatchStatus::Unknown`].

pub mod capture;
pub mod cluster;
pub mod config;
pub mod detection;
pub mod embedding;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod integration;
pub mod matcher;
pub mod pipeline;
pub mod snapshot;
pub mod stream;
pub mod tracker;

pub use capture::{CaptureGate, CaptureState};
pub use cluster::{ClusterEngine, VehicleCluster};
pub use config::{ClusterConfig, ClusterMode, EmbeddingConfig, MatcherConfig, PipelineConfig};
pub use detection::{Detection, VehicleClass};
pub use embedding::{Embedding, cosine_similarity};
pub use error::{FrameError, ReconcileError, Result};
pub use frame::{Frame, FrameRef};
pub use geometry::{PixelRegion, Rect};
pub use matcher::{MatchResult, MatchStatus, Matcher};
pub use pipeline::{Pipeline, RunReport, RunSummary, StreamSummary};
pub use snapshot::{SampleRef, Snapshot, StreamSide};
pub use stream::{EmbeddingStage, StreamProcessor, StreamRun};
pub use tracker::{ByteTracker, TrackId, Tracker, TrackerConfig};
