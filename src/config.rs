//! Run configuration, loadable from YAML.
//!
//! ```yaml
//! cluster:
//!   mode: similarity
//!   vehicle_similarity_threshold: 0.7
//! matcher:
//!   vehicle_weight: 0.6
//!   driver_weight: 0.4
//! ```
//!
//! Every section falls back to its defaults when omitted.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ReconcileError, Result};
use crate::tracker::TrackerConfig;

const WEIGHT_SUM_TOLERANCE: f32 = 1e-6;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub tracker: TrackerConfig,
    pub cluster: ClusterConfig,
    pub matcher: MatcherConfig,
    pub embedding: EmbeddingConfig,
}

/// How snapshots of one stream are grouped into vehicle clusters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterMode {
    /// Online greedy grouping by vehicle-embedding cosine similarity.
    #[default]
    Similarity,
    /// Group strictly by track id. For deployments without reliable embeddings.
    TrackId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub mode: ClusterMode,
    pub vehicle_similarity_threshold: f32,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            mode: ClusterMode::Similarity,
            vehicle_similarity_threshold: 0.7,
        }
    }
}

/// Fusion weights and classification thresholds for cross-stream matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    pub vehicle_weight: f32,
    pub driver_weight: f32,
    pub driver_threshold: f32,
    pub match_threshold: f32,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            vehicle_weight: 0.6,
            driver_weight: 0.4,
            driver_threshold: 0.6,
            match_threshold: 0.65,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Size of the worker pool used for embedding extraction.
    pub workers: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self { workers: 4 }
    }
}

impl PipelineConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let config: PipelineConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.cluster.validate()?;
        self.matcher.validate()?;
        if self.embedding.workers == 0 {
            return Err(invalid("embedding.workers must be at least 1"));
        }
        if self.tracker.frame_rate <= 0.0 {
            return Err(invalid("tracker.frame_rate must be positive"));
        }
        Ok(())
    }
}

impl ClusterConfig {
    pub fn validate(&self) -> Result<()> {
        let t = self.vehicle_similarity_threshold;
        if !(-1.0..=1.0).contains(&t) {
            return Err(invalid(format!(
                "cluster.vehicle_similarity_threshold must lie in [-1, 1], got {t}"
            )));
        }
        Ok(())
    }
}

impl MatcherConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, w) in [
            ("vehicle_weight", self.vehicle_weight),
            ("driver_weight", self.driver_weight),
        ] {
            if !(0.0..=1.0).contains(&w) {
                return Err(invalid(format!("matcher.{name} must lie in [0, 1], got {w}")));
            }
        }
        let sum = self.vehicle_weight + self.driver_weight;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(invalid(format!("matcher weights must sum to 1, got {sum}")));
        }
        for (name, t) in [
            ("driver_threshold", self.driver_threshold),
            ("match_threshold", self.match_threshold),
        ] {
            if !(-1.0..=1.0).contains(&t) {
                return Err(invalid(format!("matcher.{name} must lie in [-1, 1], got {t}")));
            }
        }
        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> ReconcileError {
    ReconcileError::InvalidConfig(msg.into())
}
