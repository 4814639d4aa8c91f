//! Cross-stream matching of exit clusters to entry clusters.
//!
//! Each exit cluster is scored against every entry cluster with a weighted sum
//! of vehicle and driver centroid similarity, and the highest-scoring entry is
//! kept. Selection is greedy per exit cluster: one entry cluster may be the
//! best candidate for several exit clusters.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cluster::VehicleCluster;
use crate::config::MatcherConfig;
use crate::embedding::optional_similarity;
use crate::snapshot::SampleRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    /// Same vehicle and driver with enough combined confidence
    Verified,
    /// A candidate exists but the combined score is too low
    Mismatch,
    /// Nothing comparable on the entry side
    Unknown,
}

/// Outcome for one exit cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub id: String,
    pub exit_cluster_id: String,
    pub entry_cluster_id: Option<String>,
    pub vehicle_similarity: f32,
    pub driver_similarity: f32,
    pub overall_score: f32,
    pub status: MatchStatus,
    pub reason: String,
    pub exit_sample: Option<SampleRef>,
    pub entry_sample: Option<SampleRef>,
}

/// Similarities of one exit/entry pair.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    entry_idx: usize,
    vehicle: f32,
    driver: f32,
    overall: f32,
}

#[derive(Debug, Clone, Default)]
pub struct Matcher {
    config: MatcherConfig,
}

impl Matcher {
    pub fn new(config: MatcherConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Weighted fusion of the two similarity signals.
    pub fn fuse(&self, vehicle_similarity: f32, driver_similarity: f32) -> f32 {
        self.config.vehicle_weight * vehicle_similarity + self.config.driver_weight * driver_similarity
    }

    /// Status for a candidate that has comparable driver data. Inclusive at
    /// `match_threshold`.
    pub fn classify(&self, overall_score: f32) -> MatchStatus {
        if overall_score >= self.config.match_threshold {
            MatchStatus::Verified
        } else {
            MatchStatus::Mismatch
        }
    }

    /// One result per exit cluster, in exit order.
    pub fn match_clusters(&self, entries: &[VehicleCluster], exits: &[VehicleCluster]) -> Vec<MatchResult> {
        let entry_has_driver = entries.iter().any(|c| c.driver_centroid().is_some());
        exits
            .iter()
            .map(|exit| self.match_one(exit, entries, entry_has_driver))
            .collect()
    }

    fn match_one(&self, exit: &VehicleCluster, entries: &[VehicleCluster], entry_has_driver: bool) -> MatchResult {
        let best = self.best_candidate(exit, entries);

        let mut result = MatchResult {
            id: format!("M-{}", exit.id()),
            exit_cluster_id: exit.id().to_string(),
            entry_cluster_id: None,
            vehicle_similarity: 0.0,
            driver_similarity: 0.0,
            overall_score: 0.0,
            status: MatchStatus::Unknown,
            reason: String::new(),
            exit_sample: exit.representative(),
            entry_sample: None,
        };

        let Some(best) = best else {
            result.reason = "no comparable driver profile: no entry clusters to compare against".to_string();
            debug!(exit = exit.id(), "unknown: entry side is empty");
            return result;
        };

        result.vehicle_similarity = best.vehicle;
        result.driver_similarity = best.driver;
        result.overall_score = best.overall;

        if best.driver < self.config.driver_threshold && !entry_has_driver {
            result.reason = format!(
                "no comparable driver profile: no entry cluster has a driver embedding \
                 (best vehicle similarity {:.2})",
                best.vehicle
            );
            debug!(exit = exit.id(), "unknown: no entry driver profile");
            return result;
        }

        let entry = &entries[best.entry_idx];
        result.entry_cluster_id = Some(entry.id().to_string());
        result.entry_sample = entry.representative();
        result.status = self.classify(best.overall);
        result.reason = match result.status {
            MatchStatus::Verified => format!(
                "verified: combined score {:.2} >= {:.2} (vehicle {:.2}, driver {:.2})",
                best.overall, self.config.match_threshold, best.vehicle, best.driver
            ),
            _ => format!(
                "possible vehicle or driver swap: combined score {:.2} < {:.2} (vehicle {:.2}, driver {:.2})",
                best.overall, self.config.match_threshold, best.vehicle, best.driver
            ),
        };
        debug!(
            exit = exit.id(),
            entry = entry.id(),
            overall = best.overall,
            status = ?result.status,
            "matched"
        );
        result
    }

    /// Highest fused score over entries; strict `>` keeps the earliest on ties.
    fn best_candidate(&self, exit: &VehicleCluster, entries: &[VehicleCluster]) -> Option<Candidate> {
        let mut best: Option<Candidate> = None;
        for (entry_idx, entry) in entries.iter().enumerate() {
            let vehicle = optional_similarity(exit.vehicle_centroid(), entry.vehicle_centroid());
            let driver = optional_similarity(exit.driver_centroid(), entry.driver_centroid());
            let overall = self.fuse(vehicle, driver);
            if best.is_none_or(|b| overall > b.overall) {
                best = Some(Candidate {
                    entry_idx,
                    vehicle,
                    driver,
                    overall,
                });
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{Snapshot, StreamSide};

    fn cluster(id: &str, side: StreamSide, vehicle: &[f32], driver: &[f32]) -> VehicleCluster {
        let snap = Snapshot::builder(1, side)
            .vehicle_embedding(vehicle.to_vec())
            .driver_embedding(driver.to_vec())
            .build();
        VehicleCluster::new(id, snap)
    }

    #[test]
    fn test_classify_boundary() {
        let matcher = Matcher::default();
        assert_eq!(matcher.classify(0.65), MatchStatus::Verified);
        assert_eq!(matcher.classify(0.649999), MatchStatus::Mismatch);
    }

    #[test]
    fn test_fuse_uses_configured_weights() {
        let matcher = Matcher::new(MatcherConfig {
            vehicle_weight: 0.4,
            driver_weight: 0.6,
            ..MatcherConfig::default()
        });
        assert!((matcher.fuse(1.0, 0.5) - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_no_entries_is_unknown() {
        let exits = vec![cluster("EX-1", StreamSide::Exit, &[1.0, 0.0], &[1.0, 0.0])];
        let results = Matcher::default().match_clusters(&[], &exits);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, MatchStatus::Unknown);
        assert!(results[0].entry_cluster_id.is_none());
        assert_eq!(results[0].id, "M-EX-1");
    }

    #[test]
    fn test_exit_without_driver_still_matches_when_entries_have_drivers() {
        let entries = vec![cluster("EN-1", StreamSide::Entry, &[1.0, 0.0], &[1.0, 0.0])];
        let exits = vec![cluster("EX-1", StreamSide::Exit, &[1.0, 0.0], &[])];
        let results = Matcher::default().match_clusters(&entries, &exits);
        // 0.6 * 1.0 + 0.4 * 0.0 = 0.6 < 0.65
        assert_eq!(results[0].status, MatchStatus::Mismatch);
        assert_eq!(results[0].entry_cluster_id.as_deref(), Some("EN-1"));
        assert!((results[0].overall_score - 0.6).abs() < 1e-6);
    }
}
