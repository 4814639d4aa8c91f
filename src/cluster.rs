//! Online grouping of one stream's snapshots into vehicle clusters.
//!
//! Snapshots are consumed once, in arrival order. Each one either joins the
//! most similar existing cluster or starts a new one; clusters are never merged
//! afterwards, so the outcome depends only on the input order.

use std::collections::HashMap;

use tracing::debug;

use crate::config::{ClusterConfig, ClusterMode};
use crate::embedding::{Embedding, centroid, cosine_similarity};
use crate::snapshot::{SampleRef, Snapshot, StreamSide};
use crate::tracker::TrackId;

/// The snapshots believed to show one physical vehicle within one stream.
#[derive(Debug, Clone)]
pub struct VehicleCluster {
    id: String,
    side: StreamSide,
    members: Vec<Snapshot>,
    vehicle_centroid: Option<Embedding>,
    driver_centroid: Option<Embedding>,
}

impl VehicleCluster {
    pub fn new(id: impl Into<String>, first: Snapshot) -> Self {
        let mut cluster = Self {
            id: id.into(),
            side: first.side(),
            members: vec![first],
            vehicle_centroid: None,
            driver_centroid: None,
        };
        cluster.recompute_centroids();
        cluster
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn side(&self) -> StreamSide {
        self.side
    }

    /// Members in insertion order.
    pub fn members(&self) -> &[Snapshot] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn vehicle_centroid(&self) -> Option<&Embedding> {
        self.vehicle_centroid.as_ref()
    }

    pub fn driver_centroid(&self) -> Option<&Embedding> {
        self.driver_centroid.as_ref()
    }

    /// The first capture, shown as the cluster's representative.
    pub fn representative(&self) -> Option<SampleRef> {
        self.members.first().map(Snapshot::sample_ref)
    }

    pub fn push(&mut self, snapshot: Snapshot) {
        self.members.push(snapshot);
        self.recompute_centroids();
    }

    /// Rebuild both centroids from scratch over the current members.
    fn recompute_centroids(&mut self) {
        self.vehicle_centroid = centroid(self.members.iter().map(Snapshot::vehicle_embedding));
        self.driver_centroid = centroid(self.members.iter().map(Snapshot::driver_embedding));
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClusterEngine {
    config: ClusterConfig,
}

impl ClusterEngine {
    pub fn new(config: ClusterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    pub fn cluster(&self, snapshots: Vec<Snapshot>) -> Vec<VehicleCluster> {
        let clusters = match self.config.mode {
            ClusterMode::Similarity => self.cluster_by_similarity(snapshots),
            ClusterMode::TrackId => cluster_by_track(snapshots),
        };
        debug!(clusters = clusters.len(), mode = ?self.config.mode, "clustering finished");
        clusters
    }

    fn cluster_by_similarity(&self, snapshots: Vec<Snapshot>) -> Vec<VehicleCluster> {
        let threshold = self.config.vehicle_similarity_threshold;
        let mut clusters: Vec<VehicleCluster> = Vec::new();

        for snap in snapshots {
            if snap.vehicle_embedding().is_absent() {
                debug!(track_id = snap.track_id(), "no vehicle embedding; singleton cluster");
                let id = next_cluster_id(snap.side(), clusters.len());
                clusters.push(VehicleCluster::new(id, snap));
                continue;
            }

            // Strict `>` keeps the earliest cluster on ties.
            let mut best: Option<(usize, f32)> = None;
            for (idx, cluster) in clusters.iter().enumerate() {
                let Some(centroid) = cluster.vehicle_centroid() else {
                    continue;
                };
                let sim = cosine_similarity(snap.vehicle_embedding(), centroid);
                if best.is_none_or(|(_, best_sim)| sim > best_sim) {
                    best = Some((idx, sim));
                }
            }

            match best {
                Some((idx, sim)) if sim >= threshold => {
                    debug!(track_id = snap.track_id(), cluster = clusters[idx].id(), sim, "joined cluster");
                    clusters[idx].push(snap);
                }
                _ => {
                    let id = next_cluster_id(snap.side(), clusters.len());
                    debug!(track_id = snap.track_id(), cluster = %id, "new cluster");
                    clusters.push(VehicleCluster::new(id, snap));
                }
            }
        }
        clusters
    }
}

fn cluster_by_track(snapshots: Vec<Snapshot>) -> Vec<VehicleCluster> {
    let mut clusters: Vec<VehicleCluster> = Vec::new();
    let mut by_track: HashMap<TrackId, usize> = HashMap::new();

    for snap in snapshots {
        match by_track.get(&snap.track_id()) {
            Some(&idx) => clusters[idx].push(snap),
            None => {
                by_track.insert(snap.track_id(), clusters.len());
                let id = next_cluster_id(snap.side(), clusters.len());
                clusters.push(VehicleCluster::new(id, snap));
            }
        }
    }
    clusters
}

fn next_cluster_id(side: StreamSide, existing: usize) -> String {
    format!("{}-{}", side.prefix(), existing + 1)
}
