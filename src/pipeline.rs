//! End-to-end reconciliation of one entry stream against one exit stream.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cluster::{ClusterEngine, VehicleCluster};
use crate::config::PipelineConfig;
use crate::embedding::Embedding;
use crate::error::{ReconcileError, Result};
use crate::integration::{Detector, FaceLocalizer, FrameSource};
use crate::matcher::{MatchResult, MatchStatus, Matcher};
use crate::snapshot::{Snapshot, StreamSide};
use crate::stream::{StreamProcessor, StreamRun};
use crate::tracker::Tracker;

/// Per-stream counters of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSummary {
    pub frames_processed: usize,
    pub frames_skipped: usize,
    pub tracks_seen: usize,
    pub snapshots: usize,
    pub clusters: usize,
}

impl StreamSummary {
    fn from_run(run: &StreamRun) -> Self {
        Self {
            frames_processed: run.frames_processed,
            frames_skipped: run.frames_skipped,
            tracks_seen: run.tracks_seen,
            snapshots: run.snapshots.len(),
            clusters: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub entry: StreamSummary,
    pub exit: StreamSummary,
    pub verified: usize,
    pub mismatched: usize,
    pub unknown: usize,
}

impl RunSummary {
    fn tally(&mut self, results: &[MatchResult]) {
        for result in results {
            match result.status {
                MatchStatus::Verified => self.verified += 1,
                MatchStatus::Mismatch => self.mismatched += 1,
                MatchStatus::Unknown => self.unknown += 1,
            }
        }
    }
}

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub summary: RunSummary,
    pub entry_clusters: Vec<VehicleCluster>,
    pub exit_clusters: Vec<VehicleCluster>,
    /// One per exit cluster, in exit-cluster order
    pub results: Vec<MatchResult>,
}

/// Owns both stream processors plus the clustering and matching stages.
pub struct Pipeline<D, T, F> {
    entry: StreamProcessor<D, T, F>,
    exit: StreamProcessor<D, T, F>,
    clusters: ClusterEngine,
    matcher: Matcher,
}

impl<D, T, F> Pipeline<D, T, F>
where
    D: Detector + Send,
    T: Tracker + Send,
    F: FaceLocalizer + Send,
{
    /// Fails if the configuration is invalid, the processors are wired to the
    /// wrong sides, or the two sides embed into different dimensions.
    pub fn new(
        config: &PipelineConfig,
        entry: StreamProcessor<D, T, F>,
        exit: StreamProcessor<D, T, F>,
    ) -> Result<Self> {
        config.validate()?;
        if entry.side() != StreamSide::Entry || exit.side() != StreamSide::Exit {
            return Err(ReconcileError::InvalidConfig(format!(
                "expected entry and exit processors, got {} and {}",
                entry.side(),
                exit.side()
            )));
        }
        let (entry_stage, exit_stage) = (entry.embedding(), exit.embedding());
        same_dimension("vehicle", entry_stage.vehicle_dimension(), exit_stage.vehicle_dimension())?;
        same_dimension("driver", entry_stage.driver_dimension(), exit_stage.driver_dimension())?;
        Ok(Self {
            entry,
            exit,
            clusters: ClusterEngine::new(config.cluster.clone()),
            matcher: Matcher::new(config.matcher.clone()),
        })
    }

    pub fn entry(&self) -> &StreamProcessor<D, T, F> {
        &self.entry
    }

    pub fn exit(&self) -> &StreamProcessor<D, T, F> {
        &self.exit
    }

    /// Process both streams concurrently, then cluster each side and match
    /// exit clusters against entry clusters.
    ///
    /// Both sources are opened before any frame is processed, so an
    /// unavailable source fails the run without partial results.
    pub fn run(&mut self, entry_source: &dyn FrameSource, exit_source: &dyn FrameSource) -> Result<RunReport> {
        let entry_frames = entry_source.open()?;
        let exit_frames = exit_source.open()?;

        let (entry, exit) = (&mut self.entry, &mut self.exit);
        let (entry_run, exit_run) = rayon::join(|| entry.process(entry_frames), || exit.process(exit_frames));

        check_dimensions(entry_run.snapshots.iter().chain(&exit_run.snapshots))?;

        let mut summary = RunSummary {
            entry: StreamSummary::from_run(&entry_run),
            exit: StreamSummary::from_run(&exit_run),
            ..RunSummary::default()
        };

        let entry_clusters = self.clusters.cluster(entry_run.snapshots);
        let exit_clusters = self.clusters.cluster(exit_run.snapshots);
        let results = self.matcher.match_clusters(&entry_clusters, &exit_clusters);

        summary.entry.clusters = entry_clusters.len();
        summary.exit.clusters = exit_clusters.len();
        summary.tally(&results);
        info!(
            entry_snapshots = summary.entry.snapshots,
            exit_snapshots = summary.exit.snapshots,
            entry_clusters = summary.entry.clusters,
            exit_clusters = summary.exit.clusters,
            verified = summary.verified,
            mismatched = summary.mismatched,
            unknown = summary.unknown,
            "reconciliation finished"
        );

        Ok(RunReport {
            summary,
            entry_clusters,
            exit_clusters,
            results,
        })
    }
}

fn same_dimension(what: &'static str, expected: usize, found: usize) -> Result<()> {
    if expected != found {
        return Err(ReconcileError::DimensionMismatch { what, expected, found });
    }
    Ok(())
}

/// Second guard for embedders whose output length disagrees with their
/// declared dimension. All present vehicle embeddings must share one dimension, and likewise for
/// driver embeddings. Absent vectors are ignored.
pub fn check_dimensions<'a, I>(snapshots: I) -> Result<()>
where
    I: IntoIterator<Item = &'a Snapshot>,
{
    let mut vehicle_dim: Option<usize> = None;
    let mut driver_dim: Option<usize> = None;
    for snap in snapshots {
        expect_dim(&mut vehicle_dim, "vehicle", snap.vehicle_embedding())?;
        expect_dim(&mut driver_dim, "driver", snap.driver_embedding())?;
    }
    Ok(())
}

fn expect_dim(seen: &mut Option<usize>, what: &'static str, emb: &Embedding) -> Result<()> {
    if emb.is_absent() {
        return Ok(());
    }
    match *seen {
        None => {
            *seen = Some(emb.dim());
            Ok(())
        }
        Some(expected) if expected != emb.dim() => Err(ReconcileError::DimensionMismatch {
            what,
            expected,
            found: emb.dim(),
        }),
        Some(_) => Ok(()),
    }
}
