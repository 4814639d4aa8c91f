mod common;

use std::collections::HashSet;
use std::sync::Arc;

use checkpoint_reid::integration::{DirectoryFrameSource, FrameSource, InMemoryFrames};
use checkpoint_reid::{
    ByteTracker, Detection, EmbeddingStage, MatchStatus, Pipeline, PipelineConfig, ReconcileError, StreamProcessor,
    StreamSide,
};
use common::*;

fn frames(cars: &[Car], count: usize) -> InMemoryFrames {
    InMemoryFrames::new(vec![scene(cars); count])
}

fn pipeline(entry_cars: &[Car], exit_cars: &[Car], count: usize) -> Pipeline<ScriptedDetector, ByteTracker, PatchFaceLocalizer> {
    Pipeline::new(
        &PipelineConfig::default(),
        processor(
            StreamSide::Entry,
            ScriptedDetector::repeating(entry_cars, count),
            PatchFaceLocalizer::from_frame(0),
        ),
        processor(
            StreamSide::Exit,
            ScriptedDetector::repeating(exit_cars, count),
            PatchFaceLocalizer::from_frame(0),
        ),
    )
    .unwrap()
}

#[test]
fn test_same_car_same_driver_is_verified_and_swap_is_flagged() {
    let entry_cars = [Car::new(10, 10, RED, GREEN), Car::new(110, 10, BLUE, RED)];
    let exit_cars = [Car::new(10, 10, RED, GREEN), Car::new(110, 10, BLUE, BLUE)];

    let mut pipeline = pipeline(&entry_cars, &exit_cars, 5);
    let report = pipeline.run(&frames(&entry_cars, 5), &frames(&exit_cars, 5)).unwrap();

    // One capture per car despite five frames each.
    assert_eq!(report.summary.entry.snapshots, 2);
    assert_eq!(report.summary.exit.snapshots, 2);
    assert_eq!(report.summary.entry.frames_processed, 5);
    assert_eq!(report.entry_clusters.len(), 2);
    assert_eq!(report.exit_clusters.len(), 2);
    assert_eq!(report.entry_clusters[0].id(), "EN-1");
    assert_eq!(report.exit_clusters[1].id(), "EX-2");

    assert_eq!(report.results.len(), 2);
    let verified = &report.results[0];
    assert_eq!(verified.exit_cluster_id, "EX-1");
    assert_eq!(verified.entry_cluster_id.as_deref(), Some("EN-1"));
    assert_eq!(verified.status, MatchStatus::Verified);
    assert!((verified.overall_score - 1.0).abs() < 1e-5);

    // Same blue car, different driver: 0.6 * 1.0 + 0.4 * 0.0.
    let swapped = &report.results[1];
    assert_eq!(swapped.entry_cluster_id.as_deref(), Some("EN-2"));
    assert_eq!(swapped.status, MatchStatus::Mismatch);
    assert!((swapped.vehicle_similarity - 1.0).abs() < 1e-5);
    assert!(swapped.driver_similarity.abs() < 1e-5);
    assert!((swapped.overall_score - 0.6).abs() < 1e-5);

    assert_eq!(report.summary.verified, 1);
    assert_eq!(report.summary.mismatched, 1);
    assert_eq!(report.summary.unknown, 0);
}

#[test]
fn test_capture_waits_for_driver_face() {
    let cars = [Car::new(10, 10, RED, GREEN)];
    let mut processor = processor(
        StreamSide::Entry,
        ScriptedDetector::repeating(&cars, 6),
        PatchFaceLocalizer::from_frame(3),
    );
    let run = processor.process(frames(&cars, 6).open().unwrap());

    assert_eq!(run.snapshots.len(), 1);
    assert_eq!(run.snapshots[0].frame().index, 3);
    assert_eq!(run.snapshots[0].driver_crops().len(), 1);
    assert_eq!(run.snapshots[0].vehicle_crop().dimensions(), (40, 40));
    assert_eq!(run.tracks_seen, 1);
    // Frames 0 to 3 searched for a face; nothing after the capture.
    assert_eq!(processor.face_localizer().calls, 4);
}

#[test]
fn test_box_outside_frame_is_retried_later() {
    let cars = [Car::new(10, 10, RED, GREEN)];
    let off_frame = Detection::new(210.0, 10.0, 250.0, 50.0, 0.9);
    let detector = ScriptedDetector {
        frames: vec![vec![off_frame.clone()], vec![off_frame], vec![cars[0].detection()], vec![cars[0].detection()]],
        fail_on: HashSet::new(),
    };
    let mut processor = StreamProcessor::new(
        StreamSide::Entry,
        detector,
        FixedIdTracker { id: 7 },
        PatchFaceLocalizer::from_frame(0),
        embedding_stage(3),
    );
    let run = processor.process(frames(&cars, 4).open().unwrap());

    assert_eq!(run.frames_processed, 4);
    assert_eq!(run.snapshots.len(), 1);
    assert_eq!(run.snapshots[0].track_id(), 7);
    assert_eq!(run.snapshots[0].frame().index, 2);
    assert_eq!(run.snapshots[0].vehicle_crop().dimensions(), (40, 40));
    // No face search while the box was empty.
    assert_eq!(processor.face_localizer().calls, 1);
}

#[test]
fn test_frame_errors_are_skipped() {
    let cars = [Car::new(10, 10, RED, GREEN)];
    let source = FlakySource {
        images: vec![scene(&cars); 5],
        broken: HashSet::from([0, 2]),
    };
    let mut processor = processor(
        StreamSide::Exit,
        ScriptedDetector::repeating(&cars, 5).failing_on(1),
        PatchFaceLocalizer::from_frame(0),
    );
    let run = processor.process(source.open().unwrap());

    assert_eq!(run.frames_skipped, 3);
    assert_eq!(run.frames_processed, 2);
    assert_eq!(run.snapshots.len(), 1);
    assert_eq!(run.snapshots[0].frame().index, 3);
    assert_eq!(run.snapshots[0].side(), StreamSide::Exit);
}

#[test]
fn test_rerun_starts_from_clean_state() {
    let cars = [Car::new(10, 10, RED, GREEN)];
    let mut processor = processor(
        StreamSide::Entry,
        ScriptedDetector::repeating(&cars, 3),
        PatchFaceLocalizer::from_frame(0),
    );
    let first = processor.process(frames(&cars, 3).open().unwrap());
    let second = processor.process(frames(&cars, 3).open().unwrap());
    assert_eq!(first.snapshots.len(), 1);
    assert_eq!(second.snapshots.len(), 1);
    assert_eq!(first.snapshots[0].track_id(), second.snapshots[0].track_id());
}

#[test]
fn test_empty_streams_produce_empty_report() {
    let mut pipeline = pipeline(&[], &[], 0);
    let report = pipeline
        .run(&InMemoryFrames::default(), &InMemoryFrames::default())
        .unwrap();
    assert!(report.entry_clusters.is_empty());
    assert!(report.exit_clusters.is_empty());
    assert!(report.results.is_empty());
    assert_eq!(report.summary, Default::default());
}

#[test]
fn test_exit_without_entry_is_unknown() {
    let cars = [Car::new(10, 10, RED, GREEN)];
    let mut pipeline = pipeline(&[], &cars, 3);
    let report = pipeline.run(&InMemoryFrames::default(), &frames(&cars, 3)).unwrap();
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].status, MatchStatus::Unknown);
    assert!(report.results[0].entry_cluster_id.is_none());
    assert_eq!(report.summary.unknown, 1);
}

#[test]
fn test_missing_source_is_fatal() {
    let mut pipeline = pipeline(&[], &[], 0);
    let missing = DirectoryFrameSource::new("/no/such/checkpoint/entry");
    let result = pipeline.run(&missing, &InMemoryFrames::default());
    assert!(matches!(result, Err(ReconcileError::SourceUnavailable { .. })));
}

#[test]
fn test_embedder_dimension_mismatch_rejected_at_construction() {
    let entry = processor(StreamSide::Entry, ScriptedDetector::default(), PatchFaceLocalizer::default());
    // The exit side never finds a face, so it would never produce an embedding.
    let exit = StreamProcessor::new(
        StreamSide::Exit,
        ScriptedDetector::default(),
        ByteTracker::new(Default::default()),
        PatchFaceLocalizer::from_frame(99),
        embedding_stage(4),
    );
    assert!(matches!(
        Pipeline::new(&PipelineConfig::default(), entry, exit),
        Err(ReconcileError::DimensionMismatch { what: "vehicle", expected: 3, found: 4 })
    ));
}

#[test]
fn test_embedding_length_mismatch_is_fatal() {
    let cars = [Car::new(10, 10, RED, GREEN)];
    let entry = processor(
        StreamSide::Entry,
        ScriptedDetector::repeating(&cars, 2),
        PatchFaceLocalizer::from_frame(0),
    );
    let misreporting = EmbeddingStage::new(
        Arc::new(MisreportingEmbedder {
            declared: 3,
            inner: MeanColourEmbedder { dim: 4 },
        }),
        Arc::new(MeanColourEmbedder { dim: 3 }),
        2,
    )
    .unwrap();
    let exit = StreamProcessor::new(
        StreamSide::Exit,
        ScriptedDetector::repeating(&cars, 2),
        ByteTracker::new(Default::default()),
        PatchFaceLocalizer::from_frame(0),
        misreporting,
    );
    let mut pipeline = Pipeline::new(&PipelineConfig::default(), entry, exit).unwrap();
    let result = pipeline.run(&frames(&cars, 2), &frames(&cars, 2));
    assert!(matches!(
        result,
        Err(ReconcileError::DimensionMismatch { expected: 3, found: 4, .. })
    ));
}

#[test]
fn test_processors_must_match_sides() {
    let entry = processor(StreamSide::Entry, ScriptedDetector::default(), PatchFaceLocalizer::default());
    let also_entry = processor(StreamSide::Entry, ScriptedDetector::default(), PatchFaceLocalizer::default());
    assert!(matches!(
        Pipeline::new(&PipelineConfig::default(), entry, also_entry),
        Err(ReconcileError::InvalidConfig(_))
    ));
}
