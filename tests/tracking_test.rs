use checkpoint_reid::{ByteTracker, Detection, TrackerConfig, Tracker};

#[test]
fn test_basic_tracking() {
    let mut tracker = ByteTracker::new(TrackerConfig::default());

    // Frame 1: One detection
    let tracks1 = tracker.update(&[Detection::new(100.0, 100.0, 200.0, 200.0, 0.9)]);

    // New tracks are activated immediately on the first frame.
    assert_eq!(tracks1.len(), 1);
    let id1 = tracks1[0].track_id;

    // Frame 2: Same object moved slightly
    let tracks2 = tracker.update(&[Detection::new(105.0, 105.0, 205.0, 205.0, 0.9)]);
    assert_eq!(tracks2.len(), 1);
    assert_eq!(tracks2[0].track_id, id1);

    // Frame 3: Object occluded (low score), recovered by the second association
    let tracks3 = tracker.update(&[Detection::new(110.0, 110.0, 210.0, 210.0, 0.2)]);
    assert_eq!(tracks3.len(), 1);
    assert_eq!(tracks3[0].track_id, id1);

    // Frame 4: Object disappears
    let tracks4 = tracker.update(&[]);
    assert_eq!(tracks4.len(), 0);

    // Frame 5: Object reappears within the track buffer
    let tracks5 = tracker.update(&[Detection::new(115.0, 115.0, 215.0, 215.0, 0.9)]);
    assert_eq!(tracks5.len(), 1);
    assert_eq!(tracks5[0].track_id, id1);
}

#[test]
fn test_associate_follows_detection_order() {
    let mut tracker = ByteTracker::new(TrackerConfig::default());
    let left = Detection::new(10.0, 10.0, 60.0, 60.0, 0.9);
    let right = Detection::new(300.0, 10.0, 350.0, 60.0, 0.9);

    let first = tracker.associate(&[left, right]).unwrap();
    assert_eq!(first.len(), 2);
    let (left_id, right_id) = (first[0].unwrap(), first[1].unwrap());
    assert_ne!(left_id, right_id);

    // Same objects, reversed input order.
    let second = tracker
        .associate(&[
            Detection::new(302.0, 11.0, 352.0, 61.0, 0.9),
            Detection::new(12.0, 11.0, 62.0, 61.0, 0.9),
        ])
        .unwrap();
    assert_eq!(second, vec![Some(right_id), Some(left_id)]);
}

#[test]
fn test_associate_empty_frame() {
    let mut tracker = ByteTracker::new(TrackerConfig::default());
    assert!(tracker.associate(&[]).unwrap().is_empty());
}

#[test]
fn test_new_track_after_first_frame_waits_for_confirmation() {
    let mut tracker = ByteTracker::new(TrackerConfig::default());
    tracker.associate(&[Detection::new(10.0, 10.0, 60.0, 60.0, 0.9)]).unwrap();

    let newcomer = Detection::new(300.0, 10.0, 350.0, 60.0, 0.9);
    let ids = tracker
        .associate(&[Detection::new(11.0, 10.0, 61.0, 60.0, 0.9), newcomer.clone()])
        .unwrap();
    assert!(ids[0].is_some());
    assert_eq!(ids[1], None);

    let ids = tracker
        .associate(&[Detection::new(12.0, 10.0, 62.0, 60.0, 0.9), newcomer])
        .unwrap();
    assert!(ids[1].is_some());
    assert_ne!(ids[0], ids[1]);
}
