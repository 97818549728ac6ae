use std::sync::Arc;

use camtrack_core::{
    Association, Detection, MatchPolicy, NullSink, PointTracker, ReconstructedPoint, TrackEvent,
    TrackId, TrackerParams,
};
use nalgebra::{Point2, Point3};

fn det(x: f64, y: f64, h: f64, w: f64) -> Detection {
    Detection::new(x, y, h, w)
}

fn tracker(policy: MatchPolicy, eviction_limit: u32) -> PointTracker {
    PointTracker::with_params(TrackerParams {
        policy,
        eviction_limit,
        ..TrackerParams::default()
    })
}

fn lost_count(events: &[TrackEvent], id: TrackId) -> usize {
    events
        .iter()
        .filter(|e| **e == TrackEvent::PointLost(id))
        .count()
}

#[test]
fn nearby_detection_keeps_track_identity() {
    let mut t = PointTracker::new();
    let mut events: Vec<TrackEvent> = Vec::new();

    let first = t.add_point(det(10.0, 10.0, 5.0, 5.0), &mut events);
    let second = t.add_point(det(12.0, 11.0, 6.0, 4.0), &mut events);

    let id = first.track_id();
    assert_eq!(first, Association::Created(id));
    assert_eq!(second, Association::Updated(id));
    assert_eq!(t.len(), 1);

    let track = t.get(id).expect("track");
    assert_eq!(track.position(), Point2::new(12.0, 11.0));
    assert_eq!(track.size(), (6.0, 4.0));
    assert_eq!(track.history().len(), 2);
    assert_eq!(
        events,
        vec![
            TrackEvent::PointCreated(id),
            TrackEvent::PointUpdatedCandidate(id)
        ]
    );
}

#[test]
fn far_or_differently_sized_detection_creates_one_track() {
    let mut t = PointTracker::new();
    let mut events: Vec<TrackEvent> = Vec::new();
    t.add_point(det(0.0, 0.0, 5.0, 5.0), &mut events);

    // 15 px away: distance² == 225 is not strictly below the threshold.
    let far = t.add_point(det(15.0, 0.0, 5.0, 5.0), &mut events);
    assert!(matches!(far, Association::Created(_)));
    assert_eq!(t.len(), 2);

    // Same place as the first track, but summed size differs by 11.
    let fat = t.add_point(det(0.0, 0.0, 10.0, 11.0), &mut events);
    assert!(matches!(fat, Association::Created(_)));
    assert_eq!(t.len(), 3);

    let created = events
        .iter()
        .filter(|e| matches!(e, TrackEvent::PointCreated(_)))
        .count();
    assert_eq!(created, 3);
}

#[test]
fn unmatched_track_is_evicted_once() {
    let mut t = tracker(MatchPolicy::Greedy, 3);
    let mut events: Vec<TrackEvent> = Vec::new();
    let a = t.add_point(det(0.0, 0.0, 5.0, 5.0), &mut events).track_id();

    for k in 1..=3 {
        t.add_point(det(100.0, 100.0, 5.0, 5.0), &mut events);
        assert_eq!(t.get(a).map(|tr| tr.miss_count()), Some(k));
    }
    assert_eq!(lost_count(&events, a), 0);

    t.add_point(det(100.0, 100.0, 5.0, 5.0), &mut events);
    assert!(t.get(a).is_none());
    assert_eq!(lost_count(&events, a), 1);

    for _ in 0..5 {
        t.add_point(det(100.0, 100.0, 5.0, 5.0), &mut events);
    }
    assert_eq!(lost_count(&events, a), 1);
    assert_eq!(t.len(), 1);
}

#[test]
fn eviction_of_earlier_track_keeps_later_match() {
    let mut t = tracker(MatchPolicy::Greedy, 1);
    let mut events: Vec<TrackEvent> = Vec::new();
    let a = t.add_point(det(0.0, 0.0, 5.0, 5.0), &mut events).track_id();
    let b = t.add_point(det(100.0, 100.0, 5.0, 5.0), &mut events).track_id();
    assert_eq!(t.get(a).map(|tr| tr.miss_count()), Some(1));
    events.clear();

    // `a` crosses the limit in the same call that updates `b`.
    let outcome = t.add_point(det(101.0, 100.0, 5.0, 5.0), &mut events);
    assert_eq!(outcome, Association::Updated(b));
    assert_eq!(t.len(), 1);
    assert_eq!(t.tracks()[0].id(), b);
    assert_eq!(t.tracks()[0].position(), Point2::new(101.0, 100.0));
    assert_eq!(
        events,
        vec![TrackEvent::PointLost(a), TrackEvent::PointUpdatedCandidate(b)]
    );
}

#[test]
fn assigned_tracks_do_not_announce_updates() {
    let mut t = PointTracker::new();
    let mut events: Vec<TrackEvent> = Vec::new();
    let id = t.add_point(det(10.0, 10.0, 5.0, 5.0), &mut events).track_id();

    let point = Arc::new(ReconstructedPoint {
        id: 1,
        position: Point3::new(0.0, 0.0, 1.0),
    });
    assert!(t.assign_3d(id, &point));
    events.clear();
    t.add_point(det(11.0, 10.0, 5.0, 5.0), &mut events);
    assert!(events.is_empty());

    drop(point);
    t.add_point(det(12.0, 10.0, 5.0, 5.0), &mut events);
    assert_eq!(events, vec![TrackEvent::PointUpdatedCandidate(id)]);

    assert!(t.unassign_3d(id));
    let other = Arc::new(ReconstructedPoint {
        id: 2,
        position: Point3::origin(),
    });
    assert!(!t.assign_3d(TrackId(999), &other));
}

#[test]
fn greedy_takes_first_gated_track_and_misses_the_rest() {
    let mut t = PointTracker::new();
    let mut sink = NullSink;
    let a = t.add_point(det(0.0, 0.0, 5.0, 5.0), &mut sink).track_id();
    let b = t.add_point(det(20.0, 0.0, 5.0, 5.0), &mut sink).track_id();
    assert_ne!(a, b);

    // Equidistant from both tracks.
    let res = t.add_point(det(10.0, 0.0, 5.0, 5.0), &mut sink);
    assert_eq!(res, Association::Updated(a));
    assert_eq!(t.get(a).map(|tr| tr.miss_count()), Some(0));
    assert_eq!(t.get(b).map(|tr| tr.miss_count()), Some(1));
}

#[test]
fn greedy_frame_can_feed_one_track_twice() {
    let mut t = PointTracker::new();
    let mut sink = NullSink;
    let a = t.add_point(det(0.0, 0.0, 5.0, 5.0), &mut sink).track_id();
    let b = t.add_point(det(20.0, 0.0, 5.0, 5.0), &mut sink).track_id();

    let res = t.add_frame(&[det(12.0, 0.0, 5.0, 5.0), det(22.0, 0.0, 5.0, 5.0)], &mut sink);
    assert_eq!(res, vec![Association::Updated(a), Association::Updated(a)]);
    assert_eq!(t.get(a).map(|tr| tr.position()), Some(Point2::new(22.0, 0.0)));
    assert_eq!(t.get(b).map(|tr| tr.miss_count()), Some(2));
}

#[test]
fn exclusive_frame_assigns_one_detection_per_track() {
    let mut t = tracker(MatchPolicy::Exclusive, 10);
    let mut events: Vec<TrackEvent> = Vec::new();
    let created = t.add_frame(&[det(0.0, 0.0, 5.0, 5.0), det(20.0, 0.0, 5.0, 5.0)], &mut events);
    let (a, b) = (created[0].track_id(), created[1].track_id());
    assert!(created.iter().all(|c| matches!(c, Association::Created(_))));

    let res = t.add_frame(&[det(12.0, 0.0, 5.0, 5.0), det(22.0, 0.0, 5.0, 5.0)], &mut events);
    assert_eq!(res, vec![Association::Updated(a), Association::Updated(b)]);
    assert_eq!(t.get(a).map(|tr| tr.position()), Some(Point2::new(12.0, 0.0)));
    assert_eq!(t.get(b).map(|tr| tr.position()), Some(Point2::new(22.0, 0.0)));
    assert_eq!(t.get(a).map(|tr| tr.miss_count()), Some(0));
    assert_eq!(t.get(b).map(|tr| tr.miss_count()), Some(0));
}

#[test]
fn exclusive_single_detection_prefers_nearest_track() {
    let mut t = tracker(MatchPolicy::Exclusive, 10);
    let mut sink = NullSink;
    let a = t.add_point(det(0.0, 0.0, 5.0, 5.0), &mut sink).track_id();
    let b = t.add_point(det(20.0, 0.0, 5.0, 5.0), &mut sink).track_id();

    let res = t.add_point(det(12.0, 0.0, 5.0, 5.0), &mut sink);
    assert_eq!(res, Association::Updated(b));
    // One miss from creating `b`, one from this frame.
    assert_eq!(t.get(a).map(|tr| tr.miss_count()), Some(2));
}

#[test]
fn exclusive_counts_one_miss_per_frame_and_evicts() {
    let mut t = tracker(MatchPolicy::Exclusive, 1);
    let mut events: Vec<TrackEvent> = Vec::new();
    let a = t.add_frame(&[det(0.0, 0.0, 5.0, 5.0)], &mut events)[0].track_id();

    let frame = [det(200.0, 0.0, 5.0, 5.0), det(300.0, 0.0, 5.0, 5.0)];
    t.add_frame(&frame, &mut events);
    assert_eq!(t.get(a).map(|tr| tr.miss_count()), Some(1));
    assert_eq!(t.len(), 3);

    t.add_frame(&frame, &mut events);
    assert!(t.get(a).is_none());
    assert_eq!(lost_count(&events, a), 1);
    assert_eq!(t.len(), 2);
}

#[test]
fn latest_created_and_clear() {
    let mut t = PointTracker::new();
    let mut sink = NullSink;
    assert!(t.latest_created().is_none());
    t.add_point(det(0.0, 0.0, 5.0, 5.0), &mut sink);
    let b = t.add_point(det(50.0, 50.0, 5.0, 5.0), &mut sink).track_id();
    t.add_point(det(1.0, 1.0, 5.0, 5.0), &mut sink);
    assert_eq!(t.latest_created().map(|tr| tr.id()), Some(b));
    assert_eq!(t.clear(), 2);
    assert!(t.is_empty());
}

#[test]
fn params_deserialize_with_defaults() {
    let params: TrackerParams =
        serde_json::from_str(r#"{ "max_distance": 20.0, "policy": "exclusive" }"#).expect("json");
    assert_eq!(params.max_distance, 20.0);
    assert_eq!(params.max_size_diff, 10.0);
    assert_eq!(params.eviction_limit, 10);
    assert_eq!(params.policy, MatchPolicy::Exclusive);
}
