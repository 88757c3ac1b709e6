use fishtrack_rs::config::TrackerParameters;
use fishtrack_rs::detector::Detection;
use fishtrack_rs::tracker::{TrackManager, TrackStatus};

fn detection_at(row: f64, col: f64) -> Detection {
    Detection::from_corners([
        [row - 3.0, col - 1.0],
        [row + 3.0, col - 1.0],
        [row + 3.0, col + 1.0],
        [row - 3.0, col + 1.0],
    ])
}

fn params(max_age: u32, min_hits: u32, search_radius: u32) -> TrackerParameters {
    TrackerParameters {
        max_age,
        min_hits,
        search_radius,
        trim_tails: false,
    }
}

#[test]
fn steady_target_confirms_once_and_survives() {
    // One detection per frame for 50 frames at a fixed position.
    let mut manager = TrackManager::new(params(10, 5, 30));

    for frame in 1u32..=50 {
        manager.step(frame as usize - 1, &[detection_at(40.0, 40.0)]);
        assert_eq!(manager.live_tracks().len(), 1, "frame {frame}");
        let track = &manager.live_tracks()[0];

        // Tentative until hit_streak first reaches min_hits, Active from
        // then on, never earlier.
        if frame < 5 {
            assert_eq!(track.status(), TrackStatus::Tentative, "frame {frame}");
        } else {
            assert_eq!(track.status(), TrackStatus::Active, "frame {frame}");
        }
        assert_eq!(track.hit_streak(), frame, "frame {frame}");
    }

    assert_eq!(manager.live_tracks()[0].hit_streak(), 50);
    assert!(manager.removed_tracks().is_empty());
}

#[test]
fn hit_streak_resets_on_first_unmatched_frame() {
    let mut manager = TrackManager::new(params(10, 3, 30));
    for frame in 0..6 {
        manager.step(frame, &[detection_at(20.0, 20.0)]);
    }
    assert_eq!(manager.live_tracks()[0].hit_streak(), 6);

    manager.step(6, &[]);
    assert_eq!(manager.live_tracks()[0].hit_streak(), 0);

    // Re-matching starts the streak over.
    manager.step(7, &[detection_at(20.0, 20.0)]);
    assert_eq!(manager.live_tracks()[0].hit_streak(), 1);
}

#[test]
fn active_track_is_removed_exactly_after_max_age_misses() {
    let max_age = 4;
    let mut manager = TrackManager::new(params(max_age, 2, 30));

    for frame in 0..5 {
        manager.step(frame, &[detection_at(30.0, 30.0)]);
    }
    assert_eq!(manager.live_tracks()[0].status(), TrackStatus::Active);
    let id = manager.live_tracks()[0].id();

    // The track must survive exactly max_age unmatched frames.
    for miss in 1..=max_age {
        manager.step(4 + miss as usize, &[]);
        assert_eq!(manager.live_tracks().len(), 1, "miss {miss}");
    }

    // Miss max_age + 1 removes it, and it never reappears in the live set.
    manager.step(5 + max_age as usize, &[]);
    assert!(manager.live_tracks().is_empty());
    assert_eq!(manager.removed_tracks().len(), 1);
    assert_eq!(manager.removed_tracks()[0].id(), id);

    manager.step(6 + max_age as usize, &[detection_at(30.0, 30.0)]);
    assert_eq!(manager.live_tracks().len(), 1);
    assert_ne!(manager.live_tracks()[0].id(), id);
}

#[test]
fn association_respects_the_gate() {
    let mut manager = TrackManager::new(params(10, 2, 15));
    manager.step(0, &[detection_at(10.0, 10.0)]);

    // A detection outside the search radius never matches the track; it
    // spawns a separate one instead.
    manager.step(1, &[detection_at(10.0, 60.0)]);
    assert_eq!(manager.live_tracks().len(), 2);
    assert_eq!(manager.live_tracks()[0].hit_streak(), 0);
}

#[test]
fn close_detections_share_one_track_without_duplicate_spawn() {
    // Two detections 3 pixels apart with a wide gate: one matches the
    // pre-existing track, the other must not seed a duplicate.
    let mut manager = TrackManager::new(params(10, 2, 30));
    manager.step(0, &[detection_at(50.0, 50.0)]);
    let id = manager.live_tracks()[0].id();

    for frame in 1..=2 {
        manager.step(frame, &[detection_at(50.0, 50.0), detection_at(50.0, 53.0)]);
        assert_eq!(manager.live_tracks().len(), 1);
        assert_eq!(manager.live_tracks()[0].id(), id);
    }
}

#[test]
fn lost_track_reactivates_on_match() {
    let mut manager = TrackManager::new(params(10, 2, 30));
    for frame in 0..4 {
        manager.step(frame, &[detection_at(20.0, 20.0)]);
    }
    assert_eq!(manager.live_tracks()[0].status(), TrackStatus::Active);

    manager.step(4, &[]);
    assert_eq!(manager.live_tracks()[0].status(), TrackStatus::Lost);

    manager.step(5, &[detection_at(20.0, 20.0)]);
    assert_eq!(manager.live_tracks()[0].status(), TrackStatus::Active);
}

#[test]
fn two_targets_keep_distinct_identities() {
    let mut manager = TrackManager::new(params(10, 2, 10));
    for i in 0..10usize {
        let drift = i as f64;
        manager.step(i, &[
            detection_at(20.0, 20.0 + drift),
            detection_at(80.0, 80.0 - drift),
        ]);
    }
    assert_eq!(manager.live_tracks().len(), 2);
    let ids: Vec<u64> = manager.live_tracks().iter().map(|t| t.id()).collect();
    assert_ne!(ids[0], ids[1]);
    for track in manager.live_tracks() {
        assert_eq!(track.status(), TrackStatus::Active);
        assert_eq!(track.hit_streak(), 10);
    }
}
