//! Track ownership and the per-frame predict/associate/update cycle.

use tracing::debug;

use crate::config::TrackerParameters;
use crate::detector::Detection;
use crate::tracker::kalman_filter::KalmanFilter;
use crate::tracker::matching::{AssignmentResult, match_positions};
use crate::tracker::track::Track;
use crate::tracker::track_state::TrackStatus;

/// Monotone track id source owned by one manager.
///
/// Ids are allocated under the manager's single-threaded cycle, so
/// independent pipeline instances never collide.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub fn next_id(&mut self) -> u64 {
        self.next += 1;
        self.next
    }
}

/// Per-frame snapshot of one live track, consumed by export and reporting.
#[derive(Debug, Clone)]
pub struct TrackObservation {
    pub track_id: u64,
    pub frame: usize,
    /// Position estimate `[row, col]` after this frame's cycle.
    pub position: [f64; 2],
    pub status: TrackStatus,
    /// The matched detection, present only on frames with a successful match.
    pub detection: Option<Detection>,
}

/// Owns all tracks and runs the full per-frame cycle:
/// predict, associate, update, spawn, age-out, compact.
#[derive(Debug, Clone)]
pub struct TrackManager {
    params: TrackerParameters,
    filter: KalmanFilter,
    allocator: IdAllocator,
    tracks: Vec<Track>,
    removed: Vec<Track>,
    /// Frame index of the most recent cycle, as supplied by the caller.
    frame: usize,
}

impl TrackManager {
    pub fn new(params: TrackerParameters) -> Self {
        Self {
            params,
            filter: KalmanFilter::new(),
            allocator: IdAllocator::default(),
            tracks: Vec::new(),
            removed: Vec::new(),
            frame: 0,
        }
    }

    pub fn params(&self) -> &TrackerParameters {
        &self.params
    }

    /// Tracks still in the live set (Tentative, Active, or Lost).
    pub fn live_tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Archive of tracks that aged out, for aggregate reporting.
    pub fn removed_tracks(&self) -> &[Track] {
        &self.removed
    }

    /// Tracks matched on the most recent frame.
    pub fn active_tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks
            .iter()
            .filter(|t| t.status() == TrackStatus::Active)
    }

    /// Run one tracking cycle over the detections of frame `frame`.
    ///
    /// The returned observations are stamped with the given frame index, so
    /// export rows line up with the caller's frame numbering. A missing or
    /// invalid detection list is the caller's concern; passing an empty
    /// slice keeps tracks predicting and aging without matches.
    pub fn step(&mut self, frame: usize, detections: &[Detection]) -> Vec<TrackObservation> {
        self.frame = frame;

        // 1. Predict every live track; Active demotes to Lost until it is
        //    re-matched this cycle.
        for track in &mut self.tracks {
            track.predict(&self.filter);
            if track.status() == TrackStatus::Active {
                track.set_status(TrackStatus::Lost);
            }
        }

        // 2. Gated optimal assignment between track and detection positions.
        let track_positions: Vec<[f64; 2]> = self.tracks.iter().map(|t| t.position()).collect();
        let detection_positions: Vec<[f64; 2]> =
            detections.iter().map(|d| d.centroid()).collect();
        let AssignmentResult {
            matches,
            unmatched_tracks,
            unmatched_detections,
        } = match_positions(
            &track_positions,
            &detection_positions,
            f64::from(self.params.search_radius),
        );

        // 3. Update matched tracks; promotion depends on the lifecycle state.
        for (track_idx, det_idx) in matches {
            let track = &mut self.tracks[track_idx];
            track.update(&self.filter, detections[det_idx].clone());
            let promoted = match track.status() {
                TrackStatus::Tentative => track.hit_streak() >= self.params.min_hits,
                TrackStatus::Lost | TrackStatus::Active => true,
                TrackStatus::Removed => false,
            };
            if promoted {
                track.set_status(TrackStatus::Active);
            }
        }
        for &idx in &unmatched_tracks {
            self.tracks[idx].reset_hit_streak();
        }

        // 4. Spawn new Tentative tracks, suppressed near any existing live
        //    track so one unresolved blob cannot seed duplicates.
        let radius_sq =
            f64::from(self.params.search_radius) * f64::from(self.params.search_radius);
        for det_idx in unmatched_detections {
            let candidate = detections[det_idx].centroid();
            let near_existing = self.tracks.iter().any(|t| {
                let p = t.position();
                let dr = p[0] - candidate[0];
                let dc = p[1] - candidate[1];
                dr * dr + dc * dc <= radius_sq
            });
            if near_existing {
                continue;
            }
            let id = self.allocator.next_id();
            debug!(id, frame = self.frame, "spawning track");
            self.tracks
                .push(Track::new(id, detections[det_idx].clone(), &self.filter));
        }

        // 5. Age check.
        for track in &mut self.tracks {
            if track.time_since_update() > self.params.max_age {
                debug!(id = track.id(), frame = self.frame, "removing track");
                track.set_status(TrackStatus::Removed);
            }
        }

        let observations = self.snapshot();

        // 6. Compaction: move Removed tracks into the archive.
        let mut live = Vec::with_capacity(self.tracks.len());
        for track in self.tracks.drain(..) {
            if track.status() == TrackStatus::Removed {
                self.removed.push(track);
            } else {
                live.push(track);
            }
        }
        self.tracks = live;

        observations
    }

    fn snapshot(&self) -> Vec<TrackObservation> {
        self.tracks
            .iter()
            .filter(|t| t.status() != TrackStatus::Removed)
            .map(|t| TrackObservation {
                track_id: t.id(),
                frame: self.frame,
                position: t.position(),
                status: t.status(),
                detection: if t.time_since_update() == 0 {
                    t.last_detection().cloned()
                } else {
                    None
                },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection_at(row: f64, col: f64) -> Detection {
        Detection::from_corners([
            [row - 2.0, col - 1.0],
            [row + 2.0, col - 1.0],
            [row + 2.0, col + 1.0],
            [row - 2.0, col + 1.0],
        ])
    }

    fn params() -> TrackerParameters {
        TrackerParameters {
            max_age: 3,
            min_hits: 2,
            search_radius: 20,
            trim_tails: false,
        }
    }

    #[test]
    fn first_detection_spawns_tentative_track() {
        let mut manager = TrackManager::new(params());
        let obs = manager.step(0, &[detection_at(10.0, 10.0)]);
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].status, TrackStatus::Tentative);
        assert_eq!(manager.live_tracks().len(), 1);
    }

    #[test]
    fn observations_carry_the_given_frame_index() {
        let mut manager = TrackManager::new(params());
        let obs = manager.step(100, &[detection_at(10.0, 10.0)]);
        assert_eq!(obs[0].frame, 100);
        let obs = manager.step(101, &[detection_at(10.0, 10.0)]);
        assert_eq!(obs[0].frame, 101);
    }

    #[test]
    fn ids_are_monotone_and_never_reused() {
        let mut manager = TrackManager::new(params());
        manager.step(0, &[detection_at(10.0, 10.0)]);
        let first = manager.live_tracks()[0].id();

        // Starve the track out, then spawn a fresh one far away.
        for frame in 1..=10 {
            manager.step(frame, &[]);
        }
        assert!(manager.live_tracks().is_empty());
        manager.step(11, &[detection_at(200.0, 200.0)]);
        let second = manager.live_tracks()[0].id();
        assert!(second > first);
    }

    #[test]
    fn empty_detection_list_still_ages_tracks() {
        let mut manager = TrackManager::new(params());
        manager.step(0, &[detection_at(10.0, 10.0)]);
        manager.step(1, &[]);
        assert_eq!(manager.live_tracks()[0].time_since_update(), 1);
        assert_eq!(manager.live_tracks()[0].hit_streak(), 0);
    }

    #[test]
    fn nearby_unmatched_detection_does_not_spawn_duplicate() {
        let mut manager = TrackManager::new(params());
        manager.step(0, &[detection_at(50.0, 50.0)]);
        // Two detections a few pixels apart: one matches the existing track,
        // the other sits inside its search radius and must be suppressed.
        for frame in 1..=2 {
            manager.step(frame, &[detection_at(50.0, 50.0), detection_at(50.0, 53.0)]);
        }
        assert_eq!(manager.live_tracks().len(), 1);
    }

    #[test]
    fn removed_track_lands_in_archive() {
        let mut manager = TrackManager::new(params());
        manager.step(0, &[detection_at(10.0, 10.0)]);
        for frame in 1..=(params().max_age as usize + 1) {
            manager.step(frame, &[]);
        }
        assert!(manager.live_tracks().is_empty());
        assert_eq!(manager.removed_tracks().len(), 1);
        assert_eq!(
            manager.removed_tracks()[0].status(),
            TrackStatus::Removed
        );
    }
}
