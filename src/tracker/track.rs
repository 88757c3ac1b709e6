//! A single Kalman-filtered target identity.

use std::collections::VecDeque;

use ndarray::{Array1, Array2};

use crate::detector::Detection;
use crate::tracker::kalman_filter::KalmanFilter;
use crate::tracker::track_state::TrackStatus;

/// Cap on the retained trajectory history per track.
const MAX_HISTORY: usize = 128;

/// One tracked target.
///
/// Ids are allocated by the owning manager and never reused. The filter
/// state lives in `[x, vx, y, vy]` order where `x`/`y` are the pixel row and
/// column of the detection centroid.
#[derive(Debug, Clone)]
pub struct Track {
    id: u64,
    status: TrackStatus,
    /// Frames since the last successful match.
    time_since_update: u32,
    /// Consecutive successful matches; the founding detection counts as the
    /// first hit.
    hit_streak: u32,
    mean: Array1<f64>,
    covariance: Array2<f64>,
    history: VecDeque<[f64; 2]>,
    last_detection: Option<Detection>,
}

impl Track {
    /// Spawn a Tentative track on an unmatched detection.
    pub fn new(id: u64, detection: Detection, filter: &KalmanFilter) -> Self {
        let centroid = detection.centroid();
        let (mean, covariance) = filter.initiate(centroid);
        let mut history = VecDeque::new();
        history.push_back(centroid);
        Self {
            id,
            status: TrackStatus::Tentative,
            time_since_update: 0,
            hit_streak: 1,
            mean,
            covariance,
            history,
            last_detection: Some(detection),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn status(&self) -> TrackStatus {
        self.status
    }

    pub(crate) fn set_status(&mut self, status: TrackStatus) {
        self.status = status;
    }

    pub fn time_since_update(&self) -> u32 {
        self.time_since_update
    }

    pub fn hit_streak(&self) -> u32 {
        self.hit_streak
    }

    /// Current position estimate `[row, col]`.
    pub fn position(&self) -> [f64; 2] {
        [self.mean[0], self.mean[2]]
    }

    /// Current velocity estimate `[rows/frame, cols/frame]`.
    pub fn velocity(&self) -> [f64; 2] {
        [self.mean[1], self.mean[3]]
    }

    /// Bounded trajectory history, oldest first.
    pub fn history(&self) -> &VecDeque<[f64; 2]> {
        &self.history
    }

    /// The detection matched on the most recent hit, if any ever matched.
    pub fn last_detection(&self) -> Option<&Detection> {
        self.last_detection.as_ref()
    }

    /// Advance the filter one frame and append the predicted position to the
    /// history. Counts one frame toward the age-out limit.
    pub fn predict(&mut self, filter: &KalmanFilter) {
        let (mean, covariance) = filter.predict(&self.mean, &self.covariance);
        self.mean = mean;
        self.covariance = covariance;
        self.time_since_update += 1;

        if self.history.len() == MAX_HISTORY {
            self.history.pop_front();
        }
        self.history.push_back(self.position());
    }

    /// Correct the filter with a matched detection.
    pub fn update(&mut self, filter: &KalmanFilter, detection: Detection) {
        let (mean, covariance) =
            filter.update(&self.mean, &self.covariance, detection.centroid());
        self.mean = mean;
        self.covariance = covariance;
        self.time_since_update = 0;
        self.hit_streak += 1;
        let position = self.position();
        if let Some(last) = self.history.back_mut() {
            *last = position;
        }
        self.last_detection = Some(detection);
    }

    /// Reset the consecutive-match counter after an unmatched frame.
    pub(crate) fn reset_hit_streak(&mut self) {
        self.hit_streak = 0;
    }
}
