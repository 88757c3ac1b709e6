mod kalman_filter;
mod manager;
mod matching;
mod track;
mod track_state;

pub use kalman_filter::KalmanFilter;
pub use manager::{IdAllocator, TrackManager, TrackObservation};
pub use matching::{AssignmentResult, distance_matrix, match_positions};
pub use track::Track;
pub use track_state::TrackStatus;
