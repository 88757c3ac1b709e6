//! Detection and tracking of moving acoustic targets (fish) in sonar
//! intensity frames.
//!
//! The pipeline runs per frame: an adaptive [`BackgroundModel`] classifies
//! foreground pixels, the [`BlobExtractor`] clusters them into oriented
//! [`Detection`]s, and the [`TrackManager`] maintains Kalman-filtered
//! identities across frames via gated nearest-neighbor assignment.
//!
//! Frame decoding, rendering and playback are out of scope: frames arrive
//! through the [`FrameSource`] trait and results leave through the
//! [`export`] records.

pub mod background;
pub mod config;
pub mod detector;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod tracker;

pub use background::BackgroundModel;
pub use config::{
    BackgroundModelParameters, DetectorParameters, PipelineConfig, TrackerParameters,
};
pub use detector::{BlobExtractor, CoordinateMapper, Detection, LinearMapper, PhysicalMetrics};
pub use error::Error;
pub use pipeline::{
    BatchOutcome, CancellationToken, FrameResult, FrameSource, RunResult, TrackingPipeline,
    VecFrameSource, process_batch, secondary_pass,
};
pub use tracker::{Track, TrackManager, TrackObservation, TrackStatus};
