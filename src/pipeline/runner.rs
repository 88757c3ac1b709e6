//! Per-file detection + tracking sweep.

use ndarray::Array2;
use tracing::{info, warn};

use crate::background::BackgroundModel;
use crate::config::{PipelineConfig, TrackerParameters};
use crate::detector::{BlobExtractor, Detection};
use crate::error::Error;
use crate::pipeline::source::{BatchOutcome, CancellationToken, FrameSource};
use crate::tracker::{TrackManager, TrackObservation};

/// Detections and track snapshots of one processed frame.
#[derive(Debug, Clone)]
pub struct FrameResult {
    pub frame: usize,
    pub detections: Vec<Detection>,
    pub observations: Vec<TrackObservation>,
}

/// Output of a full sweep over one frame source.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub outcome: BatchOutcome,
    /// One entry per frame processed before completion or cancellation.
    pub frames: Vec<FrameResult>,
}

impl RunResult {
    /// Per-frame detection lists, in frame order; the input shape expected
    /// by [`secondary_pass`].
    pub fn detections_by_frame(&self) -> Vec<Vec<Detection>> {
        self.frames.iter().map(|f| f.detections.clone()).collect()
    }
}

/// One file's detection + tracking pipeline instance.
///
/// Carries only value-type parameters and per-file mutable state, so whole
/// files can be processed in parallel with one instance per worker.
#[derive(Debug, Clone)]
pub struct TrackingPipeline {
    config: PipelineConfig,
    background: BackgroundModel,
    extractor: BlobExtractor,
    manager: TrackManager,
}

impl TrackingPipeline {
    /// Build a pipeline, validating the configuration at the boundary.
    pub fn new(config: PipelineConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            config,
            background: BackgroundModel::new(config.background),
            extractor: BlobExtractor::new(config.detector),
            manager: TrackManager::new(config.tracker),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn background(&self) -> &BackgroundModel {
        &self.background
    }

    pub fn manager(&self) -> &TrackManager {
        &self.manager
    }

    /// Replace the tracker parameters. An invalid candidate is rejected and
    /// the previous value stays in effect.
    pub fn set_tracker_params(&mut self, params: TrackerParameters) -> Result<(), Error> {
        params.validate()?;
        self.config.tracker = params;
        self.manager = TrackManager::new(params);
        Ok(())
    }

    /// Train the background model over a subsample of `source`.
    pub fn train_background(
        &mut self,
        source: &dyn FrameSource,
        token: &CancellationToken,
    ) -> Result<BatchOutcome, Error> {
        self.background.train(source, token)
    }

    /// Run detection + tracking on a single frame.
    ///
    /// Fails with [`Error::NotReady`] until the background model is trained.
    pub fn process_frame(
        &mut self,
        index: usize,
        frame: &Array2<u8>,
    ) -> Result<FrameResult, Error> {
        let mask = self.background.subtract(frame)?;
        let detections = self.extractor.extract(&mask);
        let observations = self.manager.step(index, &detections);
        Ok(FrameResult {
            frame: index,
            detections,
            observations,
        })
    }

    /// Sweep every frame of `source` through detection and tracking.
    ///
    /// The cancellation token is polled at each frame boundary; a frame is
    /// either fully applied or not attempted. A frame that fails to read is
    /// logged and treated as zero detections (tracks still predict and age);
    /// it never aborts the sweep.
    pub fn run(
        &mut self,
        source: &dyn FrameSource,
        token: &CancellationToken,
    ) -> Result<RunResult, Error> {
        if !self.background.is_ready() {
            return Err(Error::NotReady);
        }

        let total = source.frame_count();
        let mut frames = Vec::with_capacity(total);

        for index in 0..total {
            if token.is_cancelled() {
                info!(frame = index, "tracking sweep cancelled");
                return Ok(RunResult {
                    outcome: BatchOutcome::Cancelled,
                    frames,
                });
            }

            let result = match source.frame(index) {
                Ok(frame) => self.process_frame(index, &frame),
                Err(err) => Err(err),
            };
            let result = match result {
                Ok(result) => result,
                Err(Error::NotReady) => return Err(Error::NotReady),
                Err(err) => {
                    warn!(frame = index, error = %err, "treating frame as empty");
                    FrameResult {
                        frame: index,
                        detections: Vec::new(),
                        observations: self.manager.step(index, &[]),
                    }
                }
            };
            frames.push(result);
        }

        info!(
            frames = frames.len(),
            live = self.manager.live_tracks().len(),
            removed = self.manager.removed_tracks().len(),
            "tracking sweep complete"
        );
        Ok(RunResult {
            outcome: BatchOutcome::Completed,
            frames,
        })
    }
}

/// Re-run the tracking cycle over previously computed per-frame detections.
///
/// This is the same algorithm as the primary sweep applied to a filtered or
/// merged detection set, typically with different tracker parameters, to
/// refine trajectories after an initial pass.
pub fn secondary_pass(
    detections_by_frame: &[Vec<Detection>],
    params: TrackerParameters,
) -> Result<RunResult, Error> {
    params.validate()?;
    let mut manager = TrackManager::new(params);
    let mut frames = Vec::with_capacity(detections_by_frame.len());
    for (index, detections) in detections_by_frame.iter().enumerate() {
        let observations = manager.step(index, detections);
        frames.push(FrameResult {
            frame: index,
            detections: detections.clone(),
            observations,
        });
    }
    Ok(RunResult {
        outcome: BatchOutcome::Completed,
        frames,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackgroundModelParameters, DetectorParameters};
    use crate::pipeline::source::VecFrameSource;
    use crate::tracker::TrackStatus;

    struct FailingSource {
        inner: VecFrameSource,
        fail_at: usize,
    }

    impl FrameSource for FailingSource {
        fn frame_count(&self) -> usize {
            self.inner.frame_count()
        }

        fn frame(&self, index: usize) -> Result<Array2<u8>, Error> {
            if index == self.fail_at {
                return Err(Error::MalformedFrame {
                    index,
                    reason: "corrupt frame payload".into(),
                });
            }
            self.inner.frame(index)
        }
    }

    fn test_config() -> PipelineConfig {
        PipelineConfig {
            detector: DetectorParameters {
                detection_size: 5,
                min_fg_pixels: 5,
                median_size: 3,
                dbscan_eps: 3,
                dbscan_min_samples: 4,
            },
            background: BackgroundModelParameters {
                nof_bg_frames: 10,
                ..Default::default()
            },
            tracker: TrackerParameters {
                max_age: 4,
                min_hits: 2,
                search_radius: 15,
                trim_tails: false,
            },
        }
    }

    /// Frames with a static background of 10 and a 5x5 blob of 200 drifting
    /// one column per frame.
    fn moving_blob_frames(count: usize) -> Vec<Array2<u8>> {
        (0..count)
            .map(|i| {
                let mut frame = Array2::from_elem((32, 64), 10u8);
                let left = 5 + i;
                for r in 10..15 {
                    for c in left..left + 5 {
                        frame[[r, c]] = 200;
                    }
                }
                frame
            })
            .collect()
    }

    #[test]
    fn run_before_training_is_not_ready() {
        let mut pipeline = TrackingPipeline::new(test_config()).unwrap();
        let source = VecFrameSource::new(moving_blob_frames(5));
        assert!(matches!(
            pipeline.run(&source, &CancellationToken::new()),
            Err(Error::NotReady)
        ));
    }

    #[test]
    fn sweep_tracks_a_moving_blob() {
        let mut pipeline = TrackingPipeline::new(test_config()).unwrap();
        let background = VecFrameSource::new(vec![Array2::from_elem((32, 64), 10u8); 20]);
        let token = CancellationToken::new();
        pipeline.train_background(&background, &token).unwrap();

        let source = VecFrameSource::new(moving_blob_frames(20));
        let result = pipeline.run(&source, &token).unwrap();
        assert_eq!(result.outcome, BatchOutcome::Completed);
        assert_eq!(result.frames.len(), 20);

        // One blob per frame, one identity across the sweep.
        assert!(result.frames.iter().all(|f| f.detections.len() == 1));
        let last = result.frames.last().unwrap();
        assert_eq!(last.observations.len(), 1);
        assert_eq!(last.observations[0].status, TrackStatus::Active);
        assert_eq!(last.observations[0].track_id, 1);
    }

    #[test]
    fn observations_use_the_caller_frame_index() {
        let mut pipeline = TrackingPipeline::new(test_config()).unwrap();
        let background = VecFrameSource::new(vec![Array2::from_elem((32, 64), 10u8); 20]);
        let token = CancellationToken::new();
        pipeline.train_background(&background, &token).unwrap();

        // A caller numbering frames from an arbitrary offset must see that
        // numbering echoed in the observations, not an internal counter.
        let frame = &moving_blob_frames(1)[0];
        let result = pipeline.process_frame(100, frame).unwrap();
        assert_eq!(result.frame, 100);
        assert_eq!(result.observations.len(), 1);
        assert_eq!(result.observations[0].frame, 100);

        let result = pipeline.process_frame(101, frame).unwrap();
        assert_eq!(result.observations[0].frame, 101);
    }

    #[test]
    fn corrupt_frame_is_skipped_not_fatal() {
        let mut pipeline = TrackingPipeline::new(test_config()).unwrap();
        let background = VecFrameSource::new(vec![Array2::from_elem((32, 64), 10u8); 20]);
        let token = CancellationToken::new();
        pipeline.train_background(&background, &token).unwrap();

        let source = FailingSource {
            inner: VecFrameSource::new(moving_blob_frames(10)),
            fail_at: 4,
        };
        let result = pipeline.run(&source, &token).unwrap();
        assert_eq!(result.frames.len(), 10);
        assert!(result.frames[4].detections.is_empty());
        // The track survives the gap within max_age.
        let last = result.frames.last().unwrap();
        assert_eq!(last.observations.len(), 1);
    }

    #[test]
    fn cancelled_sweep_reports_partial_frames() {
        let mut pipeline = TrackingPipeline::new(test_config()).unwrap();
        let background = VecFrameSource::new(vec![Array2::from_elem((32, 64), 10u8); 20]);
        let token = CancellationToken::new();
        pipeline.train_background(&background, &token).unwrap();

        token.cancel();
        let source = VecFrameSource::new(moving_blob_frames(10));
        let result = pipeline.run(&source, &token).unwrap();
        assert_eq!(result.outcome, BatchOutcome::Cancelled);
        assert!(result.frames.is_empty());
    }

    #[test]
    fn invalid_tracker_params_keep_previous_value() {
        let mut pipeline = TrackingPipeline::new(test_config()).unwrap();
        let bad = TrackerParameters {
            max_age: 0,
            ..Default::default()
        };
        assert!(pipeline.set_tracker_params(bad).is_err());
        assert_eq!(pipeline.config().tracker.max_age, 4);
    }

    #[test]
    fn secondary_pass_reuses_stored_detections() {
        let detections: Vec<Vec<Detection>> = (0..10)
            .map(|i| {
                let row = 10.0;
                let col = 10.0 + f64::from(i);
                vec![Detection::from_corners([
                    [row - 2.0, col - 1.0],
                    [row + 2.0, col - 1.0],
                    [row + 2.0, col + 1.0],
                    [row - 2.0, col + 1.0],
                ])]
            })
            .collect();

        let result = secondary_pass(
            &detections,
            TrackerParameters {
                max_age: 3,
                min_hits: 2,
                search_radius: 10,
                trim_tails: false,
            },
        )
        .unwrap();
        assert_eq!(result.frames.len(), 10);
        let last = result.frames.last().unwrap();
        assert_eq!(last.observations.len(), 1);
        assert_eq!(last.observations[0].status, TrackStatus::Active);
    }
}
