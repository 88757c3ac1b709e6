//! Typed configuration structs for the pipeline components.
//!
//! Each struct is JSON-serializable and validated once at the boundary
//! (construction or an explicit `set_*` call); components never re-validate
//! internally. Invalid values are rejected with
//! [`Error::InvalidParameter`] and the previous value stays in effect.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Parameters for foreground blob extraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectorParameters {
    /// Minimum cluster extent (pixel count) to qualify as a detection.
    pub detection_size: usize,
    /// Frames with fewer foreground pixels than this are skipped entirely.
    pub min_fg_pixels: usize,
    /// Side length of the square median filter applied to the mask. Odd.
    pub median_size: usize,
    /// DBSCAN neighborhood radius in pixels.
    pub dbscan_eps: u32,
    /// DBSCAN core-point neighbor count.
    pub dbscan_min_samples: usize,
}

impl Default for DetectorParameters {
    fn default() -> Self {
        Self {
            detection_size: 10,
            min_fg_pixels: 25,
            median_size: 3,
            dbscan_eps: 10,
            dbscan_min_samples: 10,
        }
    }
}

impl DetectorParameters {
    pub fn validate(&self) -> Result<(), Error> {
        if self.detection_size == 0 {
            return Err(Error::invalid("detection_size", "must be at least 1"));
        }
        if self.median_size == 0 || self.median_size % 2 == 0 {
            return Err(Error::invalid("median_size", "must be odd and at least 1"));
        }
        if self.dbscan_eps == 0 {
            return Err(Error::invalid("dbscan_eps", "must be at least 1"));
        }
        if self.dbscan_min_samples == 0 {
            return Err(Error::invalid("dbscan_min_samples", "must be at least 1"));
        }
        Ok(())
    }
}

/// Parameters for the adaptive Gaussian-mixture background model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BackgroundModelParameters {
    /// Squared-distance match threshold in units of component variance.
    pub mog_var_thresh: u32,
    /// Number of frames sampled to initialize the model.
    pub nof_bg_frames: usize,
    /// Blending factor for mixture updates during training, in (0, 1].
    pub learning_rate: f64,
    /// Gaussians maintained per pixel.
    pub mixture_count: usize,
}

impl Default for BackgroundModelParameters {
    fn default() -> Self {
        Self {
            mog_var_thresh: 11,
            nof_bg_frames: 100,
            learning_rate: 0.01,
            mixture_count: 5,
        }
    }
}

impl BackgroundModelParameters {
    pub fn validate(&self) -> Result<(), Error> {
        if self.mog_var_thresh == 0 {
            return Err(Error::invalid("mog_var_thresh", "must be at least 1"));
        }
        if self.nof_bg_frames == 0 {
            return Err(Error::invalid("nof_bg_frames", "must be at least 1"));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(Error::invalid("learning_rate", "must be in (0, 1]"));
        }
        if self.mixture_count == 0 || self.mixture_count > 8 {
            return Err(Error::invalid("mixture_count", "must be in 1..=8"));
        }
        Ok(())
    }
}

/// Parameters for track lifecycle management and association gating.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackerParameters {
    /// Frames a track survives without a match before removal.
    pub max_age: u32,
    /// Consecutive matches required to confirm a Tentative track.
    pub min_hits: u32,
    /// Association gating distance in pixels.
    pub search_radius: u32,
    /// Drop trailing unmatched samples from exported trajectories.
    pub trim_tails: bool,
}

impl Default for TrackerParameters {
    fn default() -> Self {
        Self {
            max_age: 10,
            min_hits: 5,
            search_radius: 10,
            trim_tails: true,
        }
    }
}

impl TrackerParameters {
    pub fn validate(&self) -> Result<(), Error> {
        if self.max_age == 0 {
            return Err(Error::invalid("max_age", "must be at least 1"));
        }
        if self.min_hits == 0 {
            return Err(Error::invalid("min_hits", "must be at least 1"));
        }
        if self.search_radius == 0 {
            return Err(Error::invalid("search_radius", "must be at least 1"));
        }
        Ok(())
    }
}

/// Aggregate configuration for one pipeline instance.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub detector: DetectorParameters,
    pub background: BackgroundModelParameters,
    pub tracker: TrackerParameters,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), Error> {
        self.detector.validate()?;
        self.background.validate()?;
        self.tracker.validate()
    }
}
