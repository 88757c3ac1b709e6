//! Adaptive per-pixel Gaussian-mixture background model.
//!
//! Training ingests a strided subsample of frames and blends each pixel's
//! mixture toward the observed intensities; subtraction is inference-only
//! (a zero learning-rate application) and never mutates the model.

use ndarray::Array2;
use tracing::{debug, info};

use crate::config::BackgroundModelParameters;
use crate::error::Error;
use crate::pipeline::{BatchOutcome, CancellationToken, FrameSource};

/// Variance given to a freshly created mixture component.
const INITIAL_VARIANCE: f64 = 225.0;
/// Floor keeping component variances away from zero.
const MIN_VARIANCE: f64 = 4.0;
/// Cumulative weight ratio that the background components must cover.
const BACKGROUND_RATIO: f64 = 0.9;

/// One Gaussian component of a per-pixel mixture.
#[derive(Debug, Clone, Copy)]
struct Component {
    weight: f64,
    mean: f64,
    var: f64,
}

/// Adaptive foreground/background classifier.
///
/// The model is "not ready" until [`train`](BackgroundModel::train) runs to
/// completion; a cancelled training leaves it not ready.
#[derive(Debug, Clone)]
pub struct BackgroundModel {
    params: BackgroundModelParameters,
    /// Row-major `(rows * cols * mixture_count)` component table.
    components: Vec<Component>,
    shape: (usize, usize),
    ready: bool,
}

impl BackgroundModel {
    pub fn new(params: BackgroundModelParameters) -> Self {
        Self {
            params,
            components: Vec::new(),
            shape: (0, 0),
            ready: false,
        }
    }

    /// Whether training has completed and `subtract` may be called.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Discard all learned statistics, returning to the untrained state.
    pub fn reset(&mut self) {
        self.components.clear();
        self.shape = (0, 0);
        self.ready = false;
    }

    /// Train the model over a strided subsample of `source`.
    ///
    /// The stride is `frame_count / nof_bg_frames` (at least 1). The
    /// cancellation token is polled before each sampled frame; cancellation
    /// resets the model and returns [`BatchOutcome::Cancelled`].
    pub fn train(
        &mut self,
        source: &dyn FrameSource,
        token: &CancellationToken,
    ) -> Result<BatchOutcome, Error> {
        self.reset();

        let total = source.frame_count();
        if total == 0 {
            return Err(Error::MalformedFrame {
                index: 0,
                reason: "frame source is empty".into(),
            });
        }
        let stride = (total / self.params.nof_bg_frames).max(1);
        debug!(total, stride, "training background model");

        let mut index = 0;
        while index < total {
            if token.is_cancelled() {
                info!(frame = index, "background training cancelled");
                self.reset();
                return Ok(BatchOutcome::Cancelled);
            }
            let frame = source.frame(index)?;
            self.observe(index, &frame)?;
            index += stride;
        }

        self.ready = true;
        info!(sampled = total.div_ceil(stride), "background model trained");
        Ok(BatchOutcome::Completed)
    }

    /// Fold one frame into the mixture statistics.
    fn observe(&mut self, index: usize, frame: &Array2<u8>) -> Result<(), Error> {
        let dims = frame.dim();
        if self.components.is_empty() {
            self.shape = dims;
            self.components = vec![
                Component {
                    weight: 0.0,
                    mean: 0.0,
                    var: INITIAL_VARIANCE,
                };
                dims.0 * dims.1 * self.params.mixture_count
            ];
        } else if dims != self.shape {
            return Err(Error::MalformedFrame {
                index,
                reason: format!("expected shape {:?}, got {:?}", self.shape, dims),
            });
        }

        let k = self.params.mixture_count;
        let lr = self.params.learning_rate;
        let thresh = f64::from(self.params.mog_var_thresh);

        for (pixel, &value) in frame.iter().enumerate() {
            let mixture = &mut self.components[pixel * k..(pixel + 1) * k];
            let value = f64::from(value);

            let matched = mixture.iter().position(|c| {
                let d = value - c.mean;
                c.weight > 0.0 && d * d <= thresh * c.var
            });

            match matched {
                Some(m) => {
                    for (i, c) in mixture.iter_mut().enumerate() {
                        let hit = if i == m { 1.0 } else { 0.0 };
                        c.weight += lr * (hit - c.weight);
                    }
                    let c = &mut mixture[m];
                    let d = value - c.mean;
                    c.mean += lr * d;
                    c.var = (c.var + lr * (d * d - c.var)).max(MIN_VARIANCE);
                }
                None => {
                    // Replace the weakest component with a wide new one.
                    let weakest = mixture
                        .iter()
                        .enumerate()
                        .min_by(|a, b| a.1.weight.total_cmp(&b.1.weight))
                        .map(|(i, _)| i)
                        .unwrap_or(0);
                    mixture[weakest] = Component {
                        weight: lr,
                        mean: value,
                        var: INITIAL_VARIANCE,
                    };
                    let total: f64 = mixture.iter().map(|c| c.weight).sum();
                    if total > 0.0 {
                        for c in mixture.iter_mut() {
                            c.weight /= total;
                        }
                    }
                }
            }

            // Keep components ordered by weight so subtraction can walk the
            // dominant ones first.
            mixture.sort_by(|a, b| b.weight.total_cmp(&a.weight));
        }
        Ok(())
    }

    /// Compute the foreground mask of `frame` without updating the model.
    ///
    /// Foreground pixels are 255, background 0. Fails with
    /// [`Error::NotReady`] before training has completed.
    pub fn subtract(&self, frame: &Array2<u8>) -> Result<Array2<u8>, Error> {
        if !self.ready {
            return Err(Error::NotReady);
        }
        if frame.dim() != self.shape {
            return Err(Error::MalformedFrame {
                index: 0,
                reason: format!("expected shape {:?}, got {:?}", self.shape, frame.dim()),
            });
        }

        let k = self.params.mixture_count;
        let thresh = f64::from(self.params.mog_var_thresh);
        let mut mask = Array2::zeros(self.shape);

        for ((pixel, &value), out) in frame.iter().enumerate().zip(mask.iter_mut()) {
            let mixture = &self.components[pixel * k..(pixel + 1) * k];
            let value = f64::from(value);

            let mut cumulative = 0.0;
            let mut background = true;
            for c in mixture {
                if c.weight <= 0.0 {
                    break;
                }
                let d = value - c.mean;
                if d * d <= thresh * c.var {
                    background = true;
                    break;
                }
                background = false;
                cumulative += c.weight;
                if cumulative > BACKGROUND_RATIO {
                    break;
                }
            }
            if !background {
                *out = 255;
            }
        }
        Ok(mask)
    }
}
