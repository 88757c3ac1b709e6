//! Upstream frame supply and cooperative cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use ndarray::Array2;

use crate::error::Error;

/// Supplies grayscale intensity frames to the pipeline.
///
/// The pipeline never interprets raw file bytes; decoding proprietary sonar
/// containers happens behind this trait.
pub trait FrameSource {
    fn frame_count(&self) -> usize;

    /// Fetch one frame as a 2D intensity array.
    fn frame(&self, index: usize) -> Result<Array2<u8>, Error>;
}

/// In-memory frame source for tests and pre-decoded sequences.
#[derive(Debug, Clone, Default)]
pub struct VecFrameSource {
    frames: Vec<Array2<u8>>,
}

impl VecFrameSource {
    pub fn new(frames: Vec<Array2<u8>>) -> Self {
        Self { frames }
    }
}

impl FrameSource for VecFrameSource {
    fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn frame(&self, index: usize) -> Result<Array2<u8>, Error> {
        self.frames
            .get(index)
            .cloned()
            .ok_or_else(|| Error::MalformedFrame {
                index,
                reason: "index out of range".into(),
            })
    }
}

/// How a long batch operation ended.
///
/// Cancellation is a normal terminal path, not an error; it leaves the
/// operation's output in a well-defined "not computed" state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    Completed,
    Cancelled,
}

/// Cooperative stop flag polled once per frame by batch operations.
///
/// Clones share the flag, so a UI thread can cancel a worker mid-sweep
/// without preemption.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
