//! Error taxonomy for the detection and tracking pipeline.

use thiserror::Error;

/// Errors surfaced by the pipeline and its components.
///
/// Cancellation of a long batch operation is deliberately not represented
/// here: it is a normal terminal path reported as
/// [`BatchOutcome::Cancelled`](crate::pipeline::BatchOutcome).
#[derive(Debug, Error)]
pub enum Error {
    /// An operation was requested before required initialization, e.g.
    /// background subtraction before training completed.
    #[error("background model is not trained yet")]
    NotReady,

    /// A configuration value was out of range. The previous valid value is
    /// retained by the caller; the change is not applied.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// A frame could not be read or had an unexpected shape. The pipeline
    /// treats the frame as having zero detections and continues.
    #[error("frame {index} could not be read: {reason}")]
    MalformedFrame { index: usize, reason: String },

    /// A delimited export listing failed to parse. `line` is the 1-based
    /// line number within the listing.
    #[error("detection listing line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    /// Export or import failed at the I/O layer. In-memory pipeline state is
    /// unaffected.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Export or import failed while (de)serializing a container.
    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
