mod batch;
mod runner;
mod source;

pub use batch::process_batch;
pub use runner::{FrameResult, RunResult, TrackingPipeline, secondary_pass};
pub use source::{BatchOutcome, CancellationToken, FrameSource, VecFrameSource};
