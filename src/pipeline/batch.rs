//! Whole-file batch processing across independent pipeline instances.

use rayon::prelude::*;
use tracing::info;

use crate::config::PipelineConfig;
use crate::error::Error;
use crate::pipeline::runner::{RunResult, TrackingPipeline};
use crate::pipeline::source::{CancellationToken, FrameSource};

/// Process several independent frame sources, one pipeline instance per
/// source, on a bounded worker pool.
///
/// Each worker trains its own background model and sweeps its own file; no
/// mutable state is shared between files, and `parallelism` caps concurrent
/// memory use (each instance buffers one file's model). The cancellation
/// token is shared: cancelling stops every in-flight sweep at its next frame
/// boundary. Per-file failures do not abort the batch.
pub fn process_batch<S>(
    sources: &[S],
    config: PipelineConfig,
    parallelism: usize,
    token: &CancellationToken,
) -> Result<Vec<Result<RunResult, Error>>, Error>
where
    S: FrameSource + Sync,
{
    config.validate()?;
    if parallelism == 0 {
        return Err(Error::invalid("parallelism", "must be at least 1"));
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(parallelism)
        .build()
        .map_err(|e| Error::invalid("parallelism", e.to_string()))?;

    info!(files = sources.len(), parallelism, "starting batch sweep");
    let results = pool.install(|| {
        sources
            .par_iter()
            .map(|source| {
                let mut pipeline = TrackingPipeline::new(config)?;
                pipeline.train_background(source, token)?;
                if !pipeline.background().is_ready() {
                    // Training was cancelled; report the sweep as cancelled
                    // rather than half-running it.
                    return Ok(RunResult {
                        outcome: crate::pipeline::BatchOutcome::Cancelled,
                        frames: Vec::new(),
                    });
                }
                pipeline.run(source, token)
            })
            .collect()
    });
    Ok(results)
}
