mod cluster;
mod detection;
mod extractor;

pub use cluster::{dbscan, median_denoise};
pub use detection::{CoordinateMapper, Detection, LinearMapper, PhysicalMetrics};
pub use extractor::BlobExtractor;
