//! Foreground blob extraction: mask -> clusters -> oriented detections.

use ndarray::Array2;
use tracing::debug;

use crate::config::DetectorParameters;
use crate::detector::cluster::{dbscan, median_denoise};
use crate::detector::detection::Detection;

/// Clusters foreground pixels into per-frame [`Detection`]s.
#[derive(Debug, Clone)]
pub struct BlobExtractor {
    params: DetectorParameters,
}

impl BlobExtractor {
    pub fn new(params: DetectorParameters) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &DetectorParameters {
        &self.params
    }

    /// Extract detections from a foreground mask.
    ///
    /// Frames with fewer foreground pixels than `min_fg_pixels` after
    /// denoising yield an empty list, as do frames where every cluster falls
    /// below `detection_size`.
    pub fn extract(&self, mask: &Array2<u8>) -> Vec<Detection> {
        let denoised = median_denoise(mask, self.params.median_size);

        let points: Vec<[u32; 2]> = denoised
            .indexed_iter()
            .filter(|&(_, &v)| v != 0)
            .map(|((r, c), _)| [r as u32, c as u32])
            .collect();

        if points.len() < self.params.min_fg_pixels {
            return Vec::new();
        }

        let clusters = dbscan(
            &points,
            f64::from(self.params.dbscan_eps),
            self.params.dbscan_min_samples,
        );
        debug!(
            foreground = points.len(),
            clusters = clusters.len(),
            "clustered foreground pixels"
        );

        clusters
            .into_iter()
            .filter(|cluster| cluster.len() >= self.params.detection_size)
            .filter_map(Detection::from_pixels)
            .collect()
    }
}
