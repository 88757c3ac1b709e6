//! Oriented-box detection geometry and physical measurement mapping.

use nalgebra::{Matrix2, Vector2};
use serde::{Deserialize, Serialize};

/// Geometric summary of one foreground blob in one frame.
///
/// Positions are `[row, col]` pixel coordinates. A detection is immutable
/// once constructed; identity across frames is established by the tracker,
/// never by cluster labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Member pixels of the originating cluster. Empty for detections
    /// reconstructed from an export container.
    pixels: Vec<[u32; 2]>,
    /// Center of the oriented box.
    centroid: [f64; 2],
    /// Half-extents along the principal axes, major first.
    half_extents: [f64; 2],
    /// Oriented box corners, wound so that `corners[0] -> corners[1]` runs
    /// along the major axis.
    corners: [[f64; 2]; 4],
}

impl Detection {
    /// Build a detection from a cluster of foreground pixels.
    ///
    /// The pixel coordinates are eigendecomposed (PCA) to find the principal
    /// axes; the box is the projected min/max extent rotated back into pixel
    /// space. Clusters with fewer than 2 points yield `None`.
    pub fn from_pixels(pixels: Vec<[u32; 2]>) -> Option<Self> {
        if pixels.len() < 2 {
            return None;
        }

        let n = pixels.len() as f64;
        let mut mean = Vector2::zeros();
        for p in &pixels {
            mean += Vector2::new(f64::from(p[0]), f64::from(p[1]));
        }
        mean /= n;

        let mut cov = Matrix2::zeros();
        for p in &pixels {
            let d = Vector2::new(f64::from(p[0]), f64::from(p[1])) - mean;
            cov += d * d.transpose();
        }
        cov /= n;

        let eigen = cov.symmetric_eigen();
        // Columns of `basis` are the principal axes, major first.
        let order = if eigen.eigenvalues[0] >= eigen.eigenvalues[1] {
            [0, 1]
        } else {
            [1, 0]
        };
        let basis = Matrix2::from_columns(&[
            eigen.eigenvectors.column(order[0]).into_owned(),
            eigen.eigenvectors.column(order[1]).into_owned(),
        ]);

        let mut min = Vector2::repeat(f64::INFINITY);
        let mut max = Vector2::repeat(f64::NEG_INFINITY);
        for p in &pixels {
            let projected =
                basis.transpose() * (Vector2::new(f64::from(p[0]), f64::from(p[1])) - mean);
            min = min.inf(&projected);
            max = max.sup(&projected);
        }

        let half = (max - min) / 2.0;
        let center = min + half;
        let offsets = [
            Vector2::new(-half[0], -half[1]),
            Vector2::new(half[0], -half[1]),
            Vector2::new(half[0], half[1]),
            Vector2::new(-half[0], half[1]),
        ];
        let mut corners = [[0.0; 2]; 4];
        for (corner, offset) in corners.iter_mut().zip(offsets) {
            let back = basis * (center + offset) + mean;
            *corner = [back[0], back[1]];
        }
        let centroid = basis * center + mean;

        Some(Self {
            pixels,
            centroid: [centroid[0], centroid[1]],
            half_extents: [half[0], half[1]],
            corners,
        })
    }

    /// Reconstruct the geometric summary from exported corners.
    ///
    /// Pixel membership does not survive a round trip through the track
    /// export; the result is sufficient for visualization and secondary
    /// tracking.
    pub fn from_corners(corners: [[f64; 2]; 4]) -> Self {
        let centroid = [
            corners.iter().map(|c| c[0]).sum::<f64>() / 4.0,
            corners.iter().map(|c| c[1]).sum::<f64>() / 4.0,
        ];
        let edge = |a: [f64; 2], b: [f64; 2]| ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt();
        let half_extents = [
            edge(corners[1], corners[0]) / 2.0,
            edge(corners[3], corners[0]) / 2.0,
        ];
        Self {
            pixels: Vec::new(),
            centroid,
            half_extents,
            corners,
        }
    }

    /// Member pixels as `[row, col]`.
    pub fn pixels(&self) -> &[[u32; 2]] {
        &self.pixels
    }

    /// Box center as `[row, col]`.
    pub fn centroid(&self) -> [f64; 2] {
        self.centroid
    }

    /// Half-extents along the principal axes, major first.
    pub fn half_extents(&self) -> [f64; 2] {
        self.half_extents
    }

    pub fn corners(&self) -> [[f64; 2]; 4] {
        self.corners
    }

    /// Endpoints of the major axis, i.e. midpoints of the two short edges.
    pub fn major_axis(&self) -> ([f64; 2], [f64; 2]) {
        let mid = |a: [f64; 2], b: [f64; 2]| [(a[0] + b[0]) / 2.0, (a[1] + b[1]) / 2.0];
        (
            mid(self.corners[0], self.corners[3]),
            mid(self.corners[1], self.corners[2]),
        )
    }

    /// Ratio of the major to the minor half-extent.
    pub fn aspect(&self) -> f64 {
        self.half_extents[0] / self.half_extents[1].max(1e-9)
    }

    /// Derive physical attributes through a coordinate mapping collaborator.
    pub fn metrics(&self, mapper: &dyn CoordinateMapper) -> PhysicalMetrics {
        let (tail, head) = self.major_axis();
        let a = mapper.metric_point(tail);
        let b = mapper.metric_point(head);
        let length = ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt();
        let (distance, angle) = mapper.pixel_to_polar(self.centroid);
        PhysicalMetrics {
            length,
            distance,
            angle,
            aspect: self.aspect(),
        }
    }
}

/// Physical attributes of a detection under some coordinate mapping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicalMetrics {
    /// Target length in meters.
    pub length: f64,
    /// Range from the sonar head in meters.
    pub distance: f64,
    /// Bearing in degrees.
    pub angle: f64,
    /// Major/minor extent ratio.
    pub aspect: f64,
}

/// Pixel to physical coordinate conversion supplied by the frame source.
///
/// The pipeline never interprets sonar geometry itself; implementations wrap
/// whatever beam model the upstream file format carries.
pub trait CoordinateMapper {
    /// Physical `(distance, angle)` of a pixel position `[row, col]`, in
    /// meters and degrees.
    fn pixel_to_polar(&self, position: [f64; 2]) -> (f64, f64);

    /// Cartesian metric point of a pixel position.
    fn metric_point(&self, position: [f64; 2]) -> [f64; 2] {
        let (distance, angle) = self.pixel_to_polar(position);
        let rad = angle.to_radians();
        [distance * rad.sin(), distance * rad.cos()]
    }
}

/// Affine pixel/polar mapping for rigs with constant range and beam spacing.
#[derive(Debug, Clone, Copy)]
pub struct LinearMapper {
    pub min_distance: f64,
    pub meters_per_row: f64,
    pub degrees_per_col: f64,
    pub beam_center_col: f64,
}

impl Default for LinearMapper {
    fn default() -> Self {
        Self {
            min_distance: 0.0,
            meters_per_row: 1.0,
            degrees_per_col: 1.0,
            beam_center_col: 0.0,
        }
    }
}

impl CoordinateMapper for LinearMapper {
    fn pixel_to_polar(&self, position: [f64; 2]) -> (f64, f64) {
        (
            self.min_distance + position[0] * self.meters_per_row,
            (position[1] - self.beam_center_col) * self.degrees_per_col,
        )
    }
}
