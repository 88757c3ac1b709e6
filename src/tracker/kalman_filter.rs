//! Constant-velocity Kalman filter for point targets, using ndarray with a
//! nalgebra-based inverse for the innovation matrix.

use ndarray::{Array1, Array2, array};

/// State layout is `[x, vx, y, vy]`; the measurement observes `[x, y]`.
/// One filter instance is shared by all tracks of a manager.
#[derive(Debug, Clone)]
pub struct KalmanFilter {
    motion_mat: Array2<f64>,
    update_mat: Array2<f64>,
    position_noise: f64,
    velocity_noise: f64,
    measurement_noise: f64,
}

impl Default for KalmanFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl KalmanFilter {
    pub fn new() -> Self {
        // x' = x + vx, vx' = vx (fixed unit timestep), same for y.
        let motion_mat = array![
            [1.0, 1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 1.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
        let update_mat = array![[1.0, 0.0, 0.0, 0.0], [0.0, 0.0, 1.0, 0.0]];

        Self {
            motion_mat,
            update_mat,
            position_noise: 1e-2,
            velocity_noise: 1e-4,
            measurement_noise: 1.0,
        }
    }

    /// Initial state and covariance for a first measurement. Velocity is
    /// unobserved, so its variance starts large.
    pub fn initiate(&self, measurement: [f64; 2]) -> (Array1<f64>, Array2<f64>) {
        let mean = array![measurement[0], 0.0, measurement[1], 0.0];
        let mut cov = Array2::zeros((4, 4));
        let std = [10.0, 1000.0, 10.0, 1000.0];
        for (i, s) in std.iter().enumerate() {
            cov[[i, i]] = *s;
        }
        (mean, cov)
    }

    pub fn predict(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
    ) -> (Array1<f64>, Array2<f64>) {
        let mut motion_cov = Array2::zeros((4, 4));
        let std = [
            self.position_noise,
            self.velocity_noise,
            self.position_noise,
            self.velocity_noise,
        ];
        for (i, s) in std.iter().enumerate() {
            motion_cov[[i, i]] = *s;
        }

        let new_mean = self.motion_mat.dot(mean);
        let new_covariance = self.motion_mat.dot(covariance).dot(&self.motion_mat.t()) + motion_cov;
        (new_mean, new_covariance)
    }

    pub fn update(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
        measurement: [f64; 2],
    ) -> (Array1<f64>, Array2<f64>) {
        // S = H P H^T + R
        let mut innovation_cov = self
            .update_mat
            .dot(covariance)
            .dot(&self.update_mat.t());
        innovation_cov[[0, 0]] += self.measurement_noise;
        innovation_cov[[1, 1]] += self.measurement_noise;

        let projected_mean = self.update_mat.dot(mean);
        let innovation = array![
            measurement[0] - projected_mean[0],
            measurement[1] - projected_mean[1]
        ];

        // K = P H^T S^-1
        let s_inv = self.invert_2x2(&innovation_cov);
        let pht = covariance.dot(&self.update_mat.t());
        let kalman_gain = pht.dot(&s_inv);

        let new_mean = mean + kalman_gain.dot(&innovation);
        let new_covariance =
            covariance - kalman_gain.dot(&innovation_cov).dot(&kalman_gain.t());
        (new_mean, new_covariance)
    }

    /// Helper to invert the 2x2 innovation matrix using nalgebra (pure Rust).
    fn invert_2x2(&self, m: &Array2<f64>) -> Array2<f64> {
        let nm = nalgebra::Matrix2::new(m[[0, 0]], m[[0, 1]], m[[1, 0]], m[[1, 1]]);
        let inv = nm
            .try_inverse()
            .expect("2x2 innovation matrix inversion failed");
        array![[inv[(0, 0)], inv[(0, 1)]], [inv[(1, 0)], inv[(1, 1)]]]
    }
}
