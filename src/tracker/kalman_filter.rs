//! Constant-velocity Kalman filter over XYAH boxes.
//!
//! State is `[cx, cy, a, h, vx, vy, va, vh]`; only the first four are observed.

use ndarray::{Array1, Array2};

const NDIM: usize = 4;

#[derive(Debug, Clone)]
pub struct KalmanFilter {
    motion_mat: Array2<f64>,
    update_mat: Array2<f64>,
    std_weight_position: f64,
    std_weight_velocity: f64,
}

impl Default for KalmanFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl KalmanFilter {
    pub fn new() -> Self {
        let mut motion_mat = Array2::eye(2 * NDIM);
        let mut update_mat = Array2::zeros((NDIM, 2 * NDIM));
        for i in 0..NDIM {
            motion_mat[[i, NDIM + i]] = 1.0;
            update_mat[[i, i]] = 1.0;
        }
        Self {
            motion_mat,
            update_mat,
            std_weight_position: 1.0 / 20.0,
            std_weight_velocity: 1.0 / 160.0,
        }
    }

    pub fn initiate(&self, measurement: [f64; 4]) -> (Array1<f64>, Array2<f64>) {
        let mut mean = Array1::zeros(2 * NDIM);
        mean.slice_mut(ndarray::s![..NDIM])
            .assign(&Array1::from_vec(measurement.to_vec()));

        let h = measurement[3];
        let (p, v) = (self.std_weight_position * h, self.std_weight_velocity * h);
        let cov = squared_diag(&[
            2.0 * p,
            2.0 * p,
            1e-2,
            2.0 * p,
            10.0 * v,
            10.0 * v,
            1e-5,
            10.0 * v,
        ]);
        (mean, cov)
    }

    pub fn predict(&self, mean: &Array1<f64>, covariance: &Array2<f64>) -> (Array1<f64>, Array2<f64>) {
        let h = mean[3];
        let (p, v) = (self.std_weight_position * h, self.std_weight_velocity * h);
        let motion_cov = squared_diag(&[p, p, 1e-2, p, v, v, 1e-5, v]);

        let new_mean = self.motion_mat.dot(mean);
        let new_cov = self.motion_mat.dot(covariance).dot(&self.motion_mat.t()) + motion_cov;
        (new_mean, new_cov)
    }

    fn project(&self, mean: &Array1<f64>, covariance: &Array2<f64>) -> (Array1<f64>, Array2<f64>) {
        let p = self.std_weight_position * mean[3];
        let innovation_cov = squared_diag(&[p, p, 1e-1, p]);

        let mean_proj = self.update_mat.dot(mean);
        let cov_proj = self.update_mat.dot(covariance).dot(&self.update_mat.t()) + innovation_cov;
        (mean_proj, cov_proj)
    }

    /// Correct the prediction with a measurement.
    ///
    /// Returns `None` if the projected covariance is singular; callers keep the
    /// predicted state in that case.
    pub fn update(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
        measurement: [f64; 4],
    ) -> Option<(Array1<f64>, Array2<f64>)> {
        let (projected_mean, projected_cov) = self.project(mean, covariance);
        let innovation = Array1::from_vec(measurement.to_vec()) - projected_mean;

        // K = P * H^T * S^-1
        let s_inv = invert_4x4(&projected_cov)?;
        let kalman_gain = covariance.dot(&self.update_mat.t()).dot(&s_inv);

        let new_mean = mean + &kalman_gain.dot(&innovation);
        let new_cov = covariance - &kalman_gain.dot(&projected_cov).dot(&kalman_gain.t());
        Some((new_mean, new_cov))
    }
}

fn squared_diag(std: &[f64]) -> Array2<f64> {
    Array2::from_diag(&Array1::from_iter(std.iter().map(|s| s * s)))
}

/// 4x4 inverse via nalgebra, which keeps us off BLAS/LAPACK.
fn invert_4x4(m: &Array2<f64>) -> Option<Array2<f64>> {
    let inv = nalgebra::Matrix4::from_fn(|i, j| m[[i, j]]).try_inverse()?;
    Some(Array2::from_shape_fn((NDIM, NDIM), |(i, j)| inv[(i, j)]))
}
