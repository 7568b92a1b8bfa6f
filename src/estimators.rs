use crate::{engine::Mat, error::KalmanResult};

pub mod kalman;
pub mod scalar;

/// N - Number of states
/// R - Number of control inputs
/// P - Number of sensors
pub trait Filter<const N: usize, const R: usize, const P: usize> {
    /// Performs both the predict and update steps.
    ///
    /// On error the belief is left exactly as it was.
    fn filter(&mut self, u: Mat<f64, R, 1>, measurement: Mat<f64, P, 1>) -> KalmanResult<()>;

    /// Returns the current state estimate.
    fn state(&self) -> Mat<f64, N, 1>;

    /// Returns the current covariance matrix.
    fn covariance(&self) -> Mat<f64, N, N>;
}
