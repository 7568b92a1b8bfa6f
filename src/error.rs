use thiserror::Error;

pub type KalmanResult<T> = Result<T, KalmanError>;

/// Failures reported by filter construction and by a filter step.
///
/// A step that returns an error has not touched the belief.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KalmanError {
    /// A variance supplied at construction (or reset) is below zero.
    #[error("{name} must be a non-negative variance, got {value}")]
    NegativeVariance { name: &'static str, value: f64 },

    /// A coefficient or initial value is NaN or infinite.
    #[error("{name} must be finite, got {value}")]
    NonFiniteParameter { name: &'static str, value: f64 },

    /// `control` or `measurement` handed to a step is NaN or infinite.
    #[error("step input {name} must be finite, got {value}")]
    NonFiniteInput { name: &'static str, value: f64 },

    /// The innovation covariance is (numerically) singular, so the gain is undefined.
    /// Carries the scalar innovation covariance, or the trace of the matrix one.
    #[error("innovation covariance {innovation_covariance:e} is degenerate, gain undefined")]
    DegenerateInnovation { innovation_covariance: f64 },

    /// An initial covariance matrix differs from its transpose at `(row, col)`.
    #[error("initial covariance is not symmetric at ({row}, {col})")]
    AsymmetricCovariance { row: usize, col: usize },

    /// The predicted or corrected belief overflowed.
    #[error("belief is not finite (state {state}, covariance {covariance})")]
    NonFiniteEstimate { state: f64, covariance: f64 },
}

/// Strict-mode check shared by the estimators: the variance must be finite and >= 0.
pub(crate) fn check_variance(name: &'static str, value: f64) -> KalmanResult<()> {
    if !value.is_finite() {
        return Err(KalmanError::NonFiniteParameter { name, value });
    }
    if value < 0.0 {
        return Err(KalmanError::NegativeVariance { name, value });
    }
    Ok(())
}

pub(crate) fn check_finite(name: &'static str, value: f64) -> KalmanResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(KalmanError::NonFiniteParameter { name, value })
    }
}

pub(crate) fn check_input(name: &'static str, value: f64) -> KalmanResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(KalmanError::NonFiniteInput { name, value })
    }
}
