extern crate nalgebra as na;

/// An innovation covariance no larger than this fraction of the terms it was summed
/// from is indistinguishable from zero, and the step is refused.
pub const DEGENERATE_INNOVATION_TOLERANCE: f64 = 4.0 * f64::EPSILON;

/// Largest tolerated `‖S S⁻¹ − I‖` before a matrix innovation covariance counts as singular.
pub const SINGULAR_INVERSE_TOLERANCE: f64 = 1e-8;

pub mod config;
pub mod engine;
pub mod error;
pub mod estimators;

pub use config::{FilterConfig, Validation};
pub use error::{KalmanError, KalmanResult};
pub use estimators::{
    Filter,
    kalman::LinearKalmanFilter,
    scalar::{Belief, ScalarKalmanFilter, ScalarModel, StepReport},
};
