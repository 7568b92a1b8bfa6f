use serde::{Deserialize, Serialize};

use crate::estimators::scalar::{Belief, ScalarModel};

/// How much checking a filter does on the values it is built from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Validation {
    /// Reject negative or non-finite variances and non-finite coefficients.
    #[default]
    Strict,
    /// Accept anything. Step inputs are still checked.
    Permissive,
}

/// Everything needed to build a [`ScalarKalmanFilter`](crate::ScalarKalmanFilter).
///
/// The default reproduces the textbook example: a random constant observed directly,
/// `A = 1, B = 0, C = 1, Q = 0.01, R = 1`, starting from `x = 0, P = 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub model: ScalarModel,
    pub initial: Belief,
    #[serde(default)]
    pub validation: Validation,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            model: ScalarModel {
                process_dynamics: 1.0,
                control_dynamics: 0.0,
                measurement_model: 1.0,
                process_noise_covariance: 0.01,
                measurement_noise_covariance: 1.0,
            },
            initial: Belief {
                state_estimate: 0.0,
                estimate_covariance: 1.0,
            },
            validation: Validation::Strict,
        }
    }
}
