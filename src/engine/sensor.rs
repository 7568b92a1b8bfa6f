use rand_distr::Normal;

use crate::error::{KalmanError, KalmanResult, check_variance};

/// Zero-mean Gaussian noise source, described by its variance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SensorSpec {
    variance: f64,
}

impl SensorSpec {
    pub const fn new(variance: f64) -> Self {
        SensorSpec { variance }
    }

    pub fn variance(&self) -> f64 {
        self.variance
    }

    pub fn sigma(&self) -> f64 {
        self.variance.sqrt()
    }

    /// Checks the variance and builds the distribution to draw noise from.
    pub fn distribution(&self, name: &'static str) -> KalmanResult<Normal<f64>> {
        check_variance(name, self.variance)?;
        Normal::new(0.0, self.sigma()).map_err(|_| KalmanError::NonFiniteParameter {
            name,
            value: self.variance,
        })
    }
}
