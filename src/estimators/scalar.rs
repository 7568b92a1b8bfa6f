use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::{
    DEGENERATE_INNOVATION_TOLERANCE,
    config::{FilterConfig, Validation},
    engine::Mat,
    error::{KalmanError, KalmanResult, check_finite, check_input, check_variance},
    estimators::Filter,
};

/// Coefficients of the scalar system, fixed for the lifetime of a filter.
///
/// ```text
/// x_(n+1) = A x_n + B u_n + w,  w ~ N(0, Q)
/// z_n     = C x_n + v,          v ~ N(0, R)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalarModel {
    /// A
    pub process_dynamics: f64,
    /// B
    pub control_dynamics: f64,
    /// C
    pub measurement_model: f64,
    /// Q
    pub process_noise_covariance: f64,
    /// R
    pub measurement_noise_covariance: f64,
}

/// The filter's current opinion of the hidden state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Belief {
    pub state_estimate: f64,
    /// Variance of `state_estimate`, never negative.
    pub estimate_covariance: f64,
}

/// Belief projected one tick forward, before the measurement is seen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub state: f64,
    pub covariance: f64,
}

/// Measurement residual against the prediction, and its variance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Innovation {
    pub residual: f64,
    pub covariance: f64,
}

/// Intermediate quantities of one accepted step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    pub prediction: Prediction,
    pub innovation: Innovation,
    pub gain: f64,
}

/// Single-state linear Kalman filter.
#[derive(Debug, Clone)]
pub struct ScalarKalmanFilter {
    model: ScalarModel,
    belief: Belief,
    validation: Validation,
}

impl ScalarKalmanFilter {
    /// Builds a filter, rejecting negative variances and non-finite values.
    pub fn new(model: ScalarModel, initial: Belief) -> KalmanResult<Self> {
        check_model(&model)?;
        check_belief(&initial)?;
        debug!("scalar kalman filter created: {:?}, initial {:?}", model, initial);

        Ok(ScalarKalmanFilter {
            model,
            belief: initial,
            validation: Validation::Strict,
        })
    }

    /// Builds a filter without looking at the values. A negative variance here is
    /// the caller's problem; step inputs and the gain are still checked.
    pub fn new_unchecked(model: ScalarModel, initial: Belief) -> Self {
        ScalarKalmanFilter {
            model,
            belief: initial,
            validation: Validation::Permissive,
        }
    }

    pub fn from_config(config: &FilterConfig) -> KalmanResult<Self> {
        match config.validation {
            Validation::Strict => ScalarKalmanFilter::new(config.model, config.initial),
            Validation::Permissive => {
                Ok(ScalarKalmanFilter::new_unchecked(config.model, config.initial))
            }
        }
    }

    pub fn model(&self) -> &ScalarModel {
        &self.model
    }

    pub fn belief(&self) -> Belief {
        self.belief
    }

    pub fn state_estimate(&self) -> f64 {
        self.belief.state_estimate
    }

    pub fn estimate_covariance(&self) -> f64 {
        self.belief.estimate_covariance
    }

    /// Replaces the belief, e.g. to recover after a rejected step.
    pub fn reset(&mut self, initial: Belief) -> KalmanResult<()> {
        if self.validation == Validation::Strict {
            check_belief(&initial)?;
        }
        debug!("scalar kalman filter reset to {:?}", initial);
        self.belief = initial;
        Ok(())
    }

    /// Time update: `A x + B u` and `A P A + Q`.
    pub fn predict(&self, control: f64) -> Prediction {
        let m = &self.model;
        let x = self.belief.state_estimate;
        let p = self.belief.estimate_covariance;

        Prediction {
            state: m.process_dynamics * x + m.control_dynamics * control,
            covariance: m.process_dynamics * p * m.process_dynamics + m.process_noise_covariance,
        }
    }

    /// Observation step: `z - C x'` and `C P' C + R`.
    pub fn innovate(&self, measurement: f64, prediction: &Prediction) -> Innovation {
        let c = self.model.measurement_model;

        Innovation {
            residual: measurement - c * prediction.state,
            covariance: c * prediction.covariance * c + self.model.measurement_noise_covariance,
        }
    }

    /// Kalman gain `P' C / S`, refusing to divide by an `S` that is zero relative to
    /// the terms `C P' C` and `R` it is built from.
    pub fn gain(&self, prediction: &Prediction, innovation: &Innovation) -> KalmanResult<f64> {
        let c = self.model.measurement_model;
        let s = innovation.covariance;
        if !s.is_finite() {
            return Err(KalmanError::NonFiniteEstimate {
                state: prediction.state,
                covariance: s,
            });
        }

        let scale = (c * prediction.covariance * c).abs()
            + self.model.measurement_noise_covariance.abs();
        if s == 0.0 || s.abs() <= DEGENERATE_INNOVATION_TOLERANCE * scale {
            return Err(KalmanError::DegenerateInnovation {
                innovation_covariance: s,
            });
        }

        Ok(prediction.covariance * c / s)
    }

    /// Advances the belief by one tick. Read the result back through
    /// [`state_estimate`](Self::state_estimate) and
    /// [`estimate_covariance`](Self::estimate_covariance).
    pub fn step(&mut self, control: f64, measurement: f64) -> KalmanResult<()> {
        self.step_with_report(control, measurement).map(|_| ())
    }

    /// Like [`step`](Self::step), also handing back the intermediate values.
    pub fn step_with_report(&mut self, control: f64, measurement: f64) -> KalmanResult<StepReport> {
        let report = self.correct(control, measurement);
        match report {
            Ok((belief, report)) => {
                trace!(
                    "step u={} z={}: gain {} -> x={} p={}",
                    control,
                    measurement,
                    report.gain,
                    belief.state_estimate,
                    belief.estimate_covariance
                );
                self.belief = belief;
                Ok(report)
            }
            Err(e) => {
                debug!("step u={} z={} rejected: {}", control, measurement, e);
                Err(e)
            }
        }
    }

    // Everything up to, but not including, the commit.
    fn correct(&self, control: f64, measurement: f64) -> KalmanResult<(Belief, StepReport)> {
        check_input("control", control)?;
        check_input("measurement", measurement)?;

        let prediction = self.predict(control);
        if !prediction.state.is_finite() || !prediction.covariance.is_finite() {
            return Err(KalmanError::NonFiniteEstimate {
                state: prediction.state,
                covariance: prediction.covariance,
            });
        }
        let innovation = self.innovate(measurement, &prediction);
        let gain = self.gain(&prediction, &innovation)?;

        // (1 - K C) P' == R P' / S, which cannot round below zero.
        let belief = Belief {
            state_estimate: prediction.state + gain * innovation.residual,
            estimate_covariance: self.model.measurement_noise_covariance * prediction.covariance
                / innovation.covariance,
        };
        if !belief.state_estimate.is_finite() || !belief.estimate_covariance.is_finite() {
            return Err(KalmanError::NonFiniteEstimate {
                state: belief.state_estimate,
                covariance: belief.estimate_covariance,
            });
        }

        Ok((
            belief,
            StepReport {
                prediction,
                innovation,
                gain,
            },
        ))
    }
}

impl Filter<1, 1, 1> for ScalarKalmanFilter {
    fn filter(&mut self, u: Mat<f64, 1, 1>, measurement: Mat<f64, 1, 1>) -> KalmanResult<()> {
        self.step(u[0], measurement[0])
    }

    fn state(&self) -> Mat<f64, 1, 1> {
        Mat::<f64, 1, 1>::new(self.belief.state_estimate)
    }

    fn covariance(&self) -> Mat<f64, 1, 1> {
        Mat::<f64, 1, 1>::new(self.belief.estimate_covariance)
    }
}

fn check_model(model: &ScalarModel) -> KalmanResult<()> {
    check_finite("process_dynamics", model.process_dynamics)?;
    check_finite("control_dynamics", model.control_dynamics)?;
    check_finite("measurement_model", model.measurement_model)?;
    check_variance("process_noise_covariance", model.process_noise_covariance)?;
    check_variance("measurement_noise_covariance", model.measurement_noise_covariance)
}

fn check_belief(belief: &Belief) -> KalmanResult<()> {
    check_finite("state_estimate", belief.state_estimate)?;
    check_variance("estimate_covariance", belief.estimate_covariance)
}
