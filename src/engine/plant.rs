use rand::{SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Normal};

use crate::{
    engine::{Measure, Step, sensor::SensorSpec},
    error::{KalmanResult, check_finite},
};

/// A simulated scalar linear system, the "truth" a filter tries to recover.
#[derive(Debug, Clone)]
pub struct DiscretePlant {
    // x_(n+1) = Ax+Bu+w, w ~ N(0, sigma_x^2)
    // y = Cx + v, v ~ N(0, sigma_y^2)
    a: f64,
    b: f64,
    c: f64,
    w: Normal<f64>,
    v: Normal<f64>,

    x: f64,
    rng: StdRng,
}

impl DiscretePlant {
    /// Same `seed`, same noise sequence.
    pub fn new(
        a: f64,
        b: f64,
        c: f64,
        w: SensorSpec,
        v: SensorSpec,
        x0: f64,
        seed: u64,
    ) -> KalmanResult<Self> {
        check_finite("a", a)?;
        check_finite("b", b)?;
        check_finite("c", c)?;
        check_finite("x0", x0)?;

        Ok(DiscretePlant {
            a,
            b,
            c,
            w: w.distribution("process noise")?,
            v: v.distribution("sensor noise")?,
            x: x0,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// A constant observed directly through a noisy sensor.
    pub fn constant(value: f64, sensor: SensorSpec, seed: u64) -> KalmanResult<Self> {
        DiscretePlant::new(1.0, 0.0, 1.0, SensorSpec::new(0.0), sensor, value, seed)
    }

    /// True state, for scoring an estimate.
    pub fn state(&self) -> f64 {
        self.x
    }
}

impl Step for DiscretePlant {
    fn step(&mut self, control: f64) {
        self.x = self.a * self.x + self.b * control + self.w.sample(&mut self.rng);
    }
}

impl Measure for DiscretePlant {
    fn measure(&mut self) -> f64 {
        self.c * self.x + self.v.sample(&mut self.rng)
    }
}
