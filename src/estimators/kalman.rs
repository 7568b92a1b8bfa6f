use log::{debug, trace};

use crate::{
    SINGULAR_INVERSE_TOLERANCE,
    engine::{Mat, sensor::SensorSpec},
    error::{KalmanError, KalmanResult, check_variance},
    estimators::Filter,
};

/// The system supplied should be discrete.
///
/// Multi-state form of [`ScalarKalmanFilter`](super::scalar::ScalarKalmanFilter):
/// every `A P A` becomes `A P Aᵗ` and the division by the innovation variance
/// becomes a matrix inverse. Noise is uncorrelated between states and between
/// sensors, so `Q` and `R` are diagonal.
///
/// Strict construction checks that the initial covariance is symmetric with a
/// non-negative diagonal; it does not test positive semi-definiteness.
pub struct LinearKalmanFilter<const N: usize, const R: usize, const P: usize> {
    // x_(n+1) = Ax+Bu+w, w ~ N(0, Q)
    // y = Cx + v, v ~ N(0, R)
    a: Mat<f64, N, N>,
    b: Mat<f64, N, R>,
    q: Mat<f64, N, N>,

    c: Mat<f64, P, N>,
    r: Mat<f64, P, P>,

    x: Mat<f64, N, 1>,
    p: Mat<f64, N, N>,
}

impl<const N: usize, const R: usize, const P: usize> LinearKalmanFilter<N, R, P> {
    pub fn new(
        a: Mat<f64, N, N>,
        b: Mat<f64, N, R>,
        w: Mat<SensorSpec, N, 1>,

        c: Mat<f64, P, N>,
        v: Mat<SensorSpec, P, 1>,

        state_initial_guess: Mat<f64, N, 1>,
        uncertainty_initial_guess: Mat<f64, N, N>,
    ) -> KalmanResult<Self> {
        check_all_finite("a", a.iter())?;
        check_all_finite("b", b.iter())?;
        check_all_finite("c", c.iter())?;
        check_all_finite("initial state", state_initial_guess.iter())?;
        check_all_finite("initial covariance", uncertainty_initial_guess.iter())?;
        for i in 0..N {
            check_variance("process noise", w[i].variance())?;
            check_variance("initial covariance", uncertainty_initial_guess[(i, i)])?;
        }
        for i in 0..P {
            check_variance("sensor noise", v[i].variance())?;
        }
        check_symmetric(&uncertainty_initial_guess)?;

        let q = Mat::<f64, N, N>::from_diagonal(&w.map(|s: SensorSpec| s.variance()));
        let r = Mat::<f64, P, P>::from_diagonal(&v.map(|s: SensorSpec| s.variance()));
        debug!("linear kalman filter created with {} states, {} inputs, {} sensors", N, R, P);

        Ok(LinearKalmanFilter {
            a,
            b,
            q,
            c,
            r,
            x: state_initial_guess,
            p: uncertainty_initial_guess,
        })
    }
}

impl<const N: usize, const R: usize, const P: usize> Filter<N, R, P>
    for LinearKalmanFilter<N, R, P>
{
    fn filter(&mut self, u: Mat<f64, R, 1>, measurement: Mat<f64, P, 1>) -> KalmanResult<()> {
        check_all_inputs("control", u.iter())?;
        check_all_inputs("measurement", measurement.iter())?;

        let x_pred = self.a * self.x + self.b * u;
        let p_pred = self.a * self.p * self.a.transpose() + self.q;

        let innovation = measurement - self.c * x_pred;
        let s = self.c * p_pred * self.c.transpose() + self.r;

        if x_pred.iter().chain(s.iter()).any(|v| !v.is_finite()) {
            return Err(KalmanError::NonFiniteEstimate {
                state: x_pred.norm(),
                covariance: p_pred.trace(),
            });
        }

        // Scale-free: judged by how well the inverse reproduces the identity.
        let degenerate = KalmanError::DegenerateInnovation {
            innovation_covariance: s.trace(),
        };
        let s_inv = s.try_inverse().ok_or_else(|| degenerate.clone())?;
        let residual = (s * s_inv - Mat::<f64, P, P>::identity()).norm();
        if !residual.is_finite() || residual > SINGULAR_INVERSE_TOLERANCE {
            debug!("step rejected: innovation covariance inverse residual {:e}", residual);
            return Err(degenerate);
        }

        let gain = p_pred * self.c.transpose() * s_inv;

        let x = x_pred + gain * innovation;
        // Joseph form keeps P symmetric and positive semi-definite.
        let p_1 = Mat::<f64, N, N>::identity() - gain * self.c;
        let p = p_1 * p_pred * p_1.transpose() + gain * self.r * gain.transpose();

        if x.iter().chain(p.iter()).any(|v| !v.is_finite()) {
            return Err(KalmanError::NonFiniteEstimate {
                state: x.norm(),
                covariance: p.trace(),
            });
        }

        trace!("innovation {} -> state {}", innovation, x);
        self.x = x;
        self.p = p;
        Ok(())
    }

    fn state(&self) -> Mat<f64, N, 1> {
        self.x
    }

    fn covariance(&self) -> Mat<f64, N, N> {
        self.p
    }
}

const SYMMETRY_TOLERANCE: f64 = 1e-9;

fn check_symmetric<const N: usize>(p: &Mat<f64, N, N>) -> KalmanResult<()> {
    for row in 0..N {
        for col in (row + 1)..N {
            let (upper, lower) = (p[(row, col)], p[(col, row)]);
            if (upper - lower).abs() > SYMMETRY_TOLERANCE * (upper.abs() + lower.abs()) {
                return Err(KalmanError::AsymmetricCovariance { row, col });
            }
        }
    }
    Ok(())
}

fn check_all_finite<'a>(
    name: &'static str,
    mut values: impl Iterator<Item = &'a f64>,
) -> KalmanResult<()> {
    match values.find(|v| !v.is_finite()) {
        Some(&value) => Err(KalmanError::NonFiniteParameter { name, value }),
        None => Ok(()),
    }
}

fn check_all_inputs<'a>(
    name: &'static str,
    mut values: impl Iterator<Item = &'a f64>,
) -> KalmanResult<()> {
    match values.find(|v| !v.is_finite()) {
        Some(&value) => Err(KalmanError::NonFiniteInput { name, value }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    const TOLERANCE: f64 = 1e-9;

    use assertables::{assert_in_delta, assert_lt};

    use super::*;
    use crate::{config::FilterConfig, estimators::scalar::ScalarKalmanFilter};

    type Mat1<T> = Mat<T, 1, 1>;

    fn constant_velocity(dt: f64) -> LinearKalmanFilter<2, 1, 1> {
        LinearKalmanFilter::new(
            Mat::<f64, 2, 2>::new(1.0, dt, 0.0, 1.0),
            Mat::<f64, 2, 1>::new(0.0, 0.0),
            Mat::<SensorSpec, 2, 1>::new(SensorSpec::new(1e-4), SensorSpec::new(1e-4)),
            Mat::<f64, 1, 2>::new(1.0, 0.0),
            Mat1::new(SensorSpec::new(1e-2)),
            Mat::<f64, 2, 1>::new(0.0, 0.0),
            Mat::<f64, 2, 2>::new(10.0, 0.0, 0.0, 10.0),
        )
        .unwrap()
    }

    #[test]
    fn test_single_state_agrees_with_scalar() {
        let mut scalar = ScalarKalmanFilter::from_config(&FilterConfig::default()).unwrap();
        let mut matrix = LinearKalmanFilter::<1, 1, 1>::new(
            Mat1::new(1.0),
            Mat1::new(0.0),
            Mat1::new(SensorSpec::new(0.01)),
            Mat1::new(1.0),
            Mat1::new(SensorSpec::new(1.0)),
            Mat1::new(0.0),
            Mat1::new(1.0),
        )
        .unwrap();

        for z in [1.0, 0.8, 1.3, 0.9, 1.1, 1.0] {
            scalar.step(0.0, z).unwrap();
            matrix.filter([0.0].into(), [z].into()).unwrap();
            assert_in_delta!(matrix.state()[0], scalar.state_estimate(), TOLERANCE);
            assert_in_delta!(matrix.covariance()[0], scalar.estimate_covariance(), TOLERANCE);
        }
    }

    #[test]
    fn test_tracks_ramp() {
        let dt = 0.1;
        let mut kf = constant_velocity(dt);

        for k in 1..=200 {
            let position = k as f64 * dt;
            kf.filter([0.0].into(), [position].into()).unwrap();
        }

        assert_in_delta!(kf.state()[0], 20.0, 0.05);
        assert_in_delta!(kf.state()[1], 1.0, 0.05);
    }

    #[test]
    fn test_covariance_stays_symmetric() {
        let mut kf = constant_velocity(0.5);
        for z in [0.3, 0.1, 0.9, 1.4, 1.2, 2.0, 2.6] {
            kf.filter([0.0].into(), [z].into()).unwrap();
            let p = kf.covariance();
            assert_lt!((p - p.transpose()).norm(), 1e-12);
            assert!(p[(0, 0)] >= 0.0 && p[(1, 1)] >= 0.0);
        }
    }

    #[test]
    fn test_singular_innovation_is_reported() {
        let mut kf = LinearKalmanFilter::<2, 1, 1>::new(
            Mat::<f64, 2, 2>::identity(),
            Mat::<f64, 2, 1>::zeros(),
            Mat::<SensorSpec, 2, 1>::new(SensorSpec::new(0.1), SensorSpec::new(0.1)),
            Mat::<f64, 1, 2>::zeros(),
            Mat1::new(SensorSpec::new(0.0)),
            Mat::<f64, 2, 1>::new(1.0, 2.0),
            Mat::<f64, 2, 2>::identity(),
        )
        .unwrap();

        assert_eq!(
            kf.filter([0.0].into(), [1.0].into()),
            Err(KalmanError::DegenerateInnovation {
                innovation_covariance: 0.0
            })
        );
        assert_eq!(kf.state(), Mat::<f64, 2, 1>::new(1.0, 2.0));
        assert_eq!(kf.covariance(), Mat::<f64, 2, 2>::identity());
    }

    #[test]
    fn test_non_finite_input_leaves_belief() {
        let mut kf = constant_velocity(0.1);
        kf.filter([0.0].into(), [0.2].into()).unwrap();
        let (x, p) = (kf.state(), kf.covariance());

        assert!(matches!(
            kf.filter([f64::NAN].into(), [0.3].into()),
            Err(KalmanError::NonFiniteInput { name: "control", .. })
        ));
        assert_eq!(kf.state(), x);
        assert_eq!(kf.covariance(), p);
    }

    #[test]
    fn test_tiny_well_conditioned_innovation_is_accepted() {
        let noise = SensorSpec::new(1e-5);
        let mut kf = LinearKalmanFilter::<3, 1, 3>::new(
            Mat::<f64, 3, 3>::identity(),
            Mat::<f64, 3, 1>::zeros(),
            Mat::<SensorSpec, 3, 1>::new(
                SensorSpec::new(0.0),
                SensorSpec::new(0.0),
                SensorSpec::new(0.0),
            ),
            Mat::<f64, 3, 3>::identity(),
            Mat::<SensorSpec, 3, 1>::new(noise, noise, noise),
            Mat::<f64, 3, 1>::zeros(),
            Mat::<f64, 3, 3>::identity() * 1e-5,
        )
        .unwrap();

        kf.filter([0.0].into(), [2e-3, 4e-3, 6e-3].into()).unwrap();

        assert_in_delta!(kf.state()[0], 1e-3, 1e-15);
        assert_in_delta!(kf.state()[1], 2e-3, 1e-15);
        assert_in_delta!(kf.state()[2], 3e-3, 1e-15);
        assert_in_delta!(kf.covariance()[(1, 1)], 5e-6, 1e-18);
    }

    #[test]
    fn test_rejects_asymmetric_initial_covariance() {
        let result = LinearKalmanFilter::<2, 1, 1>::new(
            Mat::<f64, 2, 2>::identity(),
            Mat::<f64, 2, 1>::zeros(),
            Mat::<SensorSpec, 2, 1>::new(SensorSpec::new(0.1), SensorSpec::new(0.1)),
            Mat::<f64, 1, 2>::new(1.0, 0.0),
            Mat1::new(SensorSpec::new(0.1)),
            Mat::<f64, 2, 1>::zeros(),
            Mat::<f64, 2, 2>::new(1.0, 0.5, 0.2, 1.0),
        );
        assert_eq!(
            result.err(),
            Some(KalmanError::AsymmetricCovariance { row: 0, col: 1 })
        );
    }

    #[test]
    fn test_rejects_negative_noise() {
        let result = LinearKalmanFilter::<1, 1, 1>::new(
            Mat1::new(1.0),
            Mat1::new(0.0),
            Mat1::new(SensorSpec::new(0.01)),
            Mat1::new(1.0),
            Mat1::new(SensorSpec::new(-1.0)),
            Mat1::new(0.0),
            Mat1::new(1.0),
        );
        assert_eq!(
            result.err(),
            Some(KalmanError::NegativeVariance {
                name: "sensor noise",
                value: -1.0
            })
        );
    }
}
