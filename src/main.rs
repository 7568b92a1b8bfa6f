use linear_kalman::{
    FilterConfig, KalmanResult, ScalarKalmanFilter,
    engine::{Measure, Step, plant::DiscretePlant, sensor::SensorSpec},
};
use log::{error, info};

const TRUE_VALUE: f64 = -0.37727;
const SENSOR_NOISE: SensorSpec = SensorSpec::new(0.1 * 0.1);
const ITERATIONS: usize = 50;
const SEED: u64 = 0x5eed;

fn run() -> KalmanResult<()> {
    let mut plant = DiscretePlant::constant(TRUE_VALUE, SENSOR_NOISE, SEED)?;

    let mut config = FilterConfig::default();
    config.model.process_noise_covariance = 1e-5;
    config.model.measurement_noise_covariance = SENSOR_NOISE.variance();
    let mut kf = ScalarKalmanFilter::from_config(&config)?;

    for i in 0..ITERATIONS {
        plant.step(0.0);
        let z = plant.measure();
        kf.step(0.0, z)?;
        info!(
            "{:>3}: measured {:+.5}, estimate {:+.5} (p = {:.2e}), truth {:+.5}",
            i,
            z,
            kf.state_estimate(),
            kf.estimate_covariance(),
            plant.state()
        );
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        error!("{}", e);
        std::process::exit(1);
    }
}
