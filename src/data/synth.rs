//! Synthetic I-V measurement generation.
//!
//! Samples a model on a uniform voltage grid and perturbs each point with
//! seeded Gaussian noise whose standard deviation is
//! `noise_rel * |J| + noise_abs`.

use std::path::Path;

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{MeasurementSeries, ModelKind};
use crate::error::AppError;
use crate::math::linspace;
use crate::models::CurrentDensityModel;

#[derive(Debug, Clone)]
pub struct SynthSpec {
    pub model: ModelKind,
    pub params: Vec<f64>,
    pub v_min: f64,
    pub v_max: f64,
    pub points: usize,
    /// Noise proportional to `|J|`.
    pub noise_rel: f64,
    /// Noise floor, in current-density units.
    pub noise_abs: f64,
    pub seed: u64,
}

pub fn generate_series(spec: &SynthSpec) -> Result<MeasurementSeries, AppError> {
    if spec.params.len() != spec.model.arity() {
        return Err(AppError::new(
            2,
            format!(
                "{} takes {} parameters, got {}.",
                spec.model.display_name(),
                spec.model.arity(),
                spec.params.len()
            ),
        ));
    }
    if spec.params.iter().any(|p| !p.is_finite()) {
        return Err(AppError::new(2, "Model parameters must be finite."));
    }
    if spec.points < 2 {
        return Err(AppError::new(2, "Point count must be >= 2."));
    }
    if !(spec.v_min.is_finite() && spec.v_max.is_finite() && spec.v_max > spec.v_min) {
        return Err(AppError::new(2, "Invalid voltage range for synthetic data."));
    }
    let noise_ok = |x: f64| x.is_finite() && x >= 0.0;
    if !(noise_ok(spec.noise_rel) && noise_ok(spec.noise_abs)) {
        return Err(AppError::new(2, "Noise levels must be finite and >= 0."));
    }

    let mut rng = StdRng::seed_from_u64(spec.seed);
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;

    let voltage = linspace(spec.v_min, spec.v_max, spec.points);
    let current = spec
        .model
        .evaluate(&voltage, &spec.params)
        .into_iter()
        .map(|j| {
            let sigma = spec.noise_rel * j.abs() + spec.noise_abs;
            let z: f64 = normal.sample(&mut rng);
            j + sigma * z
        })
        .collect();

    log::debug!(
        "synth: {} points of {} with seed {}",
        spec.points,
        spec.model.display_name(),
        spec.seed
    );

    Ok(MeasurementSeries::new(voltage, current))
}

/// Write a measurement series as a `v,j` CSV.
pub fn write_series_csv(path: &Path, series: &MeasurementSeries) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create CSV '{}': {e}", path.display())))?;

    writer
        .write_record(["v", "j"])
        .map_err(|e| AppError::new(2, format!("Failed to write CSV header: {e}")))?;
    for (v, j) in series.voltage.iter().zip(&series.current) {
        writer
            .write_record([v.to_string(), j.to_string()])
            .map_err(|e| AppError::new(2, format!("Failed to write CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush CSV: {e}")))?;

    Ok(())
}
