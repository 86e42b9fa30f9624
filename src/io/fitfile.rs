//! Read/write fit JSON files.
//!
//! A fit file is the portable representation of one fit:
//! - model variant + named parameters with standard errors
//! - covariance and fit quality
//! - a precomputed fitted grid for quick plotting
//!
//! The schema is defined by `domain::FitFile`.

use std::fs::File;
use std::path::Path;

use chrono::Utc;

use crate::domain::{CurveGrid, FitFile, FittedParameter, KindFit, MeasurementSeries};
use crate::error::AppError;
use crate::math::linspace;
use crate::models::CurrentDensityModel;

const GRID_POINTS: usize = 101;

/// Assemble the JSON record for a finished fit.
pub fn build_fit_file(fit: &KindFit, series: &MeasurementSeries, source: Option<&Path>) -> FitFile {
    let result = &fit.result;
    let std_errors = result.std_errors();

    let parameters = fit
        .kind
        .parameters()
        .iter()
        .zip(result.params.iter().zip(std_errors))
        .map(|(spec, (&value, std_error))| FittedParameter {
            name: spec.name.to_string(),
            unit: spec.unit.to_string(),
            value,
            std_error: std_error.is_finite().then_some(std_error),
        })
        .collect();

    let covariance: Option<Vec<Vec<f64>>> = result.covariance.iter().all(|c| c.is_finite()).then(|| {
        result
            .covariance
            .row_iter()
            .map(|row| row.iter().copied().collect())
            .collect()
    });

    let (v0, v1) = series.voltage_range().unwrap_or_else(|| {
        let v = series.voltage.first().copied().filter(|v| v.is_finite()).unwrap_or(0.0);
        (v - 1.0, v + 1.0)
    });
    let voltage = linspace(v0, v1, GRID_POINTS);
    let current = fit.kind.evaluate(&voltage, &result.params);

    FitFile {
        tool: "jfit".to_string(),
        created: Utc::now(),
        source: source.map(|p| p.display().to_string()),
        model: fit.kind,
        parameters,
        covariance,
        jacobian_rank: result.jacobian_rank,
        quality: result.quality.clone(),
        grid: CurveGrid { voltage, current },
    }
}

/// Write a fit JSON file.
pub fn write_fit_json(path: &Path, fit_file: &FitFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create fit JSON '{}': {e}", path.display())))?;

    serde_json::to_writer_pretty(file, fit_file)
        .map_err(|e| AppError::new(2, format!("Failed to write fit JSON: {e}")))?;

    Ok(())
}

/// Read a fit JSON file.
pub fn read_fit_json(path: &Path) -> Result<FitFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open fit JSON '{}': {e}", path.display())))?;
    let fit: FitFile =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid fit JSON: {e}")))?;
    Ok(fit)
}
