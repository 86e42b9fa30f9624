//! Reporting utilities: residuals and formatted terminal output.

mod format;

pub use format::*;

use crate::domain::{IvResidual, MeasurementSeries};
use crate::error::AppError;
use crate::models::CurrentDensityModel;

/// Fitted value and residual (`observed - fitted`) for each sample.
pub fn compute_residuals<M>(
    series: &MeasurementSeries,
    model: &M,
    params: &[f64],
) -> Result<Vec<IvResidual>, AppError>
where
    M: CurrentDensityModel + ?Sized,
{
    let fitted = model.evaluate(&series.voltage, params);
    let mut out = Vec::with_capacity(series.len());
    for ((&voltage, &current), fitted) in series.voltage.iter().zip(&series.current).zip(fitted) {
        if !fitted.is_finite() {
            return Err(AppError::new(
                4,
                format!("Non-finite model prediction at V={voltage} during residual computation."),
            ));
        }
        out.push(IvResidual {
            voltage,
            current,
            fitted,
            residual: current - fitted,
        });
    }
    Ok(out)
}
