//! Model comparison (Simmons vs BDR) using BIC.
//!
//! Each requested variant is fitted from its default guess and scored with
//! `BIC = n ln(SSE/n) + k ln(n)`.
//!
//! Selection rules:
//! 1. Skip variants with no residual degrees of freedom (`n <= k`)
//! 2. Choose the variant with minimum BIC
//! 3. If ΔBIC < 2 between the best and a simpler variant, pick the simpler one

use rayon::prelude::*;

use crate::domain::{KindFit, MeasurementSeries, ModelKind};
use crate::fit::error::FitError;
use crate::fit::fitter::{fit_kind, FitOptions};

/// Output of fitting + selection.
#[derive(Debug, Clone)]
pub struct Comparison {
    pub best: KindFit,
    /// Successful fits, in request order.
    pub fits: Vec<KindFit>,
    /// Variants that were skipped or failed, and why.
    pub skipped: Vec<(ModelKind, String)>,
}

/// Fit every variant in `kinds` (all variants if empty) and select the best.
///
/// Fits run in parallel; each owns nothing but its own result. Fails with the
/// first variant's error when no variant produced a fit.
pub fn compare_models(
    series: &MeasurementSeries,
    kinds: &[ModelKind],
    opts: &FitOptions,
) -> Result<Comparison, FitError> {
    let kinds: &[ModelKind] = if kinds.is_empty() { &ModelKind::ALL } else { kinds };
    let n = series.len();

    let outcomes: Vec<(ModelKind, Result<_, FitError>)> = kinds
        .par_iter()
        .map(|&kind| {
            let k = kind.arity();
            let outcome = if n <= k {
                Err(FitError::InsufficientData {
                    points: n,
                    parameters: k,
                })
            } else {
                fit_kind(&series.voltage, &series.current, kind, None, opts)
            };
            (kind, outcome)
        })
        .collect();

    let mut fits = Vec::new();
    let mut skipped = Vec::new();
    let mut first_error = None;

    for (kind, outcome) in outcomes {
        match outcome {
            Ok(result) => fits.push(KindFit { kind, result }),
            Err(err) => {
                log::debug!("compare: {} skipped: {err}", kind.display_name());
                skipped.push((kind, err.to_string()));
                first_error.get_or_insert(err);
            }
        }
    }

    if fits.is_empty() {
        return Err(first_error.unwrap_or(FitError::InsufficientData {
            points: n,
            parameters: 1,
        }));
    }

    let best = select_by_bic(&fits);
    Ok(Comparison { best, fits, skipped })
}

fn select_by_bic(fits: &[KindFit]) -> KindFit {
    let mut best = &fits[0];
    for f in &fits[1..] {
        if f.result.quality.bic < best.result.quality.bic {
            best = f;
        }
    }
    let best_bic = best.result.quality.bic;

    // Walk variants from simplest to most complex and take the first that is
    // within 2 BIC points of the best.
    let mut by_arity: Vec<&KindFit> = fits.iter().collect();
    by_arity.sort_by_key(|f| f.kind.arity());
    for f in by_arity {
        if f.result.quality.bic < best_bic + 2.0 {
            return f.clone();
        }
    }

    best.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::linspace;
    use crate::models::{bdr_current_density, simmons_current_density};

    fn noisy(values: Vec<f64>) -> Vec<f64> {
        // Deterministic ±0.5% ripple.
        values
            .into_iter()
            .enumerate()
            .map(|(i, j)| j * (1.0 + if i % 2 == 0 { 0.005 } else { -0.005 }))
            .collect()
    }

    #[test]
    fn prefers_bdr_for_asymmetric_data() {
        let v = linspace(-1.0, 1.0, 41);
        let j = noisy(bdr_current_density(&v, 1.0, 1.0, 0.2));
        let series = MeasurementSeries::new(v, j);

        let cmp = compare_models(&series, &[], &FitOptions::default()).unwrap();
        assert!(cmp.fits.iter().any(|f| f.kind == ModelKind::Bdr));
        assert_eq!(cmp.best.kind, ModelKind::Bdr);
    }

    #[test]
    fn prefers_simpler_model_when_both_fit() {
        // Simmons(h, s) is BDR(h, s, -1/2); the extra parameter buys nothing.
        let v = linspace(-1.0, 1.0, 41);
        let j = noisy(simmons_current_density(&v, 1.0, 1.0));
        let series = MeasurementSeries::new(v, j);

        let cmp = compare_models(&series, &ModelKind::ALL, &FitOptions::default()).unwrap();
        assert_eq!(cmp.best.kind, ModelKind::Simmons);
    }

    #[test]
    fn skips_variants_without_degrees_of_freedom() {
        let v = vec![-1.0, 0.0, 1.0];
        let j = simmons_current_density(&v, 1.0, 1.0);
        let series = MeasurementSeries::new(v, j);

        let cmp = compare_models(&series, &[], &FitOptions::default()).unwrap();
        assert_eq!(cmp.fits.len(), 1);
        assert_eq!(cmp.best.kind, ModelKind::Simmons);
        assert_eq!(cmp.skipped.len(), 1);
        assert_eq!(cmp.skipped[0].0, ModelKind::Bdr);
    }

    #[test]
    fn fails_when_nothing_fits() {
        let series = MeasurementSeries::new(vec![0.5], vec![1.0]);
        let err = compare_models(&series, &[], &FitOptions::default()).unwrap_err();
        assert!(matches!(err, FitError::InsufficientData { .. }));
    }
}
