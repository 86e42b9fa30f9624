//! Nonlinear least-squares fitting of a current-density model.
//!
//! Given:
//! - voltages `V_i`
//! - observed current densities `J_i`
//! - a model `J(V; p)` and a starting point `p0`
//!
//! we minimize `Σ (J_i - J(V_i; p))²` with Levenberg–Marquardt and estimate
//! the parameter covariance from the Jacobian at the solution.
//!
//! Shape and data checks run before the optimizer. Optimizer failures are
//! surfaced as-is; picking another starting point is the caller's job.

use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt, TerminationReason};
use nalgebra::DMatrix;

use crate::domain::{FitQuality, FitResult, ModelKind};
use crate::fit::error::FitError;
use crate::fit::problem::CurrentFitProblem;
use crate::math::{inverse_normal_matrix, scaled_covariance};
use crate::models::CurrentDensityModel;

/// Lower bound on the residual-evaluation budget.
pub const MIN_MAX_EVALUATIONS: usize = 20_000;

/// How to treat a Jacobian that is rank-deficient but not zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankPolicy {
    /// Drop negligible singular values and report a pseudo-inverse covariance.
    PseudoInverse,
    /// Fail with `FitError::SingularJacobian`.
    Strict,
}

/// Solver options.
#[derive(Debug, Clone)]
pub struct FitOptions {
    /// Residual-evaluation budget. Values below `MIN_MAX_EVALUATIONS` are raised to it.
    pub max_evaluations: usize,
    /// Relative reduction tolerance on the sum of squares.
    pub ftol: f64,
    /// Relative step tolerance on the parameters.
    pub xtol: f64,
    /// Orthogonality tolerance between residuals and Jacobian columns.
    pub gtol: f64,
    pub rank_policy: RankPolicy,
}

impl Default for FitOptions {
    fn default() -> Self {
        // Same ftol/xtol as MINPACK's lmder driver defaults.
        let tol = f64::EPSILON.sqrt();
        Self {
            max_evaluations: MIN_MAX_EVALUATIONS,
            ftol: tol,
            xtol: tol,
            gtol: 0.0,
            rank_policy: RankPolicy::PseudoInverse,
        }
    }
}

impl FitOptions {
    fn effective_max_evaluations(&self) -> usize {
        self.max_evaluations.max(MIN_MAX_EVALUATIONS)
    }
}

/// Fit `model` to `(voltage, current)` from `initial_guess` with default options.
pub fn fit_model<M>(
    voltage: &[f64],
    current: &[f64],
    model: &M,
    initial_guess: &[f64],
) -> Result<FitResult, FitError>
where
    M: CurrentDensityModel + ?Sized,
{
    fit_model_with(voltage, current, model, initial_guess, &FitOptions::default())
}

/// Fit the Simmons model from `(barrier_height, barrier_thickness) = (1 eV, 1 nm)`.
pub fn fit_simmons(voltage: &[f64], current: &[f64]) -> Result<FitResult, FitError> {
    let kind = ModelKind::Simmons;
    fit_model(voltage, current, &kind, &kind.default_guess())
}

/// Fit the BDR model from `(avg_barrier_height, barrier_thickness, asymmetry) = (1 eV, 1 nm, 0 eV)`.
pub fn fit_bdr(voltage: &[f64], current: &[f64]) -> Result<FitResult, FitError> {
    let kind = ModelKind::Bdr;
    fit_model(voltage, current, &kind, &kind.default_guess())
}

/// Fit one named variant, using `initial_guess` or the variant's default.
pub fn fit_kind(
    voltage: &[f64],
    current: &[f64],
    kind: ModelKind,
    initial_guess: Option<&[f64]>,
    opts: &FitOptions,
) -> Result<FitResult, FitError> {
    match initial_guess {
        Some(guess) => fit_model_with(voltage, current, &kind, guess, opts),
        None => fit_model_with(voltage, current, &kind, &kind.default_guess(), opts),
    }
}

/// Fit `model` to `(voltage, current)` from `initial_guess`.
pub fn fit_model_with<M>(
    voltage: &[f64],
    current: &[f64],
    model: &M,
    initial_guess: &[f64],
    opts: &FitOptions,
) -> Result<FitResult, FitError>
where
    M: CurrentDensityModel + ?Sized,
{
    validate_inputs(voltage, current, model, initial_guess)?;

    let n = voltage.len();
    let k = model.arity();

    // The solver counts its budget in "patience" units of (k + 1) evaluations.
    let patience = opts.effective_max_evaluations().div_ceil(k + 1);
    let solver = LevenbergMarquardt::new()
        .with_ftol(opts.ftol)
        .with_xtol(opts.xtol)
        .with_gtol(opts.gtol)
        .with_patience(patience);

    let problem = CurrentFitProblem::new(model, voltage, current, initial_guess);
    let (problem, report) = solver.minimize(problem);

    log::debug!(
        "{}: {:?} after {} evaluations (objective {:.6e})",
        model.name(),
        report.termination,
        report.number_of_evaluations,
        report.objective_function
    );

    if !report.termination.was_successful() {
        return Err(FitError::NotConverged {
            reason: describe_termination(&report.termination),
            evaluations: report.number_of_evaluations,
        });
    }

    let params: Vec<f64> = problem.params().iter().copied().collect();
    if params.iter().any(|p| !p.is_finite()) {
        return Err(FitError::NotConverged {
            reason: "optimizer returned non-finite parameters".to_string(),
            evaluations: report.number_of_evaluations,
        });
    }

    let predicted = model.evaluate(voltage, &params);
    let sse: f64 = predicted
        .iter()
        .zip(current)
        .map(|(p, obs)| (obs - p) * (obs - p))
        .sum();
    if !sse.is_finite() {
        return Err(FitError::NotConverged {
            reason: "non-finite residuals at the solution".to_string(),
            evaluations: report.number_of_evaluations,
        });
    }

    let jac = model.jacobian(voltage, &params);
    let Some(inverse) = inverse_normal_matrix(&jac) else {
        return Err(FitError::SingularJacobian {
            rank: 0,
            parameters: k,
        });
    };
    if inverse.rank < k {
        match opts.rank_policy {
            RankPolicy::Strict => {
                return Err(FitError::SingularJacobian {
                    rank: inverse.rank,
                    parameters: k,
                });
            }
            RankPolicy::PseudoInverse => log::warn!(
                "{}: Jacobian has rank {} of {}; parameters are not separately identifiable, \
                 covariance uses a pseudo-inverse",
                model.name(),
                inverse.rank,
                k
            ),
        }
    }

    let covariance = if n > k {
        scaled_covariance(&inverse.matrix, sse / (n - k) as f64)
    } else {
        log::warn!(
            "{}: {} points for {} parameters leaves no residual degrees of freedom; covariance is infinite",
            model.name(),
            n,
            k
        );
        DMatrix::from_element(k, k, f64::INFINITY)
    };

    let clamped_samples = model.clamped_samples(voltage, &params);
    if clamped_samples > 0 {
        log::warn!(
            "{}: {} of {} samples sit on a clamped (non-positive) effective barrier at the solution",
            model.name(),
            clamped_samples,
            n
        );
    }

    Ok(FitResult {
        params,
        covariance,
        quality: FitQuality {
            sse,
            rmse: (sse / n as f64).sqrt(),
            bic: bic(sse, n, k),
            n,
        },
        jacobian_rank: inverse.rank,
        evaluations: report.number_of_evaluations,
        termination: format!("{:?}", report.termination),
        clamped_samples,
    })
}

/// Bayesian information criterion, `n ln(SSE/n) + k ln(n)`.
///
/// A perfect fit (`SSE = 0`) is floored at the smallest positive `f64`.
pub fn bic(sse: f64, n: usize, k: usize) -> f64 {
    let n_f = n.max(1) as f64;
    let mse = (sse / n_f).max(f64::MIN_POSITIVE);
    n_f * mse.ln() + k as f64 * n_f.ln()
}

fn validate_inputs<M>(voltage: &[f64], current: &[f64], model: &M, initial_guess: &[f64]) -> Result<(), FitError>
where
    M: CurrentDensityModel + ?Sized,
{
    if voltage.len() != current.len() {
        return Err(FitError::LengthMismatch {
            voltage: voltage.len(),
            current: current.len(),
        });
    }
    if initial_guess.len() != model.arity() {
        return Err(FitError::ArityMismatch {
            model: model.name().to_string(),
            expected: model.arity(),
            actual: initial_guess.len(),
        });
    }
    if voltage.len() < model.arity() {
        return Err(FitError::InsufficientData {
            points: voltage.len(),
            parameters: model.arity(),
        });
    }

    for (field, values) in [("voltage", voltage), ("current", current), ("initial guess", initial_guess)] {
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(FitError::NonFinite { field, index });
        }
    }

    Ok(())
}

fn describe_termination(reason: &TerminationReason) -> String {
    match reason {
        TerminationReason::LostPatience => "evaluation budget exhausted".to_string(),
        TerminationReason::Numerical(what) => format!("numerical breakdown in {what}"),
        TerminationReason::User(what) => format!("model evaluation failed ({what})"),
        TerminationReason::NoImprovementPossible(what) => {
            format!("no further improvement possible ({what} tolerance too small)")
        }
        TerminationReason::WrongDimensions(what) => format!("model output has the wrong shape ({what})"),
        TerminationReason::NoParameters => "model has no free parameters".to_string(),
        other => format!("{other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::FitErrorKind;
    use crate::math::linspace;
    use crate::models::{bdr_current_density, simmons_current_density, FnModel};

    fn rel_err(a: f64, b: f64) -> f64 {
        ((a - b) / b).abs()
    }

    #[test]
    fn simmons_round_trip_from_perturbed_start() {
        let v = linspace(-1.0, 1.0, 41);
        let j = simmons_current_density(&v, 1.0, 1.0);

        let fit = fit_model(&v, &j, &ModelKind::Simmons, &[1.05, 0.95]).unwrap();
        assert!(rel_err(fit.params[0], 1.0) < 1e-3, "{:?}", fit.params);
        assert!(rel_err(fit.params[1], 1.0) < 1e-3, "{:?}", fit.params);
        assert_eq!(fit.jacobian_rank, 2);
        assert_eq!(fit.covariance.shape(), (2, 2));
        assert_eq!(fit.covariance[(0, 1)], fit.covariance[(1, 0)]);
        assert!(fit.covariance.iter().all(|c| c.is_finite()));
        assert_eq!(fit.clamped_samples, 0);
    }

    #[test]
    fn simmons_round_trip_with_other_parameters() {
        let v = linspace(-1.5, 1.5, 61);
        let j = simmons_current_density(&v, 1.8, 0.6);

        let fit = fit_model(&v, &j, &ModelKind::Simmons, &[1.75, 0.62]).unwrap();
        assert!(rel_err(fit.params[0], 1.8) < 1e-3);
        assert!(rel_err(fit.params[1], 0.6) < 1e-3);
    }

    #[test]
    fn bdr_round_trip_recovers_identifiable_combinations() {
        // (s, phi, dphi) only enter through s²·phi and s²·dphi.
        let v = linspace(-1.0, 1.0, 41);
        let (h, s, a) = (1.0, 1.0, 0.2);
        let j = bdr_current_density(&v, h, s, a);

        let fit = fit_model(&v, &j, &ModelKind::Bdr, &[1.05, 0.95, 0.22]).unwrap();
        let (fh, fs, fa) = (fit.params[0], fit.params[1], fit.params[2]);
        assert!(rel_err(fs * fs * fh, s * s * h) < 1e-3, "{:?}", fit.params);
        assert!(rel_err(fs * fs * fa, s * s * a) < 1e-3, "{:?}", fit.params);
        assert!(fit.jacobian_rank < 3);
        assert!(fit.covariance.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn bdr_strict_policy_reports_singular_jacobian() {
        let v = linspace(-1.0, 1.0, 41);
        let j = bdr_current_density(&v, 1.0, 1.0, 0.2);
        let opts = FitOptions {
            rank_policy: RankPolicy::Strict,
            ..FitOptions::default()
        };

        let err = fit_model_with(&v, &j, &ModelKind::Bdr, &[1.05, 0.95, 0.22], &opts).unwrap_err();
        assert!(matches!(err, FitError::SingularJacobian { parameters: 3, .. }), "{err}");
        assert_eq!(err.kind(), FitErrorKind::Convergence);
    }

    #[test]
    fn zero_information_jacobian_is_a_convergence_error() {
        // Every sample at zero bias: J ≡ 0 and ∂J/∂p ≡ 0.
        let v = [0.0, 0.0, 0.0];
        let j = [0.0, 0.0, 0.0];
        let err = fit_simmons(&v, &j).unwrap_err();
        assert_eq!(err, FitError::SingularJacobian { rank: 0, parameters: 2 });
    }

    #[test]
    fn length_mismatch_is_a_dimension_error() {
        let err = fit_simmons(&[0.1, 0.2, 0.3], &[1.0, 2.0]).unwrap_err();
        assert_eq!(err, FitError::LengthMismatch { voltage: 3, current: 2 });
        assert_eq!(err.kind(), FitErrorKind::Dimension);
    }

    #[test]
    fn guess_arity_mismatch_is_a_dimension_error() {
        let v = [0.1, 0.2, 0.3, 0.4];
        let j = simmons_current_density(&v, 1.0, 1.0);
        let err = fit_model(&v, &j, &ModelKind::Simmons, &[1.0, 1.0, 0.0]).unwrap_err();
        assert_eq!(err.kind(), FitErrorKind::Dimension);
        assert!(matches!(err, FitError::ArityMismatch { expected: 2, actual: 3, .. }));
    }

    #[test]
    fn too_few_points_is_a_data_error() {
        let err = fit_bdr(&[0.1, 0.2], &[1.0, 2.0]).unwrap_err();
        assert_eq!(err, FitError::InsufficientData { points: 2, parameters: 3 });
        assert_eq!(err.kind(), FitErrorKind::Data);

        let err = fit_simmons(&[], &[]).unwrap_err();
        assert_eq!(err.kind(), FitErrorKind::Data);
    }

    #[test]
    fn non_finite_samples_are_a_data_error() {
        let err = fit_simmons(&[0.1, f64::NAN, 0.3], &[1.0, 2.0, 3.0]).unwrap_err();
        assert_eq!(err, FitError::NonFinite { field: "voltage", index: 1 });
        let err = fit_simmons(&[0.1, 0.2, 0.3], &[1.0, 2.0, f64::INFINITY]).unwrap_err();
        assert_eq!(err, FitError::NonFinite { field: "current", index: 2 });
    }

    #[test]
    fn exactly_determined_fit_has_infinite_covariance() {
        let v = [-0.5, 0.5];
        let j = simmons_current_density(&v, 1.0, 1.0);
        let fit = fit_model(&v, &j, &ModelKind::Simmons, &[1.02, 0.98]).unwrap();
        assert!(fit.covariance.iter().all(|c| c.is_infinite()));
    }

    #[test]
    fn wrappers_are_deterministic() {
        let v = linspace(-1.0, 1.0, 31);
        let j_s = simmons_current_density(&v, 1.2, 0.9);
        let j_b = bdr_current_density(&v, 1.1, 0.9, 0.15);

        let a = fit_simmons(&v, &j_s).unwrap();
        let b = fit_simmons(&v, &j_s).unwrap();
        assert_eq!(a, b);

        let a = fit_bdr(&v, &j_b).unwrap();
        let b = fit_bdr(&v, &j_b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn wrappers_match_explicit_default_guess() {
        let v = linspace(-1.0, 1.0, 31);
        let j = simmons_current_density(&v, 1.2, 0.9);
        let wrapped = fit_simmons(&v, &j).unwrap();
        let explicit = fit_model(&v, &j, &ModelKind::Simmons, &[1.0, 1.0]).unwrap();
        assert_eq!(wrapped, explicit);

        let j = bdr_current_density(&v, 1.1, 0.9, 0.15);
        let wrapped = fit_bdr(&v, &j).unwrap();
        let explicit = fit_model(&v, &j, &ModelKind::Bdr, &[1.0, 1.0, 0.0]).unwrap();
        assert_eq!(wrapped, explicit);
    }

    #[test]
    fn rank_deficient_simmons_design_uses_pseudo_inverse_by_default() {
        // A single bias point cannot separate barrier height from thickness.
        let v = [0.5, 0.5, 0.5, 0.5];
        let j = [80.0, 81.0, 79.0, 80.5];

        let fit = fit_simmons(&v, &j).unwrap();
        assert_eq!(fit.jacobian_rank, 1);
        assert!(fit.params.iter().all(|p| p.is_finite()));
        assert!(fit.covariance.iter().all(|c| c.is_finite()));

        let opts = FitOptions {
            rank_policy: RankPolicy::Strict,
            ..FitOptions::default()
        };
        let err = fit_model_with(&v, &j, &ModelKind::Simmons, &[1.0, 1.0], &opts).unwrap_err();
        assert_eq!(err, FitError::SingularJacobian { rank: 1, parameters: 2 });
        assert_eq!(err.kind(), FitErrorKind::Convergence);
    }

    #[test]
    fn termination_reasons_read_as_plain_text() {
        assert_eq!(
            describe_termination(&TerminationReason::LostPatience),
            "evaluation budget exhausted"
        );
        assert_eq!(
            describe_termination(&TerminationReason::Numerical("jacobian")),
            "numerical breakdown in jacobian"
        );
        assert_eq!(
            describe_termination(&TerminationReason::User("residuals")),
            "model evaluation failed (residuals)"
        );
        assert_eq!(
            describe_termination(&TerminationReason::NoParameters),
            "model has no free parameters"
        );
        assert_eq!(
            describe_termination(&TerminationReason::NoImprovementPossible("gtol")),
            "no further improvement possible (gtol tolerance too small)"
        );
        assert_eq!(
            describe_termination(&TerminationReason::WrongDimensions("jacobian")),
            "model output has the wrong shape (jacobian)"
        );
    }

    #[test]
    fn failing_model_evaluation_is_a_convergence_error() {
        // Returns one value short, so the solver cannot form residuals.
        let broken = FnModel::new("short", 2, |v: &[f64], p: &[f64]| {
            let mut j = simmons_current_density(v, p[0], p[1]);
            j.pop();
            j
        });
        let v = linspace(-1.0, 1.0, 11);
        let j = simmons_current_density(&v, 1.0, 1.0);

        let err = fit_model(&v, &j, &broken, &[1.0, 1.0]).unwrap_err();
        assert_eq!(err.kind(), FitErrorKind::Convergence);
        match err {
            FitError::NotConverged { reason, .. } => {
                assert_eq!(reason, "model evaluation failed (residuals)");
            }
            other => panic!("expected NotConverged, got {other:?}"),
        }
    }

    #[test]
    fn model_mismatch_converges_with_larger_residuals() {
        let v = linspace(-1.0, 1.0, 41);
        let j = bdr_current_density(&v, 1.0, 1.0, 0.2);

        let wrong = fit_simmons(&v, &j).unwrap();
        assert!(wrong.params.iter().all(|p| p.is_finite()));
        assert!(wrong.covariance.iter().all(|c| c.is_finite()));

        let right = fit_bdr(&v, &j).unwrap();
        assert!(wrong.quality.sse > right.quality.sse);
        assert!(right.quality.rmse < 1e-3);
    }

    #[test]
    fn fit_does_not_mutate_inputs() {
        let v = linspace(-1.0, 1.0, 11);
        let j = simmons_current_density(&v, 1.0, 1.0);
        let (v0, j0) = (v.clone(), j.clone());
        let guess = [1.1, 0.9];
        let _ = fit_model(&v, &j, &ModelKind::Simmons, &guess).unwrap();
        assert_eq!(v, v0);
        assert_eq!(j, j0);
        assert_eq!(guess, [1.1, 0.9]);
    }

    #[test]
    fn closure_model_fits_through_finite_differences() {
        let model = FnModel::new("simmons-fd", 2, |v: &[f64], p: &[f64]| {
            simmons_current_density(v, p[0], p[1])
        });
        let v = linspace(-1.0, 1.0, 41);
        let j = simmons_current_density(&v, 1.0, 1.0);

        let fit = fit_model(&v, &j, &model, &[1.05, 0.95]).unwrap();
        assert!(rel_err(fit.params[0], 1.0) < 1e-3);
        assert!(rel_err(fit.params[1], 1.0) < 1e-3);
    }

    #[test]
    fn clamped_samples_are_counted() {
        // Barrier height 0.4 eV closes the barrier for v >= 0.8; no sample sits on the edge.
        let v = linspace(-1.0, 1.0, 20);
        let j = simmons_current_density(&v, 0.4, 1.0);
        let fit = fit_model(&v, &j, &ModelKind::Simmons, &[0.41, 0.99]).unwrap();
        assert!(fit.clamped_samples > 0);
        assert!(rel_err(fit.params[1], 1.0) < 1e-3);
    }

    #[test]
    fn bic_penalizes_parameters() {
        assert!(bic(1.0, 10, 3) > bic(1.0, 10, 2));
        assert!(bic(0.0, 10, 2).is_finite());
    }
}
