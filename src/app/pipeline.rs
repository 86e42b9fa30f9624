//! Shared fit pipeline used by the `fit` and `compare` commands.
//!
//! CSV ingest -> fit (or compare) -> residuals
//!
//! The commands then only differ in presentation.

use crate::domain::{FitConfig, IvResidual, KindFit, ModelKind};
use crate::error::AppError;
use crate::fit::{Comparison, FitOptions, RankPolicy};
use crate::io::{ColumnSelection, IngestedSeries};

/// All computed outputs of a single `jfit fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub ingest: IngestedSeries,
    pub fit: KindFit,
    pub residuals: Vec<IvResidual>,
}

/// All computed outputs of a single `jfit compare` run.
#[derive(Debug, Clone)]
pub struct CompareOutput {
    pub ingest: IngestedSeries,
    pub comparison: Comparison,
    /// Residuals of the chosen model.
    pub residuals: Vec<IvResidual>,
}

/// Solver options implied by a run configuration.
pub fn fit_options(config: &FitConfig) -> FitOptions {
    FitOptions {
        max_evaluations: config.max_evaluations,
        rank_policy: if config.strict_covariance {
            RankPolicy::Strict
        } else {
            RankPolicy::PseudoInverse
        },
        ..FitOptions::default()
    }
}

/// Execute the single-model pipeline and return the computed outputs.
pub fn run_fit(config: &FitConfig) -> Result<RunOutput, AppError> {
    let ingest = load(config)?;
    let series = &ingest.series;

    let result = crate::fit::fit_kind(
        &series.voltage,
        &series.current,
        config.model,
        config.initial_guess.as_deref(),
        &fit_options(config),
    )?;
    log::debug!(
        "fit: {} converged in {} evaluations ({})",
        config.model.display_name(),
        result.evaluations,
        result.termination
    );

    let residuals = crate::report::compute_residuals(series, &config.model, &result.params)?;
    let fit = KindFit {
        kind: config.model,
        result,
    };

    Ok(RunOutput {
        ingest,
        fit,
        residuals,
    })
}

/// Execute the comparison pipeline over `kinds` (all variants if empty).
pub fn run_compare(config: &FitConfig, kinds: &[ModelKind]) -> Result<CompareOutput, AppError> {
    let ingest = load(config)?;
    let comparison = crate::fit::compare_models(&ingest.series, kinds, &fit_options(config))?;
    let best = &comparison.best;
    let residuals = crate::report::compute_residuals(&ingest.series, &best.kind, &best.result.params)?;

    Ok(CompareOutput {
        ingest,
        comparison,
        residuals,
    })
}

fn load(config: &FitConfig) -> Result<IngestedSeries, AppError> {
    let columns = ColumnSelection {
        voltage: config.voltage_column.clone(),
        current: config.current_column.clone(),
    };
    crate::io::load_measurements(&config.csv_path, &columns)
}
