//! Formatted terminal output.
//!
//! We keep formatting code in one place so the fitting code stays free of
//! presentation concerns.

use crate::domain::{FitConfig, KindFit};
use crate::fit::Comparison;
use crate::io::IngestedSeries;

/// Row errors listed individually before collapsing into a count.
const MAX_LISTED_ROW_ERRORS: usize = 5;

/// Format the full run summary (dataset stats + fit diagnostics).
pub fn format_fit_summary(ingest: &IngestedSeries, fit: &KindFit, config: &FitConfig) -> String {
    let mut out = String::new();

    out.push_str("=== jfit - Tunneling Junction I-V Fit ===\n");
    out.push_str(&format!("Source: {}\n", config.csv_path.display()));
    out.push_str(&format_dataset(ingest));
    out.push('\n');
    out.push_str(&format_fit(fit));

    out
}

/// Dataset summary lines, including skipped rows.
pub fn format_dataset(ingest: &IngestedSeries) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "Columns: V=`{}` J=`{}`\n",
        ingest.voltage_column, ingest.current_column
    ));
    match ingest.series.voltage_range() {
        Some((lo, hi)) => out.push_str(&format!(
            "Points: n={} of {} rows | V=[{lo:.3}, {hi:.3}]\n",
            ingest.series.len(),
            ingest.rows_read
        )),
        None => out.push_str(&format!(
            "Points: n={} of {} rows\n",
            ingest.series.len(),
            ingest.rows_read
        )),
    }

    for e in ingest.row_errors.iter().take(MAX_LISTED_ROW_ERRORS) {
        out.push_str(&format!("  skipped line {}: {}\n", e.line, e.message));
    }
    if ingest.row_errors.len() > MAX_LISTED_ROW_ERRORS {
        out.push_str(&format!(
            "  ... and {} more skipped rows\n",
            ingest.row_errors.len() - MAX_LISTED_ROW_ERRORS
        ));
    }

    out
}

/// Parameters with uncertainties plus fit diagnostics for one variant.
pub fn format_fit(fit: &KindFit) -> String {
    let result = &fit.result;
    let mut out = String::new();

    out.push_str(&format!("Model: {}\n", fit.kind.display_name()));
    for ((spec, value), err) in fit
        .kind
        .parameters()
        .iter()
        .zip(&result.params)
        .zip(result.std_errors())
    {
        out.push_str(&format!(
            "- {:<20} {:>5} = {:>12.6} ± {} {}\n",
            spec.name,
            spec.symbol,
            value,
            fmt_err(err),
            spec.unit
        ));
    }

    out.push_str(&format!(
        "Quality: SSE={:.4e} RMSE={:.4e} BIC={:.3} (n={})\n",
        result.quality.sse, result.quality.rmse, result.quality.bic, result.quality.n
    ));
    out.push_str(&format!(
        "Solver: {} after {} evaluations | Jacobian rank {}/{}\n",
        result.termination,
        result.evaluations,
        result.jacobian_rank,
        result.params.len()
    ));
    if result.jacobian_rank < result.params.len() {
        out.push_str("Note: parameters are not separately identifiable; covariance is a pseudo-inverse.\n");
    }
    if result.clamped_samples > 0 {
        out.push_str(&format!(
            "Note: effective barrier clamped to zero at {} samples.\n",
            result.clamped_samples
        ));
    }

    out.push_str("Covariance:\n");
    for row in result.covariance.row_iter() {
        let cells: Vec<String> = row.iter().map(|c| format!("{c:>12.4e}")).collect();
        out.push_str(&format!("  [{}]\n", cells.join(" ")));
    }

    out
}

/// Format a BIC comparison table.
pub fn format_comparison(ingest: &IngestedSeries, cmp: &Comparison) -> String {
    let mut out = String::new();

    out.push_str("=== jfit - Model Comparison ===\n");
    out.push_str(&format_dataset(ingest));

    out.push_str("\nModel diagnostics:\n");
    for fit in &cmp.fits {
        let chosen = if fit.kind == cmp.best.kind { "*" } else { " " };
        out.push_str(&format!(
            "{chosen} {:<8} SSE={:.4e} RMSE={:.4e} BIC={:.3} params={}\n",
            fit.kind.display_name(),
            fit.result.quality.sse,
            fit.result.quality.rmse,
            fit.result.quality.bic,
            fmt_vec(&fit.result.params)
        ));
    }
    for (kind, reason) in &cmp.skipped {
        out.push_str(&format!("  (skipped {}) {reason}\n", kind.display_name()));
    }

    out.push_str("\nChosen model:\n");
    out.push_str(&format_fit(&cmp.best));

    out
}

fn fmt_err(v: f64) -> String {
    if v.is_finite() {
        format!("{v:<12.6}")
    } else {
        format!("{:<12}", "n/a")
    }
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.6}")).collect();
    format!("[{}]", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FitQuality, FitResult, MeasurementSeries, ModelKind};
    use crate::io::RowError;
    use nalgebra::DMatrix;

    fn sample_fit(rank: usize, covariance: DMatrix<f64>) -> KindFit {
        KindFit {
            kind: ModelKind::Simmons,
            result: FitResult {
                params: vec![1.25, 0.75],
                covariance,
                quality: FitQuality {
                    sse: 1e-6,
                    rmse: 1e-4,
                    bic: -120.5,
                    n: 21,
                },
                jacobian_rank: rank,
                evaluations: 12,
                termination: "converged".to_string(),
                clamped_samples: 0,
            },
        }
    }

    fn sample_ingest() -> IngestedSeries {
        IngestedSeries {
            series: MeasurementSeries::new(vec![-1.0, 1.0], vec![-2.0, 2.0]),
            voltage_column: "v".to_string(),
            current_column: "j".to_string(),
            row_errors: (0..7)
                .map(|i| RowError {
                    line: i + 4,
                    message: "Invalid voltage value 'x'.".to_string(),
                })
                .collect(),
            rows_read: 9,
        }
    }

    #[test]
    fn fit_block_lists_parameters_with_units() {
        let text = format_fit(&sample_fit(2, DMatrix::from_diagonal_element(2, 2, 0.0004)));
        assert!(text.contains("Model: Simmons"));
        assert!(text.contains("barrier_height"));
        assert!(text.contains("1.250000 ± 0.020000"));
        assert!(text.contains("nm"));
        assert!(text.contains("Jacobian rank 2/2"));
        assert!(!text.contains("pseudo-inverse"));
    }

    #[test]
    fn fit_block_flags_rank_deficiency_and_infinite_errors() {
        let text = format_fit(&sample_fit(1, DMatrix::from_element(2, 2, f64::INFINITY)));
        assert!(text.contains("pseudo-inverse"));
        assert!(text.contains("n/a"));
    }

    #[test]
    fn dataset_block_collapses_long_error_lists() {
        let text = format_dataset(&sample_ingest());
        assert!(text.contains("Points: n=2 of 9 rows | V=[-1.000, 1.000]"));
        assert!(text.contains("skipped line 4"));
        assert!(text.contains("... and 2 more skipped rows"));
    }
}
