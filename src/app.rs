//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and installs the logger
//! - parses CLI arguments
//! - runs fitting or model comparison
//! - prints reports/plots
//! - writes optional exports

use clap::Parser;

use crate::cli::{Command, CompareArgs, FitArgs, InputArgs, PlotArgs, SynthArgs};
use crate::domain::{FitConfig, ModelKind};
use crate::error::AppError;
use crate::fit::MIN_MAX_EVALUATIONS;

pub mod pipeline;

/// Environment variable supplying the evaluation budget when `--max-evals` is absent.
pub const MAX_EVALS_ENV: &str = "JFIT_MAX_EVALS";

/// Entry point for the `jfit` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_logging();

    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Compare(args) => handle_compare(args),
        Command::Synth(args) => handle_synth(args),
        Command::Plot(args) => handle_plot(args),
    }
}

fn init_logging() {
    // A second init (e.g. from tests) is harmless.
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .try_init();
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(&args)?;
    let run = pipeline::run_fit(&config)?;

    println!(
        "{}",
        crate::report::format_fit_summary(&run.ingest, &run.fit, &config)
    );

    if config.plot {
        let plot = crate::plot::render_ascii_plot(
            &run.residuals,
            &run.fit.kind,
            &run.fit.result.params,
            config.plot_width,
            config.plot_height,
        );
        println!("{plot}");
    }

    // Optional exports.
    if let Some(path) = &config.export_results {
        crate::io::write_results_csv(path, &run.residuals)?;
    }
    if let Some(path) = &config.export_fit {
        let record = crate::io::build_fit_file(&run.fit, &run.ingest.series, Some(&config.csv_path));
        crate::io::write_fit_json(path, &record)?;
    }

    Ok(())
}

fn handle_compare(args: CompareArgs) -> Result<(), AppError> {
    let config = input_config(&args.input, ModelKind::Simmons)?;
    let out = pipeline::run_compare(&config, &args.models)?;

    println!(
        "{}",
        crate::report::format_comparison(&out.ingest, &out.comparison)
    );

    if config.plot {
        let best = &out.comparison.best;
        let plot = crate::plot::render_ascii_plot(
            &out.residuals,
            &best.kind,
            &best.result.params,
            config.plot_width,
            config.plot_height,
        );
        println!("{plot}");
    }

    Ok(())
}

fn handle_synth(args: SynthArgs) -> Result<(), AppError> {
    let spec = crate::data::SynthSpec {
        model: args.model,
        params: args.params,
        v_min: args.v_min,
        v_max: args.v_max,
        points: args.points,
        noise_rel: args.noise_rel,
        noise_abs: args.noise_abs,
        seed: args.seed,
    };
    let series = crate::data::generate_series(&spec)?;
    crate::data::write_series_csv(&args.out, &series)?;

    println!(
        "Wrote {} {} samples to {}",
        series.len(),
        spec.model.display_name(),
        args.out.display()
    );
    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let fit = crate::io::read_fit_json(&args.fit)?;
    let plot = crate::plot::render_ascii_plot_from_fit_file(&fit, args.width, args.height);

    println!("{plot}");
    Ok(())
}

pub fn fit_config_from_args(args: &FitArgs) -> Result<FitConfig, AppError> {
    let mut config = input_config(&args.input, args.model)?;
    config.initial_guess = args.guess.clone();
    config.export_results = args.export.clone();
    config.export_fit = args.export_fit.clone();
    Ok(config)
}

fn input_config(input: &InputArgs, model: ModelKind) -> Result<FitConfig, AppError> {
    let env_value = std::env::var(MAX_EVALS_ENV).ok();
    Ok(FitConfig {
        csv_path: input.csv.clone(),
        model,
        initial_guess: None,
        max_evaluations: resolve_max_evaluations(input.max_evals, env_value.as_deref())?,
        strict_covariance: input.strict_covariance,
        voltage_column: input.v_col.clone(),
        current_column: input.j_col.clone(),
        plot: input.plot && !input.no_plot,
        plot_width: input.width,
        plot_height: input.height,
        export_results: None,
        export_fit: None,
    })
}

/// Pick the evaluation budget: flag, then environment, then the minimum.
///
/// Budgets below the minimum are raised to it with a warning.
pub fn resolve_max_evaluations(flag: Option<usize>, env_value: Option<&str>) -> Result<usize, AppError> {
    let requested = match (flag, env_value) {
        (Some(n), _) => Some(n),
        (None, Some(raw)) => Some(raw.trim().parse::<usize>().map_err(|_| {
            AppError::new(2, format!("Invalid {MAX_EVALS_ENV}='{raw}': expected a positive integer."))
        })?),
        (None, None) => None,
    };

    match requested {
        Some(n) if n < MIN_MAX_EVALUATIONS => {
            log::warn!("evaluation budget {n} is below the minimum; using {MIN_MAX_EVALUATIONS}");
            Ok(MIN_MAX_EVALUATIONS)
        }
        Some(n) => Ok(n),
        None => Ok(MIN_MAX_EVALUATIONS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;

    #[test]
    fn max_evaluations_prefers_flag_then_env() {
        assert_eq!(resolve_max_evaluations(None, None).unwrap(), MIN_MAX_EVALUATIONS);
        assert_eq!(resolve_max_evaluations(None, Some("50000")).unwrap(), 50_000);
        assert_eq!(resolve_max_evaluations(Some(30_000), Some("50000")).unwrap(), 30_000);
        assert_eq!(resolve_max_evaluations(Some(100), None).unwrap(), MIN_MAX_EVALUATIONS);
        assert_eq!(resolve_max_evaluations(None, Some("lots")).unwrap_err().exit_code(), 2);
    }

    #[test]
    fn fit_args_become_config() {
        let cli = Cli::parse_from([
            "jfit", "fit", "iv.csv", "--model", "bdr", "--guess", "1,1,-0.2", "--no-plot", "--max-evals", "40000",
            "--j-col", "I",
        ]);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit subcommand");
        };
        let config = fit_config_from_args(&args).unwrap();
        assert_eq!(config.model, ModelKind::Bdr);
        assert_eq!(config.initial_guess, Some(vec![1.0, 1.0, -0.2]));
        assert_eq!(config.max_evaluations, 40_000);
        assert_eq!(config.current_column.as_deref(), Some("I"));
        assert!(!config.plot);
    }
}
