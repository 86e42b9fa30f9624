//! Command-line parsing for the junction I-V fitter.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the modeling/math code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::ModelKind;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "jfit", version, about = "Tunneling junction I-V curve fitter (Simmons / BDR)")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit one model to a measured I-V CSV, print diagnostics, and optionally plot/export.
    Fit(FitArgs),
    /// Fit every model variant and pick one by BIC.
    Compare(CompareArgs),
    /// Generate a synthetic I-V dataset from known parameters.
    Synth(SynthArgs),
    /// Plot a previously exported fit JSON.
    Plot(PlotArgs),
}

/// Input and solver options shared by `fit` and `compare`.
#[derive(Debug, Parser, Clone)]
pub struct InputArgs {
    /// CSV file with voltage and current-density columns.
    #[arg(value_name = "CSV")]
    pub csv: PathBuf,

    /// Voltage column name (default: `v`/`voltage`, else the first column).
    #[arg(long = "v-col")]
    pub v_col: Option<String>,

    /// Current-density column name (default: `j`/`i`/`current`/`current_density`, else the second column).
    #[arg(long = "j-col")]
    pub j_col: Option<String>,

    /// Residual-evaluation budget (also read from `JFIT_MAX_EVALS`; minimum 20000).
    #[arg(long = "max-evals")]
    pub max_evals: Option<usize>,

    /// Fail instead of reporting a pseudo-inverse covariance when parameters are not identifiable.
    #[arg(long)]
    pub strict_covariance: bool,

    /// Render an ASCII plot in the terminal (enabled by default).
    #[arg(long, default_value_t = true)]
    pub plot: bool,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

/// Options for fitting a single model.
#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Model to fit.
    #[arg(long, value_enum, default_value_t = ModelKind::Simmons)]
    pub model: ModelKind,

    /// Starting point, comma-separated in positional order (e.g. `1.0,1.0,-0.1`).
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub guess: Option<Vec<f64>>,

    /// Export per-sample results to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export the fit (parameters + covariance + fitted grid) to JSON.
    #[arg(long = "export-fit")]
    pub export_fit: Option<PathBuf>,
}

/// Options for model comparison.
#[derive(Debug, Parser, Clone)]
pub struct CompareArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Models to compare (repeatable; default: all).
    #[arg(long = "model", value_enum)]
    pub models: Vec<ModelKind>,
}

/// Options for synthetic data generation.
#[derive(Debug, Parser, Clone)]
pub struct SynthArgs {
    /// Model used to generate the data.
    #[arg(long, value_enum, default_value_t = ModelKind::Simmons)]
    pub model: ModelKind,

    /// True parameters, comma-separated in positional order.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
    pub params: Vec<f64>,

    /// Lowest voltage.
    #[arg(long, default_value_t = -1.0, allow_hyphen_values = true)]
    pub v_min: f64,

    /// Highest voltage.
    #[arg(long, default_value_t = 1.0, allow_hyphen_values = true)]
    pub v_max: f64,

    /// Number of samples.
    #[arg(short = 'n', long, default_value_t = 41)]
    pub points: usize,

    /// Noise standard deviation relative to |J|.
    #[arg(long, default_value_t = 0.01)]
    pub noise_rel: f64,

    /// Absolute noise floor.
    #[arg(long, default_value_t = 0.0)]
    pub noise_abs: f64,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Output CSV path.
    #[arg(short = 'o', long)]
    pub out: PathBuf,
}

/// Options for plotting a saved fit.
#[derive(Debug, Parser)]
pub struct PlotArgs {
    /// Fit JSON file produced by `jfit fit --export-fit`.
    #[arg(long, value_name = "JSON")]
    pub fit: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}
