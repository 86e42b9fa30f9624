//! Shared domain types.
//!
//! These types are intentionally kept lightweight so they can be:
//!
//! - used in-memory during fitting
//! - exported to JSON/CSV
//! - reloaded later for plotting

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Tunneling current-density model variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Simplified Simmons model: `(barrier_height, barrier_thickness)`.
    Simmons,
    /// Simplified Brinkman–Dynes–Rowell model:
    /// `(avg_barrier_height, barrier_thickness, asymmetry)`.
    Bdr,
}

/// Static description of one positional model parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    /// Short symbol used in one-line summaries.
    pub symbol: &'static str,
    pub unit: &'static str,
}

const SIMMONS_PARAMS: [ParamSpec; 2] = [
    ParamSpec { name: "barrier_height", symbol: "phi", unit: "eV" },
    ParamSpec { name: "barrier_thickness", symbol: "s", unit: "nm" },
];

const BDR_PARAMS: [ParamSpec; 3] = [
    ParamSpec { name: "avg_barrier_height", symbol: "phi", unit: "eV" },
    ParamSpec { name: "barrier_thickness", symbol: "s", unit: "nm" },
    ParamSpec { name: "asymmetry", symbol: "dphi", unit: "eV" },
];

impl ModelKind {
    pub const ALL: [ModelKind; 2] = [ModelKind::Simmons, ModelKind::Bdr];

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::Simmons => "Simmons",
            ModelKind::Bdr => "BDR",
        }
    }

    /// Number of free parameters.
    pub fn arity(self) -> usize {
        self.parameters().len()
    }

    /// Parameter layout, in positional order.
    pub fn parameters(self) -> &'static [ParamSpec] {
        match self {
            ModelKind::Simmons => &SIMMONS_PARAMS,
            ModelKind::Bdr => &BDR_PARAMS,
        }
    }

    /// Starting point used by `fit_simmons` / `fit_bdr`.
    pub fn default_guess(self) -> Vec<f64> {
        match self {
            ModelKind::Simmons => SimmonsParams::DEFAULT_GUESS.to_vec(),
            ModelKind::Bdr => BdrParams::DEFAULT_GUESS.to_vec(),
        }
    }
}

/// Simmons model parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimmonsParams {
    /// eV
    pub barrier_height: f64,
    /// nm
    pub barrier_thickness: f64,
}

impl SimmonsParams {
    pub const DEFAULT_GUESS: SimmonsParams = SimmonsParams {
        barrier_height: 1.0,
        barrier_thickness: 1.0,
    };

    pub fn from_slice(params: &[f64]) -> Option<Self> {
        match *params {
            [barrier_height, barrier_thickness] => Some(Self {
                barrier_height,
                barrier_thickness,
            }),
            _ => None,
        }
    }

    pub fn to_vec(&self) -> Vec<f64> {
        vec![self.barrier_height, self.barrier_thickness]
    }
}

/// BDR model parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BdrParams {
    /// eV
    pub avg_barrier_height: f64,
    /// nm
    pub barrier_thickness: f64,
    /// eV, either sign.
    pub asymmetry: f64,
}

impl BdrParams {
    pub const DEFAULT_GUESS: BdrParams = BdrParams {
        avg_barrier_height: 1.0,
        barrier_thickness: 1.0,
        asymmetry: 0.0,
    };

    pub fn from_slice(params: &[f64]) -> Option<Self> {
        match *params {
            [avg_barrier_height, barrier_thickness, asymmetry] => Some(Self {
                avg_barrier_height,
                barrier_thickness,
                asymmetry,
            }),
            _ => None,
        }
    }

    pub fn to_vec(&self) -> Vec<f64> {
        vec![self.avg_barrier_height, self.barrier_thickness, self.asymmetry]
    }
}

/// Index-aligned voltage / current-density samples.
///
/// The i-th voltage pairs with the i-th current. No ordering is required.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementSeries {
    pub voltage: Vec<f64>,
    pub current: Vec<f64>,
}

impl MeasurementSeries {
    pub fn new(voltage: Vec<f64>, current: Vec<f64>) -> Self {
        Self { voltage, current }
    }

    pub fn from_pairs(pairs: &[(f64, f64)]) -> Self {
        let (voltage, current) = pairs.iter().copied().unzip();
        Self { voltage, current }
    }

    pub fn len(&self) -> usize {
        self.voltage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voltage.is_empty()
    }

    /// `(min, max)` of the voltage samples, if any are finite and distinct.
    pub fn voltage_range(&self) -> Option<(f64, f64)> {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for &v in &self.voltage {
            lo = lo.min(v);
            hi = hi.max(v);
        }
        if lo.is_finite() && hi.is_finite() && hi > lo {
            Some((lo, hi))
        } else {
            None
        }
    }
}

/// Fit quality diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitQuality {
    pub sse: f64,
    pub rmse: f64,
    pub bic: f64,
    pub n: usize,
}

/// Output of a single nonlinear least-squares fit.
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    /// Parameters at convergence, same order as the initial guess.
    pub params: Vec<f64>,
    /// `residual_variance * (JᵀJ)⁻¹`, symmetric, `arity × arity`.
    pub covariance: DMatrix<f64>,
    pub quality: FitQuality,
    /// Numerical rank of the Jacobian at the solution.
    pub jacobian_rank: usize,
    /// Residual evaluations spent by the optimizer.
    pub evaluations: usize,
    pub termination: String,
    /// Samples whose effective barrier is clamped to zero at the solution.
    pub clamped_samples: usize,
}

impl FitResult {
    /// One-sigma parameter uncertainties (square root of the covariance diagonal).
    pub fn std_errors(&self) -> Vec<f64> {
        self.covariance.diagonal().iter().map(|v| v.sqrt()).collect()
    }

    pub fn into_parts(self) -> (Vec<f64>, DMatrix<f64>) {
        (self.params, self.covariance)
    }
}

/// A fit of one named variant (used by comparison and reporting).
#[derive(Debug, Clone, PartialEq)]
pub struct KindFit {
    pub kind: ModelKind,
    pub result: FitResult,
}

/// A per-sample fitted value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IvResidual {
    pub voltage: f64,
    pub current: f64,
    pub fitted: f64,
    pub residual: f64,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags, the environment, and defaults.
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub csv_path: PathBuf,
    pub model: ModelKind,
    /// Custom starting point. `None` uses the variant's default guess.
    pub initial_guess: Option<Vec<f64>>,
    pub max_evaluations: usize,
    /// Fail instead of falling back to a pseudo-inverse on rank-deficient Jacobians.
    pub strict_covariance: bool,

    pub voltage_column: Option<String>,
    pub current_column: Option<String>,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,

    pub export_results: Option<PathBuf>,
    pub export_fit: Option<PathBuf>,
}

/// A saved fit file (JSON).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitFile {
    pub tool: String,
    pub created: DateTime<Utc>,
    pub source: Option<String>,
    pub model: ModelKind,
    pub parameters: Vec<FittedParameter>,
    /// Omitted when any entry is non-finite (no residual degrees of freedom).
    pub covariance: Option<Vec<Vec<f64>>>,
    /// Numerical rank of the Jacobian; below the parameter count the
    /// covariance is a pseudo-inverse.
    pub jacobian_rank: usize,
    pub quality: FitQuality,
    pub grid: CurveGrid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedParameter {
    pub name: String,
    pub unit: String,
    pub value: f64,
    pub std_error: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveGrid {
    pub voltage: Vec<f64>,
    pub current: Vec<f64>,
}
