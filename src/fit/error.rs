//! Fitting-engine error taxonomy.

use thiserror::Error;

/// Broad failure class, used to decide what the user should change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitErrorKind {
    /// Inputs have the wrong shape; the fit was not attempted.
    Dimension,
    /// Inputs have the right shape but cannot support a fit.
    Data,
    /// The optimizer ran but produced no usable estimate.
    Convergence,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    #[error("voltage and current series differ in length ({voltage} vs {current})")]
    LengthMismatch { voltage: usize, current: usize },

    #[error("initial guess has {actual} parameters but model {model} takes {expected}")]
    ArityMismatch {
        model: String,
        expected: usize,
        actual: usize,
    },

    #[error("{points} data points cannot determine {parameters} free parameters")]
    InsufficientData { points: usize, parameters: usize },

    #[error("non-finite {field} value at index {index}")]
    NonFinite { field: &'static str, index: usize },

    #[error("fit did not converge after {evaluations} evaluations: {reason}")]
    NotConverged { reason: String, evaluations: usize },

    #[error("Jacobian is singular at the solution (rank {rank} of {parameters}); parameter covariance is undefined")]
    SingularJacobian { rank: usize, parameters: usize },
}

impl FitError {
    pub fn kind(&self) -> FitErrorKind {
        match self {
            FitError::LengthMismatch { .. } | FitError::ArityMismatch { .. } => FitErrorKind::Dimension,
            FitError::InsufficientData { .. } | FitError::NonFinite { .. } => FitErrorKind::Data,
            FitError::NotConverged { .. } | FitError::SingularJacobian { .. } => FitErrorKind::Convergence,
        }
    }
}
