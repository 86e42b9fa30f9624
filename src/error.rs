//! Process-level error type.
//!
//! Exit codes:
//! - 2: I/O or CLI input problems (missing file, unreadable CSV, bad columns)
//! - 3: the data cannot support the requested fit
//! - 4: the optimizer ran but produced no usable estimate

use crate::fit::{FitError, FitErrorKind};

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<FitError> for AppError {
    fn from(err: FitError) -> Self {
        match err.kind() {
            FitErrorKind::Dimension | FitErrorKind::Data => {
                AppError::new(3, format!("Invalid input for fit: {err}"))
            }
            FitErrorKind::Convergence => AppError::new(
                4,
                format!("Fit failed: {err}. Try a different starting point with `--guess`."),
            ),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
