//! Curve fitting orchestration.
//!
//! Responsibilities:
//!
//! - validate a measurement series against a model
//! - run Levenberg–Marquardt and estimate the parameter covariance
//! - compare variants using BIC

pub mod compare;
pub mod error;
pub mod fitter;
mod problem;

pub use compare::*;
pub use error::*;
pub use fitter::*;
