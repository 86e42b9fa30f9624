//! The capability shared by every current-density model.
//!
//! The fitter relies on two primitive operations:
//! - evaluate `J(V)` for a whole voltage slice and a positional parameter vector
//! - the Jacobian of that evaluation with respect to the parameters
//!
//! `ModelKind` implements both analytically; caller-supplied models get a
//! finite-difference Jacobian for free.

use nalgebra::DMatrix;

use crate::domain::ModelKind;
use crate::math::finite_diff_jacobian;
use crate::models::{
    bdr_clamped_samples, bdr_current_density, bdr_jacobian, simmons_clamped_samples,
    simmons_current_density, simmons_jacobian,
};

/// A model mapping voltage samples and parameters to current density.
pub trait CurrentDensityModel {
    fn name(&self) -> &str;

    /// Fixed parameter count.
    fn arity(&self) -> usize;

    /// Current density for every voltage sample.
    ///
    /// # Panics
    /// Implementations may panic if `params.len() != self.arity()`.
    fn evaluate(&self, voltage: &[f64], params: &[f64]) -> Vec<f64>;

    /// `∂J_i/∂p_k`, shape `voltage.len() × arity`.
    fn jacobian(&self, voltage: &[f64], params: &[f64]) -> DMatrix<f64> {
        finite_diff_jacobian(|p| self.evaluate(voltage, p), params, voltage.len())
    }

    /// Samples sitting on a clamped (non-positive) effective barrier.
    fn clamped_samples(&self, _voltage: &[f64], _params: &[f64]) -> usize {
        0
    }
}

impl CurrentDensityModel for ModelKind {
    fn name(&self) -> &str {
        self.display_name()
    }

    fn arity(&self) -> usize {
        ModelKind::arity(*self)
    }

    fn evaluate(&self, voltage: &[f64], params: &[f64]) -> Vec<f64> {
        match self {
            ModelKind::Simmons => simmons_current_density(voltage, params[0], params[1]),
            ModelKind::Bdr => bdr_current_density(voltage, params[0], params[1], params[2]),
        }
    }

    fn jacobian(&self, voltage: &[f64], params: &[f64]) -> DMatrix<f64> {
        match self {
            ModelKind::Simmons => simmons_jacobian(voltage, params[0], params[1]),
            ModelKind::Bdr => bdr_jacobian(voltage, params[0], params[1], params[2]),
        }
    }

    fn clamped_samples(&self, voltage: &[f64], params: &[f64]) -> usize {
        match self {
            ModelKind::Simmons => simmons_clamped_samples(voltage, params[0]),
            ModelKind::Bdr => bdr_clamped_samples(voltage, params[0], params[2]),
        }
    }
}

/// Closure-backed model for caller-defined current-density expressions.
pub struct FnModel<F> {
    name: String,
    arity: usize,
    func: F,
}

impl<F> FnModel<F>
where
    F: Fn(&[f64], &[f64]) -> Vec<f64>,
{
    pub fn new(name: impl Into<String>, arity: usize, func: F) -> Self {
        Self {
            name: name.into(),
            arity,
            func,
        }
    }
}

impl<F> CurrentDensityModel for FnModel<F>
where
    F: Fn(&[f64], &[f64]) -> Vec<f64>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn arity(&self) -> usize {
        self.arity
    }

    fn evaluate(&self, voltage: &[f64], params: &[f64]) -> Vec<f64> {
        (self.func)(voltage, params)
    }
}
