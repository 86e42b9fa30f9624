//! Simplified Simmons model.
//!
//! The effective barrier falls linearly with bias, `phi - v/2`, and the
//! current decays exponentially with `s * sqrt(phi_eff)`.

use nalgebra::DMatrix;

use super::{clamp_barrier, tunneling_current, DECAY};

#[inline]
fn effective_barrier(v: f64, barrier_height: f64) -> f64 {
    clamp_barrier(barrier_height - 0.5 * v)
}

/// Current density for every voltage sample.
///
/// Samples that drive the effective barrier to zero or below saturate to `A * v`.
pub fn simmons_current_density(voltage: &[f64], barrier_height: f64, barrier_thickness: f64) -> Vec<f64> {
    voltage
        .iter()
        .map(|&v| tunneling_current(v, effective_barrier(v, barrier_height), barrier_thickness))
        .collect()
}

/// Analytic Jacobian, one row per sample, columns `(barrier_height, barrier_thickness)`.
///
/// Derivatives are zero on the clamp path.
pub fn simmons_jacobian(voltage: &[f64], barrier_height: f64, barrier_thickness: f64) -> DMatrix<f64> {
    let mut jac = DMatrix::zeros(voltage.len(), 2);
    for (row, &v) in voltage.iter().enumerate() {
        let eff = effective_barrier(v, barrier_height);
        if eff > 0.0 {
            let j = tunneling_current(v, eff, barrier_thickness);
            let root = eff.sqrt();
            jac[(row, 0)] = -DECAY * barrier_thickness * j / (2.0 * root);
            jac[(row, 1)] = -DECAY * root * j;
        }
    }
    jac
}

/// Number of samples whose effective barrier is clamped.
pub fn simmons_clamped_samples(voltage: &[f64], barrier_height: f64) -> usize {
    voltage
        .iter()
        .filter(|&&v| barrier_height - 0.5 * v <= 0.0)
        .count()
}
