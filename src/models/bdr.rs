//! Simplified Brinkman–Dynes–Rowell model.
//!
//! The effective barrier shifts linearly with bias through the asymmetry
//! term, `phi + dphi * v`.

use nalgebra::DMatrix;

use super::{clamp_barrier, tunneling_current, DECAY};

#[inline]
fn effective_barrier(v: f64, avg_barrier_height: f64, asymmetry: f64) -> f64 {
    clamp_barrier(avg_barrier_height + asymmetry * v)
}

/// Current density for every voltage sample.
pub fn bdr_current_density(
    voltage: &[f64],
    avg_barrier_height: f64,
    barrier_thickness: f64,
    asymmetry: f64,
) -> Vec<f64> {
    voltage
        .iter()
        .map(|&v| {
            tunneling_current(
                v,
                effective_barrier(v, avg_barrier_height, asymmetry),
                barrier_thickness,
            )
        })
        .collect()
}

/// Analytic Jacobian with columns `(avg_barrier_height, barrier_thickness, asymmetry)`.
///
/// The three columns are linearly dependent wherever the barrier is open:
/// `s·∂J/∂s = 2(phi·∂J/∂phi + dphi·∂J/∂dphi)`. Only `s²·phi` and `s²·dphi`
/// are identifiable from data.
pub fn bdr_jacobian(
    voltage: &[f64],
    avg_barrier_height: f64,
    barrier_thickness: f64,
    asymmetry: f64,
) -> DMatrix<f64> {
    let mut jac = DMatrix::zeros(voltage.len(), 3);
    for (row, &v) in voltage.iter().enumerate() {
        let eff = effective_barrier(v, avg_barrier_height, asymmetry);
        if eff > 0.0 {
            let j = tunneling_current(v, eff, barrier_thickness);
            let root = eff.sqrt();
            let d_height = -DECAY * barrier_thickness * j / (2.0 * root);
            jac[(row, 0)] = d_height;
            jac[(row, 1)] = -DECAY * root * j;
            jac[(row, 2)] = v * d_height;
        }
    }
    jac
}

pub fn bdr_clamped_samples(voltage: &[f64], avg_barrier_height: f64, asymmetry: f64) -> usize {
    voltage
        .iter()
        .filter(|&&v| avg_barrier_height + asymmetry * v <= 0.0)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{simmons_current_density, PREFACTOR};

    #[test]
    fn zero_bias_gives_zero_current() {
        let j = bdr_current_density(&[-1.0, 0.0, 1.0], 1.0, 1.0, 0.3);
        assert_eq!(j[1], 0.0);
        assert!(j[0] < 0.0 && j[2] > 0.0);
    }

    #[test]
    fn negative_asymmetry_reduces_to_simmons() {
        // dphi = -1/2 makes the effective barrier identical to Simmons.
        let v = [-1.0, -0.5, 0.0, 0.5, 1.0, 2.5];
        let a = bdr_current_density(&v, 1.0, 1.3, -0.5);
        let b = simmons_current_density(&v, 1.0, 1.3);
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() <= 1e-12 * y.abs().max(1.0));
        }
    }

    #[test]
    fn clamp_path_saturates() {
        let j = bdr_current_density(&[-3.0], 1.0, 2.0, 0.5)[0];
        assert_eq!(j, PREFACTOR * -3.0);
        assert_eq!(bdr_clamped_samples(&[-3.0, -2.0, 0.0, 4.0], 1.0, 0.5), 2);
    }

    #[test]
    fn continuous_across_clamp_boundary() {
        let (h, a) = (1.0, 0.5);
        let boundary = -h / a;
        let at = bdr_current_density(&[boundary], h, 1.0, a)[0];
        for delta in [1e-12, -1e-12] {
            let near = bdr_current_density(&[boundary + delta], h, 1.0, a)[0];
            assert!(((near - at) / at).abs() < 1e-5);
        }
    }

    #[test]
    fn jacobian_columns_are_dependent() {
        let v = [-0.9, -0.2, 0.4, 1.0];
        let (h, s, a) = (1.2, 0.8, 0.25);
        let jac = bdr_jacobian(&v, h, s, a);
        for row in 0..v.len() {
            let lhs = s * jac[(row, 1)];
            let rhs = 2.0 * (h * jac[(row, 0)] + a * jac[(row, 2)]);
            assert!((lhs - rhs).abs() <= 1e-9 * lhs.abs().max(1.0));
        }
    }
}
