//! Central finite-difference Jacobian.

use nalgebra::DMatrix;

/// Approximate `∂f_i/∂p_k` by central differences.
///
/// `f` must return `rows` values for any parameter vector of the same length as `params`.
/// The step for each parameter is `cbrt(eps) * max(|p_k|, 1)`.
pub fn finite_diff_jacobian<F>(f: F, params: &[f64], rows: usize) -> DMatrix<f64>
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    let mut jac = DMatrix::zeros(rows, params.len());
    let mut shifted = params.to_vec();

    for col in 0..params.len() {
        let step = f64::EPSILON.cbrt() * params[col].abs().max(1.0);

        shifted[col] = params[col] + step;
        let forward = f(&shifted);
        shifted[col] = params[col] - step;
        let backward = f(&shifted);
        shifted[col] = params[col];

        // Actual spacing after rounding of p ± step.
        let width = (params[col] + step) - (params[col] - step);
        for row in 0..rows {
            jac[(row, col)] = (forward[row] - backward[row]) / width;
        }
    }

    jac
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn differentiates_polynomial() {
        // f(p) = [p0^2, p0*p1, 3*p1]
        let f = |p: &[f64]| vec![p[0] * p[0], p[0] * p[1], 3.0 * p[1]];
        let jac = finite_diff_jacobian(f, &[2.0, -1.5], 3);
        let expected = [[4.0, 0.0], [-1.5, 2.0], [0.0, 3.0]];
        for row in 0..3 {
            for col in 0..2 {
                assert!((jac[(row, col)] - expected[row][col]).abs() < 1e-8);
            }
        }
    }
}
