//! Parameter covariance from the Jacobian at a least-squares solution.
//!
//! The standard nonlinear-regression estimator is
//!
//! ```text
//! cov = σ² (JᵀJ)⁻¹,   σ² = SSE / (n - p)
//! ```
//!
//! We never form `JᵀJ` explicitly. With the thin SVD `J = U Σ Vᵀ` the inverse
//! is `V Σ⁻² Vᵀ`, which is better conditioned and tells us the numerical rank
//! directly.

use nalgebra::DMatrix;

/// `(JᵀJ)⁻¹` (or its pseudo-inverse) together with the numerical rank of `J`.
#[derive(Debug, Clone)]
pub struct InverseNormal {
    pub matrix: DMatrix<f64>,
    pub rank: usize,
}

/// Invert the normal matrix of `jac` through its SVD.
///
/// Singular values at or below `eps * max(rows, cols) * σ_max` are treated as
/// zero and dropped (pseudo-inverse). Returns `None` when the Jacobian has a
/// non-finite entry or carries no information at all (rank 0).
pub fn inverse_normal_matrix(jac: &DMatrix<f64>) -> Option<InverseNormal> {
    let cols = jac.ncols();
    if cols == 0 {
        return Some(InverseNormal {
            matrix: DMatrix::zeros(0, 0),
            rank: 0,
        });
    }
    if jac.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let svd = jac.clone().svd(false, true);
    let v_t = svd.v_t?;
    let sigma = &svd.singular_values;

    let sigma_max = sigma.iter().copied().fold(0.0_f64, f64::max);
    if sigma_max <= 0.0 {
        return None;
    }
    let cutoff = f64::EPSILON * jac.nrows().max(cols) as f64 * sigma_max;

    let kept: Vec<usize> = (0..sigma.len()).filter(|&k| sigma[k] > cutoff).collect();
    if kept.is_empty() {
        return None;
    }

    let mut matrix = DMatrix::zeros(cols, cols);
    for i in 0..cols {
        for j in 0..cols {
            let mut acc = 0.0;
            for &k in &kept {
                acc += v_t[(k, i)] * v_t[(k, j)] / (sigma[k] * sigma[k]);
            }
            matrix[(i, j)] = acc;
        }
    }

    Some(InverseNormal {
        matrix,
        rank: kept.len(),
    })
}

/// Scale an inverse normal matrix by the residual variance, forcing exact symmetry.
pub fn scaled_covariance(inverse: &DMatrix<f64>, residual_variance: f64) -> DMatrix<f64> {
    let cov = inverse * residual_variance;
    (&cov + cov.transpose()) * 0.5
}
