//! Multivariate normal density in Cholesky parameterization.

use super::stable::LOG_SQRT_2PI;
use nalgebra::{Cholesky, DMatrix, DVector};

/// Lower Cholesky factor of a symmetric positive-definite matrix.
///
/// Only the lower triangle of `m` is read. Returns `None` for non-square,
/// non-finite, or non-positive-definite input.
pub fn cholesky_lower(m: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    if !m.is_square() || m.nrows() == 0 || m.iter().any(|v| !v.is_finite()) {
        return None;
    }
    Cholesky::new(m.clone()).map(|c| c.l())
}

/// Solve `L z = x - mu` and return `(z, Σ log L_ii)`.
///
/// Shared by the normal and Student-t kernels, which both need the
/// whitened residual and the log-determinant of `L`.
pub(crate) fn whiten(
    x: &DVector<f64>,
    mu: &DVector<f64>,
    l: &DMatrix<f64>,
) -> Option<(DVector<f64>, f64)> {
    let k = x.len();
    if k == 0 || mu.len() != k || l.nrows() != k || l.ncols() != k {
        return None;
    }
    let mut log_det = 0.0;
    for i in 0..k {
        let d = l[(i, i)];
        if d <= 0.0 || !d.is_finite() {
            return None;
        }
        log_det += d.ln();
    }
    let diff = x - mu;
    let z = l.solve_lower_triangular(&diff)?;
    Some((z, log_det))
}

/// Log density of MVN(mu, L Lᵀ) at x, given the lower Cholesky factor `l`.
///
/// Returns NaN for mismatched shapes or a factor with a non-positive diagonal.
pub fn multi_normal_cholesky_lpdf(x: &DVector<f64>, mu: &DVector<f64>, l: &DMatrix<f64>) -> f64 {
    match whiten(x, mu, l) {
        Some((z, log_det)) => {
            -(x.len() as f64) * LOG_SQRT_2PI - log_det - 0.5 * z.norm_squared()
        }
        None => f64::NAN,
    }
}
