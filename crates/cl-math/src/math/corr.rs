//! Correlation/covariance matrix helpers.
//!
//! A covariance Σ is carried as a scale vector τ and a correlation Cholesky
//! factor L, with Σ = diag(τ) · L Lᵀ · diag(τ). Positive-definiteness then
//! holds by construction whenever τ > 0 and L has a positive diagonal.

use super::mvn::cholesky_lower;
use nalgebra::{DMatrix, DVector, SymmetricEigen};

/// L Lᵀ, reading only the lower triangle of `l`.
pub fn multiply_lower_tri_self_transpose(l: &DMatrix<f64>) -> DMatrix<f64> {
    let lower = l.lower_triangle();
    &lower * lower.transpose()
}

/// diag(v) · M · diag(v).
pub fn quad_form_diag(m: &DMatrix<f64>, v: &DVector<f64>) -> DMatrix<f64> {
    let n = m.nrows();
    DMatrix::from_fn(n, m.ncols(), |i, j| v[i] * m[(i, j)] * v[j])
}

/// diag(v) · M.
pub fn diag_pre_multiply(v: &DVector<f64>, m: &DMatrix<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(m.nrows(), m.ncols(), |i, j| v[i] * m[(i, j)])
}

/// Symmetric within a tolerance relative to the largest absolute entry.
pub fn is_symmetric(m: &DMatrix<f64>, tol: f64) -> bool {
    if !m.is_square() {
        return false;
    }
    let scale = m.amax().max(1.0);
    let n = m.nrows();
    for i in 0..n {
        for j in (i + 1)..n {
            if (m[(i, j)] - m[(j, i)]).abs() > tol * scale {
                return false;
            }
        }
    }
    true
}

/// Smallest eigenvalue of a symmetric matrix (NaN if not square or empty).
pub fn min_eigenvalue(m: &DMatrix<f64>) -> f64 {
    if !m.is_square() || m.nrows() == 0 || m.iter().any(|v| !v.is_finite()) {
        return f64::NAN;
    }
    SymmetricEigen::new(m.clone()).eigenvalues.min()
}

/// True for a valid Cholesky factor of a correlation matrix: lower
/// triangular, positive diagonal, unit-norm rows.
pub fn is_corr_cholesky(l: &DMatrix<f64>, tol: f64) -> bool {
    if !l.is_square() || l.nrows() == 0 {
        return false;
    }
    let k = l.nrows();
    for i in 0..k {
        let d = l[(i, i)];
        if d.is_nan() || d <= 0.0 {
            return false;
        }
        let mut norm_sq = 0.0;
        for j in 0..k {
            let v = l[(i, j)];
            if !v.is_finite() {
                return false;
            }
            if j > i && v != 0.0 {
                return false;
            }
            norm_sq += v * v;
        }
        if (norm_sq - 1.0).abs() > tol {
            return false;
        }
    }
    true
}

/// Cholesky factor of a correlation matrix (unit diagonal, SPD).
pub fn corr_cholesky_from_matrix(r: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    if !r.is_square() || (0..r.nrows()).any(|i| (r[(i, i)] - 1.0).abs() > 1e-9) {
        return None;
    }
    cholesky_lower(r)
}

/// Split a covariance matrix into its scale vector and correlation matrix.
///
/// Returns `None` unless the matrix is square with a strictly positive,
/// finite diagonal.
pub fn decompose_covariance(cov: &DMatrix<f64>) -> Option<(DVector<f64>, DMatrix<f64>)> {
    if !cov.is_square() || cov.nrows() == 0 {
        return None;
    }
    let n = cov.nrows();
    let mut tau = DVector::zeros(n);
    for i in 0..n {
        let var = cov[(i, i)];
        if var.is_nan() || var <= 0.0 || var.is_infinite() {
            return None;
        }
        tau[i] = var.sqrt();
    }
    let cor = DMatrix::from_fn(n, n, |i, j| {
        if i == j {
            1.0
        } else {
            cov[(i, j)] / (tau[i] * tau[j])
        }
    });
    Some((tau, cor))
}
