//! LKJ prior on the Cholesky factor of a correlation matrix.
//!
//! For a K×K correlation Cholesky factor L and concentration η > 0:
//!
//! ```text
//! log p(L | η) = Σ_{i=1}^{K-1} (K - i - 1 + 2(η - 1)) · log L_ii  + const(K, η)
//! ```
//!
//! (0-based diagonal index.) The normalizing constant depends only on K and
//! η, both of which are data for this model, so it is omitted.

use nalgebra::DMatrix;

/// Unnormalized LKJ log density of the correlation Cholesky factor `l`.
///
/// Returns NaN for a non-square factor, a non-positive `eta`, or a
/// non-positive diagonal entry.
pub fn lkj_corr_cholesky_lpdf(l: &DMatrix<f64>, eta: f64) -> f64 {
    if !l.is_square() || l.nrows() == 0 {
        return f64::NAN;
    }
    if eta.is_nan() || eta <= 0.0 || eta.is_infinite() {
        return f64::NAN;
    }
    let k = l.nrows();
    let mut lp = 0.0;
    for i in 1..k {
        let d = l[(i, i)];
        if d <= 0.0 || !d.is_finite() {
            return f64::NAN;
        }
        let coef = (k - i - 1) as f64 + 2.0 * (eta - 1.0);
        lp += coef * d.ln();
    }
    lp
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::corr::corr_cholesky_from_matrix;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        if a.is_nan() || b.is_nan() {
            return false;
        }
        (a - b).abs() <= tol
    }

    #[test]
    fn identity_has_zero_log_density() {
        for eta in [0.5, 1.0, 4.0] {
            let lp = lkj_corr_cholesky_lpdf(&DMatrix::identity(4, 4), eta);
            assert!(approx_eq(lp, 0.0, 1e-12));
        }
    }

    #[test]
    fn two_by_two_uniform_at_eta_one() {
        let r = DMatrix::from_row_slice(2, 2, &[1.0, 0.8, 0.8, 1.0]);
        let l = corr_cholesky_from_matrix(&r).unwrap();
        assert!(approx_eq(lkj_corr_cholesky_lpdf(&l, 1.0), 0.0, 1e-12));
    }

    #[test]
    fn large_eta_prefers_identity() {
        let r = DMatrix::from_row_slice(2, 2, &[1.0, 0.6, 0.6, 1.0]);
        let l = corr_cholesky_from_matrix(&r).unwrap();
        let strong = lkj_corr_cholesky_lpdf(&l, 10.0);
        let ident = lkj_corr_cholesky_lpdf(&DMatrix::identity(2, 2), 10.0);
        assert!(ident > strong);
    }

    #[test]
    fn scalar_factor_is_flat() {
        let l = DMatrix::identity(1, 1);
        assert!(approx_eq(lkj_corr_cholesky_lpdf(&l, 2.0), 0.0, 1e-12));
    }

    #[test]
    fn invalid_inputs_are_nan() {
        assert!(lkj_corr_cholesky_lpdf(&DMatrix::identity(2, 2), 0.0).is_nan());
        assert!(lkj_corr_cholesky_lpdf(&DMatrix::zeros(2, 3), 1.0).is_nan());
        assert!(lkj_corr_cholesky_lpdf(&DMatrix::zeros(2, 2), 1.0).is_nan());
    }
}
