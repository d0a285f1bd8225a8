//! Constraining transforms from unconstrained reals to parameter domains.
//!
//! Gradient-based samplers move on ℝⁿ. Each `*_constrain` maps an
//! unconstrained value into its domain and returns the log absolute Jacobian
//! determinant of that map, which must be added to the target density. The
//! matching `*_free` is the inverse.
//!
//! | domain                       | constrain                    | log |J|                     |
//! |------------------------------|------------------------------|-----------------------------|
//! | (lb, ∞)                      | lb + exp(y)                  | y                           |
//! | (0, 1)                       | logistic(y)                  | log σ(y) + log(1 - σ(y))    |
//! | correlation Cholesky (K×K)   | tanh CPCs, row by row        | see [`corr_cholesky_constrain`] |

use super::stable::softplus;
use nalgebra::DMatrix;

/// Map `y` to `(lb, ∞)`.
pub fn lower_bound_constrain(y: f64, lb: f64) -> (f64, f64) {
    (lb + y.exp(), y)
}

/// Inverse of [`lower_bound_constrain`]; NaN when `x <= lb`.
pub fn lower_bound_free(x: f64, lb: f64) -> f64 {
    if x.is_nan() || x <= lb {
        return f64::NAN;
    }
    (x - lb).ln()
}

/// Map `y` to `(0, 1)` through the logistic function.
pub fn unit_interval_constrain(y: f64) -> (f64, f64) {
    let x = if y >= 0.0 {
        1.0 / (1.0 + (-y).exp())
    } else {
        let e = y.exp();
        e / (1.0 + e)
    };
    let log_jacobian = -softplus(-y) - softplus(y);
    (x, log_jacobian)
}

/// Inverse of [`unit_interval_constrain`]. Returns ±∞ on the closed
/// endpoints and NaN outside [0, 1].
pub fn unit_interval_free(x: f64) -> f64 {
    if x.is_nan() || !(0.0..=1.0).contains(&x) {
        return f64::NAN;
    }
    x.ln() - (-x).ln_1p()
}

/// Number of unconstrained values for a K×K correlation Cholesky factor.
pub fn corr_cholesky_free_dim(k: usize) -> usize {
    k * k.saturating_sub(1) / 2
}

/// Build a correlation Cholesky factor from `K(K-1)/2` unconstrained values.
///
/// Each value becomes a canonical partial correlation `z = tanh(y)` in
/// (-1, 1); row `i` is filled left to right, scaling each CPC by the
/// remaining row mass `sqrt(1 - Σ L_ij²)`, and the diagonal takes what is
/// left, so every row has unit norm.
///
/// Returns `None` when `y` has the wrong length.
pub fn corr_cholesky_constrain(y: &[f64], k: usize) -> Option<(DMatrix<f64>, f64)> {
    if k == 0 || y.len() != corr_cholesky_free_dim(k) {
        return None;
    }
    let mut log_jacobian = 0.0;
    let mut l = DMatrix::zeros(k, k);
    l[(0, 0)] = 1.0;
    let mut idx = 0;
    for i in 1..k {
        let mut sum_sqs: f64 = 0.0;
        for j in 0..i {
            let z = y[idx].tanh();
            idx += 1;
            // d tanh / dy = 1 - z²
            log_jacobian += (-z * z).ln_1p();
            let value = if j == 0 {
                z
            } else {
                log_jacobian += 0.5 * (-sum_sqs).ln_1p();
                z * (1.0 - sum_sqs).sqrt()
            };
            l[(i, j)] = value;
            sum_sqs += value * value;
        }
        l[(i, i)] = (1.0 - sum_sqs).max(0.0).sqrt();
    }
    Some((l, log_jacobian))
}

/// Inverse of [`corr_cholesky_constrain`].
pub fn corr_cholesky_free(l: &DMatrix<f64>) -> Vec<f64> {
    let k = l.nrows();
    let mut y = Vec::with_capacity(corr_cholesky_free_dim(k));
    for i in 1..k {
        let mut sum_sqs: f64 = 0.0;
        for j in 0..i {
            let value = l[(i, j)];
            let z = if j == 0 {
                value
            } else {
                value / (1.0 - sum_sqs).sqrt()
            };
            y.push(z.atanh());
            sum_sqs += value * value;
        }
    }
    y
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::corr::is_corr_cholesky;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        if a.is_nan() || b.is_nan() {
            return false;
        }
        (a - b).abs() <= tol
    }

    #[test]
    fn lower_bound_round_trip() {
        let (x, lj) = lower_bound_constrain(0.4, 3.0);
        assert!(x > 3.0);
        assert!(approx_eq(lj, 0.4, 1e-15));
        assert!(approx_eq(lower_bound_free(x, 3.0), 0.4, 1e-12));
        assert!(lower_bound_free(3.0, 3.0).is_nan());
    }

    #[test]
    fn unit_interval_round_trip_and_jacobian() {
        for y in [-30.0, -2.0, 0.0, 1.5, 30.0] {
            let (x, lj) = unit_interval_constrain(y);
            assert!((0.0..=1.0).contains(&x));
            if y.abs() < 10.0 {
                assert!(approx_eq(unit_interval_free(x), y, 1e-10));
                let expected = (x * (1.0 - x)).ln();
                assert!(approx_eq(lj, expected, 1e-10));
            }
            assert!(lj.is_finite());
        }
    }

    #[test]
    fn unit_interval_free_endpoints() {
        assert_eq!(unit_interval_free(0.0), f64::NEG_INFINITY);
        assert_eq!(unit_interval_free(1.0), f64::INFINITY);
        assert!(unit_interval_free(1.5).is_nan());
    }

    #[test]
    fn corr_cholesky_zero_is_identity() {
        let (l, lj) = corr_cholesky_constrain(&[0.0, 0.0, 0.0], 3).unwrap();
        assert!((l - DMatrix::<f64>::identity(3, 3)).amax() < 1e-15);
        assert!(approx_eq(lj, 0.0, 1e-15));
    }

    #[test]
    fn corr_cholesky_is_valid_and_invertible() {
        let y = [0.3, -1.1, 0.7, 2.0, -0.4, 0.05];
        let (l, _) = corr_cholesky_constrain(&y, 4).unwrap();
        assert!(is_corr_cholesky(&l, 1e-12));
        let back = corr_cholesky_free(&l);
        assert_eq!(back.len(), y.len());
        for (a, b) in back.iter().zip(y.iter()) {
            assert!(approx_eq(*a, *b, 1e-9));
        }
    }

    #[test]
    fn corr_cholesky_jacobian_two_by_two() {
        // K = 2: L_10 = tanh(y), so log|J| = log(1 - tanh²(y)).
        let y = 0.8f64;
        let (_, lj) = corr_cholesky_constrain(&[y], 2).unwrap();
        assert!(approx_eq(lj, (1.0 - y.tanh().powi(2)).ln(), 1e-12));
    }

    #[test]
    fn corr_cholesky_rejects_wrong_length() {
        assert!(corr_cholesky_constrain(&[0.0], 3).is_none());
        assert!(corr_cholesky_constrain(&[], 0).is_none());
        let (l, lj) = corr_cholesky_constrain(&[], 1).unwrap();
        assert_eq!(l[(0, 0)], 1.0);
        assert_eq!(lj, 0.0);
    }
}
