//! Multivariate Student-t density.
//!
//! This is the marginal predictive of a Normal-Inverse-Wishart posterior
//! after integrating out the unknown mean and covariance:
//!
//! ```text
//! log p(x) = lgamma((ν+K)/2) - lgamma(ν/2) - (K/2)·log(νπ) - ½·log|Σ|
//!            - ((ν+K)/2)·log(1 + (x-μ)ᵀ Σ⁻¹ (x-μ) / ν)
//! ```
//!
//! The scale Σ is passed as its lower Cholesky factor so callers control
//! (and report) the positive-definiteness check.

use super::mvn::whiten;
use super::stable::{log_gamma, LOG_PI};
use nalgebra::{DMatrix, DVector};

/// Log density of the multivariate Student-t with `nu` degrees of freedom,
/// location `mu` and scale `L Lᵀ`.
///
/// Returns NaN for `nu <= 0`, mismatched shapes, or a factor with a
/// non-positive diagonal.
pub fn multi_student_t_cholesky_lpdf(
    x: &DVector<f64>,
    nu: f64,
    mu: &DVector<f64>,
    l: &DMatrix<f64>,
) -> f64 {
    if nu.is_nan() || nu <= 0.0 || nu.is_infinite() {
        return f64::NAN;
    }
    let Some((z, half_log_det)) = whiten(x, mu, l) else {
        return f64::NAN;
    };
    let k = x.len() as f64;
    let half_df = 0.5 * (nu + k);
    log_gamma(half_df) - log_gamma(0.5 * nu) - 0.5 * k * (nu.ln() + LOG_PI)
        - half_log_det
        - half_df * (z.norm_squared() / nu).ln_1p()
}
