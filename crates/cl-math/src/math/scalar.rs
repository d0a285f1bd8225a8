//! Univariate log-densities used as priors on scale and pseudocount parameters.
//!
//! All functions follow the crate convention: NaN for invalid distribution
//! parameters, NEG_INFINITY for a point outside the support.

use super::stable::{LOG_PI, LOG_SQRT_2PI};
use std::f64::consts::LN_2;

/// Log of the Normal(mu, sigma) density at x.
pub fn normal_lpdf(x: f64, mu: f64, sigma: f64) -> f64 {
    if x.is_nan() || mu.is_nan() || sigma.is_nan() || sigma <= 0.0 || sigma.is_infinite() {
        return f64::NAN;
    }
    let z = (x - mu) / sigma;
    -0.5 * z * z - sigma.ln() - LOG_SQRT_2PI
}

/// Log of the half-normal density with scale sigma, supported on [0, inf).
pub fn half_normal_lpdf(x: f64, sigma: f64) -> f64 {
    let lp = normal_lpdf(x, 0.0, sigma);
    if lp.is_nan() {
        return f64::NAN;
    }
    if x < 0.0 {
        return f64::NEG_INFINITY;
    }
    LN_2 + lp
}

/// Log of the Cauchy(location, scale) density at x.
pub fn cauchy_lpdf(x: f64, location: f64, scale: f64) -> f64 {
    if x.is_nan() || location.is_nan() || scale.is_nan() || scale <= 0.0 || scale.is_infinite() {
        return f64::NAN;
    }
    let z = (x - location) / scale;
    -LOG_PI - scale.ln() - (z * z).ln_1p()
}

/// Log of the half-Cauchy density with the given scale, supported on [0, inf).
pub fn half_cauchy_lpdf(x: f64, scale: f64) -> f64 {
    let lp = cauchy_lpdf(x, 0.0, scale);
    if lp.is_nan() {
        return f64::NAN;
    }
    if x < 0.0 {
        return f64::NEG_INFINITY;
    }
    LN_2 + lp
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        if a.is_nan() || b.is_nan() {
            return false;
        }
        (a - b).abs() <= tol
    }

    #[test]
    fn standard_normal_at_zero() {
        let lp = normal_lpdf(0.0, 0.0, 1.0);
        assert!(approx_eq(lp, -LOG_SQRT_2PI, 1e-12));
    }

    #[test]
    fn half_normal_is_twice_normal_on_support() {
        let x = 1.7;
        let sigma = 3.0;
        let diff = half_normal_lpdf(x, sigma) - normal_lpdf(x, 0.0, sigma);
        assert!(approx_eq(diff, LN_2, 1e-12));
    }

    #[test]
    fn half_densities_reject_negative_support() {
        assert_eq!(half_normal_lpdf(-0.1, 1.0), f64::NEG_INFINITY);
        assert_eq!(half_cauchy_lpdf(-0.1, 1.0), f64::NEG_INFINITY);
    }

    #[test]
    fn cauchy_known_value() {
        // Cauchy(0, 1) at x = 1: 1 / (2 pi)
        let lp = cauchy_lpdf(1.0, 0.0, 1.0);
        assert!(approx_eq(lp, -(2.0 * std::f64::consts::PI).ln(), 1e-12));
    }

    #[test]
    fn invalid_scales_are_nan() {
        assert!(normal_lpdf(0.0, 0.0, 0.0).is_nan());
        assert!(half_normal_lpdf(1.0, -1.0).is_nan());
        assert!(cauchy_lpdf(0.0, 0.0, f64::INFINITY).is_nan());
        assert!(half_cauchy_lpdf(f64::NAN, 1.0).is_nan());
    }

    #[test]
    fn half_cauchy_decreases_away_from_zero() {
        let near = half_cauchy_lpdf(0.5, 10.0);
        let far = half_cauchy_lpdf(50.0, 10.0);
        assert!(near > far);
    }
}
