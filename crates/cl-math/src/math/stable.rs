//! Numerically stable primitives for log-domain density math.

use std::f64::consts::PI;

/// 0.5 * ln(2*pi)
pub const LOG_SQRT_2PI: f64 = 0.918_938_533_204_672_8;
/// ln(pi)
pub const LOG_PI: f64 = 1.144_729_885_849_400_2;

const LANCZOS_G: f64 = 7.0;
#[allow(clippy::excessive_precision)] // These are published numerical constants
const LANCZOS_COEFFS: [f64; 9] = [
    0.999_999_999_999_809_93,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_59,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_571_6e-6,
    1.505_632_735_149_311_6e-7,
];

/// Stable log(sum(exp(values))).
///
/// Returns NEG_INFINITY for empty input or all -inf inputs.
pub fn log_sum_exp(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NEG_INFINITY;
    }
    if values.iter().any(|v| v.is_nan()) {
        return f64::NAN;
    }
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    if max == f64::INFINITY {
        return f64::INFINITY;
    }
    let sum: f64 = values.iter().map(|v| (v - max).exp()).sum();
    max + sum.ln()
}

/// Turn unnormalized log weights into a probability simplex.
///
/// Subtracts the log-sum-exp before exponentiating, so weights far below
/// the representable range of `exp` still normalize correctly. Returns
/// `None` when the normalizer is not finite (empty input, all -inf, NaN or +inf).
pub fn normalize_log_probs(log_weights: &[f64]) -> Option<Vec<f64>> {
    let lse = log_sum_exp(log_weights);
    if !lse.is_finite() {
        return None;
    }
    Some(log_weights.iter().map(|w| (w - lse).exp()).collect())
}

/// Stable log(1 + exp(x)).
pub fn softplus(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    if x > 0.0 {
        x + (-x).exp().ln_1p()
    } else {
        x.exp().ln_1p()
    }
}

/// Natural log of the Gamma function (log |Gamma(z)|).
///
/// Uses a Lanczos approximation with reflection for z < 0.5.
pub fn log_gamma(z: f64) -> f64 {
    if z.is_nan() {
        return f64::NAN;
    }
    if z == f64::INFINITY {
        return f64::INFINITY;
    }
    if z == f64::NEG_INFINITY {
        return f64::NAN;
    }
    if z <= 0.0 && (z - z.round()).abs() < 1e-15 {
        return f64::NAN;
    }
    if z < 0.5 {
        let sin_pi = (PI * z).sin();
        if sin_pi == 0.0 {
            return f64::NAN;
        }
        return LOG_PI - sin_pi.abs().ln() - log_gamma(1.0 - z);
    }

    let z_minus = z - 1.0;
    let mut x = LANCZOS_COEFFS[0];
    for (i, coeff) in LANCZOS_COEFFS.iter().enumerate().skip(1) {
        x += coeff / (z_minus + i as f64);
    }
    let t = z_minus + LANCZOS_G + 0.5;
    LOG_SQRT_2PI + (z_minus + 0.5) * t.ln() - t + x.ln()
}

/// log(n!) using the Gamma function.
pub fn log_factorial(n: u64) -> f64 {
    if n <= 1 {
        return 0.0;
    }
    log_gamma((n as f64) + 1.0)
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
    fn log_sum_exp_basic() {
        let out = log_sum_exp(&[0.0, 0.0]);
        assert!(approx_eq(out, 2.0f64.ln(), 1e-12));
    }

    #[test]
    fn log_sum_exp_dominance() {
        let out = log_sum_exp(&[-1000.0, 0.0]);
        assert!(approx_eq(out, 0.0, 1e-12));
    }

    #[test]
    fn log_sum_exp_all_neg_inf() {
        let out = log_sum_exp(&[f64::NEG_INFINITY, f64::NEG_INFINITY]);
        assert!(out.is_infinite() && out.is_sign_negative());
    }

    #[test]
    fn log_sum_exp_nan_propagates() {
        assert!(log_sum_exp(&[0.0, f64::NAN]).is_nan());
    }

    #[test]
    fn normalize_handles_tiny_log_weights() {
        // exp(-2000) underflows to zero; the normalized simplex must not.
        let probs = normalize_log_probs(&[-2000.0, -2000.0 + 2.0f64.ln()]).unwrap();
        assert!(approx_eq(probs[0], 1.0 / 3.0, 1e-12));
        assert!(approx_eq(probs[1], 2.0 / 3.0, 1e-12));
    }

    #[test]
    fn normalize_rejects_degenerate_input() {
        assert!(normalize_log_probs(&[]).is_none());
        assert!(normalize_log_probs(&[f64::NEG_INFINITY]).is_none());
        assert!(normalize_log_probs(&[0.0, f64::NAN]).is_none());
    }

    #[test]
    fn softplus_matches_naive_in_safe_range() {
        for x in [-5.0, -0.3, 0.0, 0.7, 4.0] {
            let naive = (1.0 + f64::exp(x)).ln();
            assert!(approx_eq(softplus(x), naive, 1e-12));
        }
        assert!(approx_eq(softplus(800.0), 800.0, 1e-12));
        assert!(softplus(-800.0) >= 0.0);
    }

    #[test]
    fn log_gamma_known_values() {
        assert!(approx_eq(log_gamma(1.0), 0.0, 1e-12));
        assert!(approx_eq(log_gamma(0.5), 0.5 * PI.ln(), 1e-10));
        assert!(approx_eq(log_gamma(5.0), 24.0f64.ln(), 1e-10));
    }

    #[test]
    fn log_factorial_small_values() {
        assert!(approx_eq(log_factorial(0), 0.0, 1e-12));
        assert!(approx_eq(log_factorial(5), 120.0f64.ln(), 1e-12));
    }

    #[test]
    fn log_gamma_negative_integer_is_nan() {
        assert!(log_gamma(-2.0).is_nan());
    }
}
