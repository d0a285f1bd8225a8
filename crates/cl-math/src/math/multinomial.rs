//! Multinomial likelihood for repeated categorical responses.
//!
//! For counts `z = (z_1..z_M)` with `n = Σ z_i` and probabilities `p`:
//!
//! ```text
//! log P(z | p) = log n! - Σ_i log z_i! + Σ_i z_i log p_i
//! ```
//!
//! Categories with `z_i = 0` contribute nothing, so a zero probability is
//! only fatal (-inf) for a category that was actually observed.

use super::stable::log_factorial;

/// Absolute slack allowed when checking that `probs` sums to one.
pub const SIMPLEX_TOLERANCE: f64 = 1e-9;

/// Log of the multinomial coefficient n! / Π z_i!.
pub fn log_multinomial_coefficient(counts: &[u64]) -> f64 {
    let total: u64 = counts.iter().sum();
    log_factorial(total) - counts.iter().map(|&c| log_factorial(c)).sum::<f64>()
}

/// Log probability mass of `counts` under Multinomial(Σ counts, probs).
///
/// Returns NaN when the lengths differ, the input is empty, or `probs` is not
/// a simplex within [`SIMPLEX_TOLERANCE`].
pub fn log_pmf(counts: &[u64], probs: &[f64]) -> f64 {
    log_pmf_with_tolerance(counts, probs, SIMPLEX_TOLERANCE)
}

/// [`log_pmf`] with a caller-chosen slack on the simplex sum.
pub fn log_pmf_with_tolerance(counts: &[u64], probs: &[f64], tol: f64) -> f64 {
    if counts.is_empty() || counts.len() != probs.len() {
        return f64::NAN;
    }
    if !is_simplex(probs, tol) {
        return f64::NAN;
    }

    let mut lp = log_multinomial_coefficient(counts);
    for (&z, &p) in counts.iter().zip(probs) {
        if z == 0 {
            continue;
        }
        if p == 0.0 {
            return f64::NEG_INFINITY;
        }
        lp += (z as f64) * p.ln();
    }
    lp
}

/// Log pmf under the uniform categorical distribution over `counts.len()` outcomes.
pub fn log_pmf_uniform(counts: &[u64]) -> f64 {
    if counts.is_empty() {
        return f64::NAN;
    }
    let total: u64 = counts.iter().sum();
    log_multinomial_coefficient(counts) - (total as f64) * (counts.len() as f64).ln()
}

/// True when every entry is finite and non-negative and the sum is within `tol` of one.
pub fn is_simplex(probs: &[f64], tol: f64) -> bool {
    if probs.is_empty() {
        return false;
    }
    if probs.iter().any(|p| !p.is_finite() || *p < 0.0) {
        return false;
    }
    let sum: f64 = probs.iter().sum();
    (sum - 1.0).abs() <= tol
}
