//! Data-derived hyperparameters.
//!
//! These are fixed once the data contract is loaded and shared, read-only,
//! by every density evaluation.

use cl_config::{KappaNuPrior, Settings};
use serde::Serialize;

/// Immutable hyperparameters passed into the prior terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Hyperparameters {
    /// Half-normal scale on `kappa_0` and `nu_0`.
    pub sigma_kappanu: f64,
    /// Half-Cauchy scale on `m_0_tau` and `tau_0`.
    pub tau_scale: f64,
    /// LKJ concentration on `m_0_L_omega` and `L_omega_0`.
    pub l_omega_scale: f64,
}

impl Hyperparameters {
    /// Derive hyperparameters from the learning-phase counts and the
    /// scales requested by the data file (0 selects the configured default).
    pub fn derive(
        counts: &[u64],
        requested_tau_scale: f64,
        requested_l_omega_scale: f64,
        settings: &Settings,
    ) -> Self {
        Self {
            sigma_kappanu: sigma_kappanu(counts, &settings.kappa_nu_prior),
            tau_scale: settings.effective_tau_scale(requested_tau_scale),
            l_omega_scale: settings.effective_l_omega_scale(requested_l_omega_scale),
        }
    }
}

/// Scale of the half-normal prior on the pseudocounts.
///
/// Ties the prior to the amount of data actually seen: a multiple of the
/// largest per-cell count, or a fixed floor when every cell is empty.
pub fn sigma_kappanu(counts: &[u64], rule: &KappaNuPrior) -> f64 {
    let max_n = counts.iter().copied().max().unwrap_or(0);
    if max_n > 0 {
        rule.count_multiplier * max_n as f64
    } else {
        rule.empty_floor
    }
}
