//! Joint log density: priors plus the lapse-mixed multinomial likelihood.
//!
//! [`CategoryLearningModel`] owns validated data and evaluates the density of
//! a parameter draw either on the constrained scale ([`CategoryLearningModel::evaluate`])
//! or on the unconstrained scale through the [`LogDensity`] trait, which is
//! the surface an external sampler drives.

use crate::data::ModelData;
use crate::hyper::Hyperparameters;
use crate::params::{ModelParams, ParamError, ParameterLayout};
use crate::predictive::{trial_probabilities, TrialProbabilities};
use crate::update::{compute_beliefs, Beliefs};
use cl_math::{
    diag_pre_multiply, half_cauchy_lpdf, half_normal_lpdf, lkj_corr_cholesky_lpdf,
    multi_normal_cholesky_lpdf, multinomial,
};
use nalgebra::DVector;
use rand::Rng;
use serde::Serialize;
use thiserror::Error;

/// Errors raised while evaluating the density of one draw.
///
/// Any of these means the draw must be rejected; none is retried.
#[derive(Debug, Error)]
pub enum DensityError {
    #[error(transparent)]
    Parameter(#[from] ParamError),

    #[error("numerical degeneracy: {0}")]
    Degenerate(String),

    #[error("non-finite value in {quantity}")]
    NonFinite { quantity: String },
}

impl From<DensityError> for cl_common::Error {
    fn from(err: DensityError) -> Self {
        match err {
            DensityError::Parameter(e) => e.into(),
            DensityError::Degenerate(msg) => cl_common::Error::NumericalDegeneracy(msg),
            DensityError::NonFinite { quantity } => cl_common::Error::NonFinite { quantity },
        }
    }
}

/// Prior contributions, summed over categories where a term repeats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriorTerms {
    pub kappa_0: f64,
    pub nu_0: f64,
    pub m_0_tau: f64,
    #[serde(rename = "m_0_L_omega")]
    pub m_0_l_omega: f64,
    pub m_0: f64,
    pub tau_0: f64,
    #[serde(rename = "L_omega_0")]
    pub l_omega_0: f64,
}

impl PriorTerms {
    pub fn total(&self) -> f64 {
        self.kappa_0
            + self.nu_0
            + self.m_0_tau
            + self.m_0_l_omega
            + self.m_0
            + self.tau_0
            + self.l_omega_0
    }

    fn named(&self) -> [(&'static str, f64); 7] {
        [
            ("kappa_0", self.kappa_0),
            ("nu_0", self.nu_0),
            ("m_0_tau", self.m_0_tau),
            ("m_0_L_omega", self.m_0_l_omega),
            ("m_0", self.m_0),
            ("tau_0", self.tau_0),
            ("L_omega_0", self.l_omega_0),
        ]
    }
}

/// Evaluate every prior term.
pub fn prior_terms(params: &ModelParams, hyper: &Hyperparameters) -> PriorTerms {
    let tau_scale = hyper.tau_scale;
    let eta = hyper.l_omega_scale;
    let half_cauchy_sum =
        |v: &DVector<f64>| -> f64 { v.iter().map(|&t| half_cauchy_lpdf(t, tau_scale)).sum() };

    let m_0_chol = diag_pre_multiply(&params.m_0_tau, params.m_0_l_omega.factor());
    let zero = DVector::zeros(params.m_0_tau.len());

    PriorTerms {
        kappa_0: half_normal_lpdf(params.kappa_0, hyper.sigma_kappanu),
        nu_0: half_normal_lpdf(params.nu_0, hyper.sigma_kappanu),
        m_0_tau: half_cauchy_sum(&params.m_0_tau),
        m_0_l_omega: lkj_corr_cholesky_lpdf(params.m_0_l_omega.factor(), eta),
        m_0: params
            .m_0
            .iter()
            .map(|m| multi_normal_cholesky_lpdf(m, &zero, &m_0_chol))
            .sum(),
        tau_0: params.tau_0.iter().map(half_cauchy_sum).sum(),
        l_omega_0: params
            .l_omega_0
            .iter()
            .map(|l| lkj_corr_cholesky_lpdf(l.factor(), eta))
            .sum(),
    }
}

/// Multinomial log-likelihood of one trial's response counts.
///
/// `tol` is the allowed slack on the sum of `p_effective`.
pub fn trial_log_likelihood(counts: &[u64], p_effective: &[f64], tol: f64) -> f64 {
    multinomial::log_pmf_with_tolerance(counts, p_effective, tol)
}

/// Per-term view of one density evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DensityBreakdown {
    pub priors: PriorTerms,
    pub log_prior: f64,
    /// One entry per test trial.
    pub log_likelihood: Vec<f64>,
    pub total_log_likelihood: f64,
    /// log prior + log likelihood on the constrained scale.
    pub log_density: f64,
}

/// A log density over an unconstrained parameter vector.
///
/// Implementations are pure: no interior mutability and no I/O, so a single
/// value may be shared across threads running independent chains.
pub trait LogDensity: Send + Sync {
    /// Length of the unconstrained vector.
    fn dim(&self) -> usize;

    /// One name per coordinate.
    fn parameter_names(&self) -> Vec<String>;

    /// Log density at `theta`, including the log-Jacobian of the transform.
    fn log_density(&self, theta: &[f64]) -> Result<f64, DensityError>;

    /// Draw a starting point uniformly from (-2, 2) in every coordinate.
    fn init_position<R: Rng + ?Sized>(&self, rng: &mut R, position: &mut [f64])
    where
        Self: Sized,
    {
        for x in position.iter_mut() {
            *x = rng.random_range(-2.0..2.0);
        }
    }
}

/// The hierarchical category-learning model bound to one data set.
#[derive(Debug, Clone)]
pub struct CategoryLearningModel {
    data: ModelData,
    layout: ParameterLayout,
}

impl CategoryLearningModel {
    pub fn new(data: ModelData) -> Self {
        let layout = ParameterLayout::new(data.num_categories(), data.dim());
        Self { data, layout }
    }

    pub fn data(&self) -> &ModelData {
        &self.data
    }

    pub fn layout(&self) -> &ParameterLayout {
        &self.layout
    }

    fn check(&self, params: &ModelParams) -> Result<(), DensityError> {
        params.validate(self.data.num_categories(), self.data.dim())?;
        Ok(())
    }

    /// Posterior and predictive for every cell.
    pub fn beliefs(&self, params: &ModelParams) -> Result<Beliefs, DensityError> {
        self.check(params)?;
        compute_beliefs(&self.data, params)
    }

    /// Conjugate and lapse-mixed category probabilities for every trial.
    pub fn category_probabilities(
        &self,
        params: &ModelParams,
    ) -> Result<Vec<TrialProbabilities>, DensityError> {
        let beliefs = self.beliefs(params)?;
        trial_probabilities(&self.data, &beliefs, params.lapse_rate)
    }

    /// Full density evaluation on the constrained scale.
    pub fn evaluate(&self, params: &ModelParams) -> Result<DensityBreakdown, DensityError> {
        let probabilities = self.category_probabilities(params)?;

        let priors = prior_terms(params, self.data.hyper());
        for (name, value) in priors.named() {
            if !value.is_finite() {
                return Err(DensityError::NonFinite {
                    quantity: format!("prior on {}", name),
                });
            }
        }
        let log_prior = priors.total();

        let mut log_likelihood = Vec::with_capacity(probabilities.len());
        for (trial, probs) in self.data.trials().iter().zip(&probabilities) {
            let ll = trial_log_likelihood(
                &trial.counts,
                &probs.p_effective,
                self.data.simplex_tolerance(),
            );
            if !ll.is_finite() {
                return Err(DensityError::NonFinite {
                    quantity: format!("log-likelihood of trial {}", probs.trial),
                });
            }
            log_likelihood.push(ll);
        }
        let total_log_likelihood: f64 = log_likelihood.iter().sum();
        let log_density = log_prior + total_log_likelihood;
        if !log_density.is_finite() {
            return Err(DensityError::NonFinite {
                quantity: "log density".to_string(),
            });
        }

        tracing::trace!(log_prior, total_log_likelihood, log_density, "density evaluated");

        Ok(DensityBreakdown {
            priors,
            log_prior,
            log_likelihood,
            total_log_likelihood,
            log_density,
        })
    }
}

impl LogDensity for CategoryLearningModel {
    fn dim(&self) -> usize {
        self.layout.dim()
    }

    fn parameter_names(&self) -> Vec<String> {
        self.layout.names()
    }

    fn log_density(&self, theta: &[f64]) -> Result<f64, DensityError> {
        let (params, log_jacobian) = self.layout.constrain(theta)?;
        let breakdown = self.evaluate(&params)?;
        let total = breakdown.log_density + log_jacobian;
        if !total.is_finite() {
            return Err(DensityError::NonFinite {
                quantity: "log-Jacobian".to_string(),
            });
        }
        Ok(total)
    }
}
