//! Conjugate Normal-Inverse-Wishart belief update.
//!
//! Each category's prior is `NIW(m₀, κ₀, S₀, ν₀)` with `S₀ = D·R·D`. Each
//! subject's learning-phase statistics update it in closed form; the
//! posterior predictive is a multivariate Student-t. Everything here is
//! recomputed from scratch on every evaluation.

use crate::data::{ModelData, SufficientStatistics};
use crate::density::DensityError;
use crate::matrix::{serialize_matrix, serialize_vector};
use crate::params::{CorrCholesky, ModelParams};
use cl_math::{cholesky_lower, quad_form_diag};
use nalgebra::{DMatrix, DVector};
use serde::Serialize;

/// Shared prior for one category. Immutable input to [`niw_update`].
#[derive(Debug, Clone, PartialEq)]
pub struct NiwPrior {
    pub kappa_0: f64,
    pub nu_0: f64,
    pub m_0: DVector<f64>,
    pub s_0: DMatrix<f64>,
}

impl NiwPrior {
    /// Prior of `category` (0-based) under a parameter draw.
    pub fn for_category(params: &ModelParams, category: usize) -> Self {
        Self {
            kappa_0: params.kappa_0,
            nu_0: params.nu_0,
            m_0: params.m_0[category].clone(),
            s_0: prior_scale_matrix(&params.tau_0[category], &params.l_omega_0[category]),
        }
    }
}

/// S₀ = diag(τ) · L Lᵀ · diag(τ).
pub fn prior_scale_matrix(tau: &DVector<f64>, l_omega: &CorrCholesky) -> DMatrix<f64> {
    quad_form_diag(&l_omega.correlation(), tau)
}

/// NIW posterior of one (category, subject) cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PosteriorState {
    pub kappa_n: f64,
    pub nu_n: f64,
    #[serde(serialize_with = "serialize_vector")]
    pub m_n: DVector<f64>,
    #[serde(serialize_with = "serialize_matrix")]
    pub s_n: DMatrix<f64>,
}

/// Parameters of the posterior predictive Student-t.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictiveScale {
    /// Degrees of freedom νₙ − K + 1.
    pub df: f64,
    #[serde(serialize_with = "serialize_vector")]
    pub location: DVector<f64>,
    #[serde(serialize_with = "serialize_matrix")]
    pub scale: DMatrix<f64>,
    /// Lower Cholesky factor of `scale`.
    #[serde(skip)]
    pub cholesky: DMatrix<f64>,
}

/// Closed-form NIW update.
///
/// An empty cell returns the prior unchanged. No definiteness check happens
/// here; that is the job of [`PosteriorState::predictive`].
pub fn niw_update(prior: &NiwPrior, stats: &SufficientStatistics) -> PosteriorState {
    if stats.count == 0 {
        return PosteriorState {
            kappa_n: prior.kappa_0,
            nu_n: prior.nu_0,
            m_n: prior.m_0.clone(),
            s_n: prior.s_0.clone(),
        };
    }
    let n = stats.count as f64;
    let kappa_n = prior.kappa_0 + n;
    let nu_n = prior.nu_0 + n;
    let m_n = (prior.kappa_0 * &prior.m_0 + n * &stats.mean) / kappa_n;
    let s_n = &prior.s_0 + &stats.sum_squares
        + prior.kappa_0 * &prior.m_0 * prior.m_0.transpose()
        - kappa_n * &m_n * m_n.transpose();
    PosteriorState {
        kappa_n,
        nu_n,
        m_n,
        s_n,
    }
}

impl PosteriorState {
    pub fn dim(&self) -> usize {
        self.m_n.len()
    }

    /// νₙ − K + 1.
    pub fn predictive_df(&self) -> f64 {
        self.nu_n - self.dim() as f64 + 1.0
    }

    /// Student-t predictive with scale Sₙ (κₙ + 1) / (κₙ (νₙ − K + 1)).
    pub fn predictive(&self) -> Result<PredictiveScale, DensityError> {
        let df = self.predictive_df();
        if df.is_nan() || df <= 0.0 {
            return Err(DensityError::Degenerate(format!(
                "predictive degrees of freedom nu_n - K + 1 = {} must be positive",
                df
            )));
        }
        let factor = (self.kappa_n + 1.0) / (self.kappa_n * df);
        let scale = &self.s_n * factor;
        let cholesky = cholesky_lower(&scale).ok_or_else(|| {
            DensityError::Degenerate("predictive scale is not symmetric positive definite".into())
        })?;
        Ok(PredictiveScale {
            df,
            location: self.m_n.clone(),
            scale,
            cholesky,
        })
    }
}

/// Posterior and predictive of one cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellBelief {
    /// 1-based.
    pub category: usize,
    /// 1-based.
    pub subject: usize,
    pub posterior: PosteriorState,
    pub predictive: PredictiveScale,
}

/// Beliefs for every (category, subject) cell, row-major M×L.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Beliefs {
    pub num_categories: usize,
    pub num_subjects: usize,
    pub cells: Vec<CellBelief>,
}

impl Beliefs {
    /// Cell for a 0-based (category, subject).
    pub fn get(&self, category: usize, subject: usize) -> &CellBelief {
        &self.cells[category * self.num_subjects + subject]
    }
}

/// Run the update for every cell. Parameters must already be validated
/// against the data's M and K.
pub fn compute_beliefs(data: &ModelData, params: &ModelParams) -> Result<Beliefs, DensityError> {
    let m = data.num_categories();
    let l = data.num_subjects();
    let mut cells = Vec::with_capacity(m * l);
    for c in 0..m {
        let prior = NiwPrior::for_category(params, c);
        for s in 0..l {
            let posterior = niw_update(&prior, data.stats(c, s));
            let predictive = posterior.predictive().map_err(|e| match e {
                DensityError::Degenerate(msg) => DensityError::Degenerate(format!(
                    "category {}, subject {}: {}",
                    c + 1,
                    s + 1,
                    msg
                )),
                other => other,
            })?;
            cells.push(CellBelief {
                category: c + 1,
                subject: s + 1,
                posterior,
                predictive,
            });
        }
    }
    Ok(Beliefs {
        num_categories: m,
        num_subjects: l,
        cells,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cl_math::min_eigenvalue;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        if a.is_nan() || b.is_nan() {
            return false;
        }
        (a - b).abs() <= tol
    }

    fn scalar_prior() -> NiwPrior {
        NiwPrior {
            kappa_0: 2.0,
            nu_0: 3.0,
            m_0: DVector::from_vec(vec![1.0]),
            s_0: DMatrix::from_element(1, 1, 4.0),
        }
    }

    fn scalar_stats(count: u64, mean: f64, scatter: f64) -> SufficientStatistics {
        SufficientStatistics {
            count,
            mean: DVector::from_vec(vec![mean]),
            sum_squares: DMatrix::from_element(1, 1, scatter + count as f64 * mean * mean),
        }
    }

    #[test]
    fn empty_cell_returns_prior_exactly() {
        let prior = scalar_prior();
        let post = niw_update(&prior, &SufficientStatistics::empty(1));
        assert_eq!(post.kappa_n, prior.kappa_0);
        assert_eq!(post.nu_n, prior.nu_0);
        assert_eq!(post.m_n, prior.m_0);
        assert_eq!(post.s_n, prior.s_0);
    }

    #[test]
    fn populated_cell_matches_closed_form() {
        // Scenario: N = 10, mean 5, zero scatter, kappa_0 = 2, nu_0 = 3.
        let prior = scalar_prior();
        let post = niw_update(&prior, &scalar_stats(10, 5.0, 0.0));
        assert_eq!(post.kappa_n, 12.0);
        assert_eq!(post.nu_n, 13.0);
        let expected_m = (2.0 * 1.0 + 10.0 * 5.0) / 12.0;
        assert!(approx_eq(post.m_n[0], expected_m, 1e-12));
        assert!(post.m_n[0] > 1.0 && post.m_n[0] < 5.0);
        // S_n = S_0 + Σx² + κ₀m₀² − κₙmₙ² = 4 + 250 + 2 − 12·mₙ²
        let expected_s = 4.0 + 250.0 + 2.0 - 12.0 * expected_m * expected_m;
        assert!(approx_eq(post.s_n[(0, 0)], expected_s, 1e-9));
    }

    #[test]
    fn posterior_scatter_equals_centered_form() {
        // Sₙ = S₀ + C + κ₀N/κₙ (x̄ − m₀)(x̄ − m₀)ᵀ with C the centered scatter.
        let prior = scalar_prior();
        let post = niw_update(&prior, &scalar_stats(6, -2.0, 3.0));
        let shrink = 2.0 * 6.0 / 8.0;
        let expected = 4.0 + 3.0 + shrink * 9.0;
        assert!(approx_eq(post.s_n[(0, 0)], expected, 1e-9));
    }

    #[test]
    fn predictive_scale_formula() {
        let post = PosteriorState {
            kappa_n: 4.0,
            nu_n: 5.0,
            m_n: DVector::from_vec(vec![0.0, 1.0]),
            s_n: DMatrix::from_row_slice(2, 2, &[2.0, 0.5, 0.5, 1.0]),
        };
        let pred = post.predictive().unwrap();
        assert_eq!(pred.df, 4.0);
        let factor = 5.0 / (4.0 * 4.0);
        assert!(approx_eq(pred.scale[(0, 1)], 0.5 * factor, 1e-15));
        assert!(min_eigenvalue(&pred.scale) > 0.0);
        let rebuilt = &pred.cholesky * pred.cholesky.transpose();
        assert!((rebuilt - &pred.scale).amax() < 1e-12);
    }

    #[test]
    fn non_positive_df_is_degenerate() {
        let post = PosteriorState {
            kappa_n: 4.0,
            nu_n: 0.5,
            m_n: DVector::zeros(2),
            s_n: DMatrix::identity(2, 2),
        };
        assert!(matches!(post.predictive(), Err(DensityError::Degenerate(_))));
    }

    #[test]
    fn indefinite_scale_is_degenerate() {
        let post = PosteriorState {
            kappa_n: 4.0,
            nu_n: 5.0,
            m_n: DVector::zeros(2),
            s_n: DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]),
        };
        let err = post.predictive().unwrap_err();
        assert!(err.to_string().contains("positive definite"));
    }

    #[test]
    fn prior_scale_matrix_is_spd() {
        let r = DMatrix::from_row_slice(2, 2, &[1.0, 0.3, 0.3, 1.0]);
        let l = CorrCholesky::new(cl_math::corr_cholesky_from_matrix(&r).unwrap(), 1e-9).unwrap();
        let tau = DVector::from_vec(vec![2.0, 0.5]);
        let s0 = prior_scale_matrix(&tau, &l);
        assert!(approx_eq(s0[(0, 0)], 4.0, 1e-12));
        assert!(approx_eq(s0[(0, 1)], 0.3, 1e-12));
        assert!(approx_eq(s0[(1, 1)], 0.25, 1e-12));
        assert!(min_eigenvalue(&s0) > 0.0);
    }
}
