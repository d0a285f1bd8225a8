//! Category probabilities for test trials.
//!
//! For each trial the subject's predictive Student-t is evaluated under every
//! category and the log densities are normalized with log-sum-exp. The lapse
//! mixture then blends that simplex with the uniform distribution.

use crate::data::ModelData;
use crate::density::DensityError;
use crate::update::{Beliefs, PredictiveScale};
use cl_math::{multi_student_t_cholesky_lpdf, normalize_log_probs};
use nalgebra::DVector;
use serde::Serialize;

/// Probabilities of one test trial.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialProbabilities {
    /// 1-based.
    pub trial: usize,
    /// 1-based.
    pub subject: usize,
    /// Predictive log density of the stimulus under each category.
    pub log_predictive: Vec<f64>,
    /// Normalized conjugate probabilities.
    pub p_test_conj: Vec<f64>,
    /// Lapse-mixed probabilities fed to the multinomial.
    pub p_effective: Vec<f64>,
}

/// Log density of `x` under each category's predictive.
pub fn category_log_densities<'a>(
    x: &DVector<f64>,
    predictives: impl IntoIterator<Item = &'a PredictiveScale>,
) -> Vec<f64> {
    predictives
        .into_iter()
        .map(|p| multi_student_t_cholesky_lpdf(x, p.df, &p.location, &p.cholesky))
        .collect()
}

/// p · (1 − λ) + λ / M.
pub fn apply_lapse(probs: &[f64], lapse_rate: f64) -> Vec<f64> {
    let uniform = lapse_rate / probs.len() as f64;
    probs
        .iter()
        .map(|p| p * (1.0 - lapse_rate) + uniform)
        .collect()
}

/// Probabilities for every test trial.
pub fn trial_probabilities(
    data: &ModelData,
    beliefs: &Beliefs,
    lapse_rate: f64,
) -> Result<Vec<TrialProbabilities>, DensityError> {
    let m = data.num_categories();
    data.trials()
        .iter()
        .enumerate()
        .map(|(j, trial)| {
            let log_predictive = category_log_densities(
                &trial.x,
                (0..m).map(|c| &beliefs.get(c, trial.subject).predictive),
            );
            if let Some(c) = log_predictive.iter().position(|v| v.is_nan()) {
                return Err(DensityError::NonFinite {
                    quantity: format!(
                        "predictive density of trial {} under category {}",
                        j + 1,
                        c + 1
                    ),
                });
            }
            let p_test_conj = match normalize_log_probs(&log_predictive) {
                Some(p) => p,
                // A full lapse ignores the stimulus, so an underflowed
                // predictive cannot change the likelihood.
                None if lapse_rate >= 1.0 => vec![1.0 / m as f64; m],
                None => {
                    return Err(DensityError::NonFinite {
                        quantity: format!("category probabilities of trial {}", j + 1),
                    })
                }
            };
            let p_effective = apply_lapse(&p_test_conj, lapse_rate);
            Ok(TrialProbabilities {
                trial: j + 1,
                subject: trial.subject + 1,
                log_predictive,
                p_test_conj,
                p_effective,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        if a.is_nan() || b.is_nan() {
            return false;
        }
        (a - b).abs() <= tol
    }

    fn predictive(location: f64, scale: f64) -> PredictiveScale {
        PredictiveScale {
            df: 5.0,
            location: DVector::from_vec(vec![location]),
            scale: DMatrix::from_element(1, 1, scale * scale),
            cholesky: DMatrix::from_element(1, 1, scale),
        }
    }

    #[test]
    fn nearer_category_scores_higher() {
        let preds = [predictive(0.0, 1.0), predictive(4.0, 1.0)];
        let x = DVector::from_vec(vec![0.5]);
        let lp = category_log_densities(&x, preds.iter());
        assert!(lp[0] > lp[1]);
        let probs = normalize_log_probs(&lp).unwrap();
        assert!(approx_eq(probs.iter().sum::<f64>(), 1.0, 1e-12));
    }

    #[test]
    fn zero_lapse_is_identity() {
        let p = vec![0.2, 0.7, 0.1];
        assert_eq!(apply_lapse(&p, 0.0), p);
    }

    #[test]
    fn full_lapse_is_uniform() {
        let p = vec![0.2, 0.7, 0.1];
        for q in apply_lapse(&p, 1.0) {
            assert_eq!(q, 1.0 / 3.0);
        }
    }

    #[test]
    fn partial_lapse_stays_on_simplex() {
        let p = vec![1.0, 0.0];
        let q = apply_lapse(&p, 0.2);
        assert!(approx_eq(q[0], 0.9, 1e-15));
        assert!(approx_eq(q[1], 0.1, 1e-15));
    }
}
