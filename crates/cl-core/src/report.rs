//! Post hoc reporting of a parameter draw.
//!
//! Reconstructs the population correlation and covariance of `m_0` and the
//! per-category prior scale matrices. Nothing here feeds back into the
//! density.

use crate::density::DensityError;
use crate::matrix::{serialize_matrices, serialize_matrix, serialize_vector};
use crate::params::ModelParams;
use crate::update::prior_scale_matrix;
use cl_math::{corr_cholesky_from_matrix, decompose_covariance, quad_form_diag};
use nalgebra::{DMatrix, DVector};
use serde::Serialize;

/// Derived matrices for one draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawReport {
    /// m_0_L_omega · m_0_L_omegaᵀ.
    #[serde(serialize_with = "serialize_matrix")]
    pub m_0_cor: DMatrix<f64>,
    /// diag(m_0_tau) · m_0_cor · diag(m_0_tau).
    #[serde(serialize_with = "serialize_matrix")]
    pub m_0_cov: DMatrix<f64>,
    /// Per-category S₀.
    #[serde(rename = "S_0", serialize_with = "serialize_matrices")]
    pub s_0: Vec<DMatrix<f64>>,
}

/// Report matrices for one draw.
pub fn report_draw(params: &ModelParams) -> DrawReport {
    let m_0_cor = params.m_0_l_omega.correlation();
    let m_0_cov = quad_form_diag(&m_0_cor, &params.m_0_tau);
    let s_0 = params
        .tau_0
        .iter()
        .zip(&params.l_omega_0)
        .map(|(tau, l)| prior_scale_matrix(tau, l))
        .collect();
    DrawReport {
        m_0_cor,
        m_0_cov,
        s_0,
    }
}

/// Scale vector, correlation matrix, and correlation Cholesky factor of a
/// covariance matrix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CovarianceParts {
    #[serde(serialize_with = "serialize_vector")]
    pub tau: DVector<f64>,
    #[serde(serialize_with = "serialize_matrix")]
    pub correlation: DMatrix<f64>,
    #[serde(serialize_with = "serialize_matrix")]
    pub cholesky: DMatrix<f64>,
}

/// Inverse of the reporting transform: recover (τ, R, L) from a covariance.
pub fn decompose(cov: &DMatrix<f64>) -> Result<CovarianceParts, DensityError> {
    let (tau, correlation) = decompose_covariance(cov).ok_or_else(|| {
        DensityError::Degenerate("covariance must be square with a positive diagonal".into())
    })?;
    let cholesky = corr_cholesky_from_matrix(&correlation).ok_or_else(|| {
        DensityError::Degenerate("correlation matrix is not positive definite".into())
    })?;
    Ok(CovarianceParts {
        tau,
        correlation,
        cholesky,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::CorrCholesky;

    fn factor(r: f64) -> CorrCholesky {
        let l = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, r, (1.0 - r * r).sqrt()]);
        CorrCholesky::new(l, 1e-12).unwrap()
    }

    fn params() -> ModelParams {
        ModelParams {
            kappa_0: 3.0,
            nu_0: 3.0,
            m_0: vec![DVector::zeros(2); 2],
            m_0_tau: DVector::from_vec(vec![2.0, 3.0]),
            m_0_l_omega: factor(0.4),
            tau_0: vec![DVector::from_vec(vec![1.0, 0.5]), DVector::from_vec(vec![2.0, 2.0])],
            l_omega_0: vec![factor(0.0), factor(-0.5)],
            lapse_rate: 0.0,
        }
    }

    #[test]
    fn report_matrices() {
        let report = report_draw(&params());
        assert!((report.m_0_cor[(0, 1)] - 0.4).abs() < 1e-12);
        assert!((report.m_0_cov[(0, 0)] - 4.0).abs() < 1e-12);
        assert!((report.m_0_cov[(0, 1)] - 0.4 * 6.0).abs() < 1e-12);
        assert!((report.m_0_cov[(1, 1)] - 9.0).abs() < 1e-12);
        assert_eq!(report.s_0.len(), 2);
        assert!((report.s_0[1][(1, 0)] + 2.0).abs() < 1e-12);
    }

    #[test]
    fn decompose_recovers_draw() {
        let p = params();
        let report = report_draw(&p);
        let parts = decompose(&report.m_0_cov).unwrap();
        assert!((&parts.tau - &p.m_0_tau).amax() < 1e-12);
        assert!((&parts.correlation - &report.m_0_cor).amax() < 1e-12);
        assert!((&parts.cholesky - p.m_0_l_omega.factor()).amax() < 1e-12);
    }

    #[test]
    fn decompose_rejects_degenerate_covariance() {
        let cov = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, -1.0]);
        assert!(decompose(&cov).is_err());
    }

    #[test]
    fn report_serializes_with_model_names() {
        let json = serde_json::to_value(report_draw(&params())).unwrap();
        assert!(json.get("m_0_cor").is_some());
        assert!(json.get("m_0_cov").is_some());
        assert_eq!(json["S_0"].as_array().map(Vec::len), Some(2));
    }
}
