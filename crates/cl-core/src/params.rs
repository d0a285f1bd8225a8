//! Free parameters of the model.
//!
//! [`ModelParams`] holds one draw on the constrained scale. Every domain is
//! enforced where values enter: [`CorrCholesky`] checks its factor on
//! construction and [`ModelParams::validate`] checks the rest, so the
//! density never sees an out-of-domain value.
//!
//! [`ParameterLayout`] maps between `ModelParams` and the flat unconstrained
//! vector a gradient-based engine moves on. The flat order is
//!
//! ```text
//! kappa_0, nu_0, m_0 (M×K), m_0_tau (K), m_0_L_omega (K(K-1)/2),
//! tau_0 (M×K), L_omega_0 (M × K(K-1)/2), lapse_rate
//! ```

use crate::matrix::{matrix_from_rows, matrix_to_rows};
use cl_math::transform::{
    corr_cholesky_constrain, corr_cholesky_free, corr_cholesky_free_dim, lower_bound_constrain,
    lower_bound_free, unit_interval_constrain, unit_interval_free,
};
use cl_math::{is_corr_cholesky, multiply_lower_tri_self_transpose};
use nalgebra::{DMatrix, DVector};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Parameter domain errors.
#[derive(Debug, Error, PartialEq)]
pub enum ParamError {
    #[error("constraint violation for {parameter}: {message}")]
    Constraint { parameter: String, message: String },

    #[error("parameter vector has length {actual}, expected {expected}")]
    Length { expected: usize, actual: usize },
}

impl ParamError {
    fn constraint(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        ParamError::Constraint {
            parameter: parameter.into(),
            message: message.into(),
        }
    }
}

impl From<ParamError> for cl_common::Error {
    fn from(err: ParamError) -> Self {
        match err {
            ParamError::Constraint { parameter, message } => {
                cl_common::Error::ConstraintViolation { parameter, message }
            }
            ParamError::Length { expected, actual } => {
                cl_common::Error::ParameterLength { expected, actual }
            }
        }
    }
}

/// Cholesky factor of a correlation matrix.
///
/// Lower triangular, strictly positive diagonal, unit-norm rows.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrCholesky(DMatrix<f64>);

impl CorrCholesky {
    /// Wrap a factor, checking row norms against `tol`.
    pub fn new(factor: DMatrix<f64>, tol: f64) -> Option<Self> {
        if is_corr_cholesky(&factor, tol) {
            Some(Self(factor))
        } else {
            None
        }
    }

    /// Factor of the identity correlation.
    pub fn identity(dim: usize) -> Self {
        Self(DMatrix::identity(dim, dim))
    }

    /// Output of the tanh-CPC transform, valid by construction.
    pub(crate) fn from_transform(factor: DMatrix<f64>) -> Self {
        Self(factor)
    }

    pub fn factor(&self) -> &DMatrix<f64> {
        &self.0
    }

    pub fn dim(&self) -> usize {
        self.0.nrows()
    }

    /// The correlation matrix L Lᵀ.
    pub fn correlation(&self) -> DMatrix<f64> {
        multiply_lower_tri_self_transpose(&self.0)
    }
}

/// One parameter draw on the constrained scale.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParams {
    pub kappa_0: f64,
    pub nu_0: f64,
    /// Prior mean per category.
    pub m_0: Vec<DVector<f64>>,
    /// Scales of the population distribution of `m_0`.
    pub m_0_tau: DVector<f64>,
    pub m_0_l_omega: CorrCholesky,
    /// Per-category scales of S₀.
    pub tau_0: Vec<DVector<f64>>,
    /// Per-category correlation factors of S₀.
    pub l_omega_0: Vec<CorrCholesky>,
    pub lapse_rate: f64,
}

/// JSON form of a parameter draw, using the model's own names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ParamsFile {
    pub kappa_0: f64,
    pub nu_0: f64,
    /// M×K.
    pub m_0: Vec<Vec<f64>>,
    /// K.
    pub m_0_tau: Vec<f64>,
    /// K×K lower-triangular correlation Cholesky factor.
    #[serde(rename = "m_0_L_omega")]
    pub m_0_l_omega: Vec<Vec<f64>>,
    /// M×K.
    pub tau_0: Vec<Vec<f64>>,
    /// M×K×K.
    #[serde(rename = "L_omega_0")]
    pub l_omega_0: Vec<Vec<Vec<f64>>>,
    pub lapse_rate: f64,
}

fn check_vector(name: &str, v: &DVector<f64>, k: usize, positive: bool) -> Result<(), ParamError> {
    if v.len() != k {
        return Err(ParamError::constraint(
            name,
            format!("expected length {}, got {}", k, v.len()),
        ));
    }
    for (i, &x) in v.iter().enumerate() {
        if !x.is_finite() {
            return Err(ParamError::constraint(
                format!("{}[{}]", name, i + 1),
                format!("must be finite, got {}", x),
            ));
        }
        if positive && x <= 0.0 {
            return Err(ParamError::constraint(
                format!("{}[{}]", name, i + 1),
                format!("must be positive, got {}", x),
            ));
        }
    }
    Ok(())
}

fn check_pseudocount(name: &str, value: f64, k: usize) -> Result<(), ParamError> {
    if !value.is_finite() || value <= k as f64 {
        return Err(ParamError::constraint(
            name,
            format!("must be finite and greater than K = {}, got {}", k, value),
        ));
    }
    Ok(())
}

fn corr_from_rows(name: &str, rows: &[Vec<f64>], k: usize, tol: f64) -> Result<CorrCholesky, ParamError> {
    let factor = matrix_from_rows(rows)
        .filter(|m| m.nrows() == k && m.ncols() == k)
        .ok_or_else(|| ParamError::constraint(name, format!("expected a {}x{} matrix", k, k)))?;
    CorrCholesky::new(factor, tol).ok_or_else(|| {
        ParamError::constraint(
            name,
            "not a correlation Cholesky factor (lower triangular, positive diagonal, unit rows)",
        )
    })
}

impl ModelParams {
    /// Check every declared domain against a model with `m` categories and
    /// dimension `k`.
    pub fn validate(&self, m: usize, k: usize) -> Result<(), ParamError> {
        check_pseudocount("kappa_0", self.kappa_0, k)?;
        check_pseudocount("nu_0", self.nu_0, k)?;
        if !(0.0..=1.0).contains(&self.lapse_rate) {
            return Err(ParamError::constraint(
                "lapse_rate",
                format!("must lie in [0, 1], got {}", self.lapse_rate),
            ));
        }
        if self.m_0.len() != m || self.tau_0.len() != m || self.l_omega_0.len() != m {
            return Err(ParamError::constraint(
                "m_0/tau_0/L_omega_0",
                format!(
                    "expected {} categories, got {}/{}/{}",
                    m,
                    self.m_0.len(),
                    self.tau_0.len(),
                    self.l_omega_0.len()
                ),
            ));
        }
        for (c, m0) in self.m_0.iter().enumerate() {
            check_vector(&format!("m_0[{}]", c + 1), m0, k, false)?;
        }
        check_vector("m_0_tau", &self.m_0_tau, k, true)?;
        if self.m_0_l_omega.dim() != k {
            return Err(ParamError::constraint(
                "m_0_L_omega",
                format!("expected dimension {}, got {}", k, self.m_0_l_omega.dim()),
            ));
        }
        for (c, tau) in self.tau_0.iter().enumerate() {
            check_vector(&format!("tau_0[{}]", c + 1), tau, k, true)?;
        }
        for (c, l) in self.l_omega_0.iter().enumerate() {
            if l.dim() != k {
                return Err(ParamError::constraint(
                    format!("L_omega_0[{}]", c + 1),
                    format!("expected dimension {}, got {}", k, l.dim()),
                ));
            }
        }
        Ok(())
    }

    /// Convert and validate a parameter file. M and K are read from the
    /// lengths of `m_0` and `m_0_tau`.
    pub fn from_file_form(file: &ParamsFile, tol: f64) -> Result<Self, ParamError> {
        let m = file.m_0.len();
        let k = file.m_0_tau.len();
        if m == 0 || k == 0 {
            return Err(ParamError::constraint(
                "m_0/m_0_tau",
                "need at least one category and one dimension",
            ));
        }
        if file.l_omega_0.len() != m {
            return Err(ParamError::constraint(
                "L_omega_0",
                format!("expected {} categories, got {}", m, file.l_omega_0.len()),
            ));
        }
        let l_omega_0 = file
            .l_omega_0
            .iter()
            .enumerate()
            .map(|(c, rows)| corr_from_rows(&format!("L_omega_0[{}]", c + 1), rows, k, tol))
            .collect::<Result<Vec<_>, _>>()?;
        let params = Self {
            kappa_0: file.kappa_0,
            nu_0: file.nu_0,
            m_0: file.m_0.iter().map(|v| DVector::from_column_slice(v)).collect(),
            m_0_tau: DVector::from_column_slice(&file.m_0_tau),
            m_0_l_omega: corr_from_rows("m_0_L_omega", &file.m_0_l_omega, k, tol)?,
            tau_0: file.tau_0.iter().map(|v| DVector::from_column_slice(v)).collect(),
            l_omega_0,
            lapse_rate: file.lapse_rate,
        };
        params.validate(m, k)?;
        Ok(params)
    }

    /// JSON form of this draw.
    pub fn to_file_form(&self) -> ParamsFile {
        ParamsFile {
            kappa_0: self.kappa_0,
            nu_0: self.nu_0,
            m_0: self.m_0.iter().map(|v| v.as_slice().to_vec()).collect(),
            m_0_tau: self.m_0_tau.as_slice().to_vec(),
            m_0_l_omega: matrix_to_rows(self.m_0_l_omega.factor()),
            tau_0: self.tau_0.iter().map(|v| v.as_slice().to_vec()).collect(),
            l_omega_0: self
                .l_omega_0
                .iter()
                .map(|l| matrix_to_rows(l.factor()))
                .collect(),
            lapse_rate: self.lapse_rate,
        }
    }
}

/// Layout of the unconstrained parameter vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterLayout {
    num_categories: usize,
    dim: usize,
}

struct Cursor<'a> {
    values: &'a [f64],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn next(&mut self) -> f64 {
        let v = self.values[self.pos];
        self.pos += 1;
        v
    }

    fn take(&mut self, n: usize) -> &'a [f64] {
        let out = &self.values[self.pos..self.pos + n];
        self.pos += n;
        out
    }
}

impl ParameterLayout {
    pub fn new(num_categories: usize, dim: usize) -> Self {
        Self {
            num_categories,
            dim,
        }
    }

    pub fn num_categories(&self) -> usize {
        self.num_categories
    }

    /// Feature dimension K.
    pub fn feature_dim(&self) -> usize {
        self.dim
    }

    /// Length of the unconstrained vector.
    pub fn dim(&self) -> usize {
        let m = self.num_categories;
        let k = self.dim;
        let c = corr_cholesky_free_dim(k);
        2 + m * k + k + c + m * k + m * c + 1
    }

    /// Names of the unconstrained coordinates, 1-based.
    ///
    /// Correlation coordinates are named after the factor entry they fill.
    pub fn names(&self) -> Vec<String> {
        let m = self.num_categories;
        let k = self.dim;
        let mut names = Vec::with_capacity(self.dim());
        names.push("kappa_0".to_string());
        names.push("nu_0".to_string());
        for c in 1..=m {
            for d in 1..=k {
                names.push(format!("m_0[{},{}]", c, d));
            }
        }
        for d in 1..=k {
            names.push(format!("m_0_tau[{}]", d));
        }
        for (i, j) in lower_entries(k) {
            names.push(format!("m_0_L_omega[{},{}]", i, j));
        }
        for c in 1..=m {
            for d in 1..=k {
                names.push(format!("tau_0[{},{}]", c, d));
            }
        }
        for c in 1..=m {
            for (i, j) in lower_entries(k) {
                names.push(format!("L_omega_0[{}][{},{}]", c, i, j));
            }
        }
        names.push("lapse_rate".to_string());
        names
    }

    /// Map an unconstrained vector to parameters, returning the log absolute
    /// Jacobian determinant of the transform alongside.
    pub fn constrain(&self, theta: &[f64]) -> Result<(ModelParams, f64), ParamError> {
        let expected = self.dim();
        if theta.len() != expected {
            return Err(ParamError::Length {
                expected,
                actual: theta.len(),
            });
        }
        if let Some(i) = theta.iter().position(|v| !v.is_finite()) {
            let name = self.names().swap_remove(i);
            return Err(ParamError::constraint(
                name,
                format!("unconstrained value must be finite, got {}", theta[i]),
            ));
        }

        let m = self.num_categories;
        let k = self.dim;
        let c = corr_cholesky_free_dim(k);
        let lb = k as f64;
        let mut cur = Cursor {
            values: theta,
            pos: 0,
        };
        let mut log_jacobian = 0.0;

        let (kappa_0, lj) = lower_bound_constrain(cur.next(), lb);
        log_jacobian += lj;
        let (nu_0, lj) = lower_bound_constrain(cur.next(), lb);
        log_jacobian += lj;

        let m_0: Vec<DVector<f64>> = (0..m)
            .map(|_| DVector::from_column_slice(cur.take(k)))
            .collect();

        let mut positive = |values: &[f64]| -> DVector<f64> {
            DVector::from_iterator(
                values.len(),
                values.iter().map(|&y| {
                    let (x, lj) = lower_bound_constrain(y, 0.0);
                    log_jacobian += lj;
                    x
                }),
            )
        };
        let m_0_tau = positive(cur.take(k));
        let m_0_l_omega_free = cur.take(c);
        let tau_0: Vec<_> = (0..m).map(|_| positive(cur.take(k))).collect();

        let mut corr = |values: &[f64], name: &str| -> Result<CorrCholesky, ParamError> {
            let (l, lj) = corr_cholesky_constrain(values, k)
                .ok_or_else(|| ParamError::constraint(name, "wrong number of free values"))?;
            log_jacobian += lj;
            Ok(CorrCholesky::from_transform(l))
        };
        let m_0_l_omega = corr(m_0_l_omega_free, "m_0_L_omega")?;
        let l_omega_0 = (0..m)
            .map(|ci| corr(cur.take(c), &format!("L_omega_0[{}]", ci + 1)))
            .collect::<Result<Vec<_>, _>>()?;

        let (lapse_rate, lj) = unit_interval_constrain(cur.next());
        log_jacobian += lj;

        let params = ModelParams {
            kappa_0,
            nu_0,
            m_0,
            m_0_tau,
            m_0_l_omega,
            tau_0,
            l_omega_0,
            lapse_rate,
        };
        Ok((params, log_jacobian))
    }

    /// Inverse of [`constrain`](Self::constrain).
    ///
    /// A lapse rate of exactly 0 or 1 has no finite preimage and is rejected.
    pub fn unconstrain(&self, params: &ModelParams) -> Result<Vec<f64>, ParamError> {
        params.validate(self.num_categories, self.dim)?;
        let lb = self.dim as f64;
        let mut theta = Vec::with_capacity(self.dim());
        theta.push(lower_bound_free(params.kappa_0, lb));
        theta.push(lower_bound_free(params.nu_0, lb));
        for m0 in &params.m_0 {
            theta.extend(m0.iter().copied());
        }
        theta.extend(params.m_0_tau.iter().map(|&t| lower_bound_free(t, 0.0)));
        theta.extend(corr_cholesky_free(params.m_0_l_omega.factor()));
        for tau in &params.tau_0 {
            theta.extend(tau.iter().map(|&t| lower_bound_free(t, 0.0)));
        }
        for l in &params.l_omega_0 {
            theta.extend(corr_cholesky_free(l.factor()));
        }
        let lapse = unit_interval_free(params.lapse_rate);
        if !lapse.is_finite() {
            return Err(ParamError::constraint(
                "lapse_rate",
                format!(
                    "{} lies on the boundary and has no unconstrained value",
                    params.lapse_rate
                ),
            ));
        }
        theta.push(lapse);

        if let Some(i) = theta.iter().position(|v| !v.is_finite()) {
            let name = self.names().swap_remove(i);
            return Err(ParamError::constraint(
                name,
                "value lies on the boundary of its domain",
            ));
        }
        Ok(theta)
    }
}

/// Strictly lower entries (i, j), 1-based, row by row.
fn lower_entries(k: usize) -> impl Iterator<Item = (usize, usize)> {
    (2..=k).flat_map(|i| (1..i).map(move |j| (i, j)))
}
