//! Data contract: sufficient statistics and test trials.
//!
//! The JSON form ([`RawModelData`]) uses the model's own field names and a
//! 1-based `y_test`. Loading validates every shape and numeric invariant once
//! and produces [`ModelData`], which stores dense nalgebra values, 0-based
//! subjects, and the derived [`Hyperparameters`]. Nothing downstream
//! re-checks the data.

use crate::hyper::Hyperparameters;
use cl_config::Settings;
use cl_math::{is_symmetric, min_eigenvalue};
use nalgebra::{DMatrix, DVector};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Data contract as written in a JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RawModelData {
    /// Number of categories.
    #[serde(rename = "M")]
    pub num_categories: usize,

    /// Number of subjects.
    #[serde(rename = "L")]
    pub num_subjects: usize,

    /// Feature dimension.
    #[serde(rename = "K")]
    pub dim: usize,

    /// Learning-phase observation counts, M×L.
    #[serde(rename = "N")]
    pub counts: Vec<Vec<i64>>,

    /// Per-cell sample means, M×L×K.
    pub x_mean: Vec<Vec<Vec<f64>>>,

    /// Per-cell uncentered sums of squares Σ x xᵀ, M×L×K×K.
    pub x_ss: Vec<Vec<Vec<Vec<f64>>>>,

    /// Number of test trials.
    #[serde(rename = "N_test")]
    pub num_test: usize,

    /// Test stimuli, N_test×K.
    pub x_test: Vec<Vec<f64>>,

    /// Subject of each test trial, 1-based.
    pub y_test: Vec<i64>,

    /// Response counts per category for each test trial, N_test×M.
    pub z_test_counts: Vec<Vec<i64>>,

    /// Half-Cauchy scale for the tau parameters; 0 selects the default.
    #[serde(default)]
    pub tau_scale: f64,

    /// LKJ concentration for the correlation factors; 0 selects the default.
    #[serde(rename = "L_omega_scale", default)]
    pub l_omega_scale: f64,
}

/// Sufficient statistics of one (category, subject) cell.
#[derive(Debug, Clone, PartialEq)]
pub struct SufficientStatistics {
    pub count: u64,
    pub mean: DVector<f64>,
    /// Uncentered Σ x xᵀ.
    pub sum_squares: DMatrix<f64>,
}

impl SufficientStatistics {
    /// An empty cell. Mean and scatter are vacuous and stored as zeros.
    pub fn empty(dim: usize) -> Self {
        Self {
            count: 0,
            mean: DVector::zeros(dim),
            sum_squares: DMatrix::zeros(dim, dim),
        }
    }
}

/// One test trial.
#[derive(Debug, Clone, PartialEq)]
pub struct TestTrial {
    pub x: DVector<f64>,
    /// 0-based subject index.
    pub subject: usize,
    /// Response counts, one per category.
    pub counts: Vec<u64>,
}

/// Validated model data.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelData {
    num_categories: usize,
    num_subjects: usize,
    dim: usize,
    /// Row-major M×L.
    stats: Vec<SufficientStatistics>,
    trials: Vec<TestTrial>,
    hyper: Hyperparameters,
    /// Slack on probability-vector sums in the likelihood.
    simplex_tolerance: f64,
}

/// Load-time data contract violations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("shape mismatch in {field}: expected {expected}, got {actual}")]
    Shape {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("invalid data in {field}: {message}")]
    Invalid { field: String, message: String },

    #[error("{field} index {index} out of range 1..={bound}")]
    OutOfRange {
        field: String,
        index: i64,
        bound: usize,
    },

    #[error("failed to read data file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed data JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<DataError> for cl_common::Error {
    fn from(err: DataError) -> Self {
        match err {
            DataError::Shape {
                field,
                expected,
                actual,
            } => cl_common::Error::ShapeMismatch {
                field,
                expected,
                actual,
            },
            DataError::Invalid { field, message } => {
                cl_common::Error::InvalidData { field, message }
            }
            DataError::OutOfRange {
                field,
                index,
                bound,
            } => cl_common::Error::IndexOutOfRange {
                field,
                index,
                bound,
            },
            DataError::Io(e) => cl_common::Error::Io(e),
            DataError::Json(e) => cl_common::Error::InvalidData {
                field: "data".to_string(),
                message: e.to_string(),
            },
        }
    }
}

fn shape_error(field: impl Into<String>, expected: usize, actual: usize) -> DataError {
    DataError::Shape {
        field: field.into(),
        expected: expected.to_string(),
        actual: actual.to_string(),
    }
}

fn check_len<T>(field: &str, values: &[T], expected: usize) -> Result<(), DataError> {
    if values.len() != expected {
        return Err(shape_error(field, expected, values.len()));
    }
    Ok(())
}

fn check_count(field: String, value: i64) -> Result<u64, DataError> {
    u64::try_from(value).map_err(|_| DataError::Invalid {
        field,
        message: format!("count must be non-negative, got {}", value),
    })
}

fn to_vector(field: &str, values: &[f64], dim: usize) -> Result<DVector<f64>, DataError> {
    check_len(field, values, dim)?;
    if values.iter().any(|v| !v.is_finite()) {
        return Err(DataError::Invalid {
            field: field.to_string(),
            message: "entries must be finite".to_string(),
        });
    }
    Ok(DVector::from_column_slice(values))
}

fn check_square(field: &str, rows: &[Vec<f64>], dim: usize) -> Result<(), DataError> {
    check_len(field, rows, dim)?;
    for (i, row) in rows.iter().enumerate() {
        check_len(&format!("{}[{}]", field, i + 1), row, dim)?;
    }
    Ok(())
}

fn to_square_matrix(field: &str, rows: &[Vec<f64>], dim: usize) -> Result<DMatrix<f64>, DataError> {
    check_square(field, rows, dim)?;
    if rows.iter().flatten().any(|v| !v.is_finite()) {
        return Err(DataError::Invalid {
            field: field.to_string(),
            message: "entries must be finite".to_string(),
        });
    }
    Ok(DMatrix::from_fn(dim, dim, |i, j| rows[i][j]))
}

fn check_scale(field: &str, value: f64) -> Result<(), DataError> {
    if !value.is_finite() || value < 0.0 {
        return Err(DataError::Invalid {
            field: field.to_string(),
            message: format!("must be finite and >= 0 (0 selects the default), got {}", value),
        });
    }
    Ok(())
}

impl ModelData {
    /// Load and validate a data file.
    pub fn from_file(path: &Path, settings: &Settings) -> Result<Self, DataError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content, settings)
    }

    /// Parse and validate a data contract from JSON.
    pub fn from_json_str(json: &str, settings: &Settings) -> Result<Self, DataError> {
        let raw: RawModelData = serde_json::from_str(json)?;
        Self::from_raw(&raw, settings)
    }

    /// Validate a raw data contract.
    pub fn from_raw(raw: &RawModelData, settings: &Settings) -> Result<Self, DataError> {
        Self::validate(raw, settings).inspect_err(|e| {
            tracing::warn!(error = %e, "data contract rejected");
        })
    }

    fn validate(raw: &RawModelData, settings: &Settings) -> Result<Self, DataError> {
        let m = raw.num_categories;
        let l = raw.num_subjects;
        let k = raw.dim;
        for (field, value) in [("M", m), ("L", l), ("K", k)] {
            if value == 0 {
                return Err(DataError::Invalid {
                    field: field.to_string(),
                    message: "must be positive".to_string(),
                });
            }
        }
        check_scale("tau_scale", raw.tau_scale)?;
        check_scale("L_omega_scale", raw.l_omega_scale)?;

        check_len("N", &raw.counts, m)?;
        check_len("x_mean", &raw.x_mean, m)?;
        check_len("x_ss", &raw.x_ss, m)?;

        let tol = &settings.tolerances;
        // L is only trusted once each row has been checked against it.
        let mut stats = Vec::with_capacity(raw.counts.len());
        for c in 0..m {
            check_len(&format!("N[{}]", c + 1), &raw.counts[c], l)?;
            check_len(&format!("x_mean[{}]", c + 1), &raw.x_mean[c], l)?;
            check_len(&format!("x_ss[{}]", c + 1), &raw.x_ss[c], l)?;
            for s in 0..l {
                let cell = format!("[{},{}]", c + 1, s + 1);
                let count = check_count(format!("N{}", cell), raw.counts[c][s])?;
                let mean_field = format!("x_mean{}", cell);
                let ss_field = format!("x_ss{}", cell);
                if count == 0 {
                    // Shapes are still part of the contract for empty cells.
                    check_len(&mean_field, &raw.x_mean[c][s], k)?;
                    check_square(&ss_field, &raw.x_ss[c][s], k)?;
                    stats.push(SufficientStatistics::empty(k));
                    continue;
                }
                let mean = to_vector(&mean_field, &raw.x_mean[c][s], k)?;
                let sum_squares = to_square_matrix(&ss_field, &raw.x_ss[c][s], k)?;
                if !is_symmetric(&sum_squares, tol.symmetry) {
                    return Err(DataError::Invalid {
                        field: ss_field,
                        message: "sum of squares must be symmetric".to_string(),
                    });
                }
                check_centered_scatter(&ss_field, count, &mean, &sum_squares, tol.psd)?;
                stats.push(SufficientStatistics {
                    count,
                    mean,
                    sum_squares,
                });
            }
        }

        let n_test = raw.num_test;
        check_len("x_test", &raw.x_test, n_test)?;
        check_len("y_test", &raw.y_test, n_test)?;
        check_len("z_test_counts", &raw.z_test_counts, n_test)?;
        let mut trials = Vec::with_capacity(n_test);
        for j in 0..n_test {
            let x = to_vector(&format!("x_test[{}]", j + 1), &raw.x_test[j], k)?;
            let y = raw.y_test[j];
            if y < 1 || y as u64 > l as u64 {
                return Err(DataError::OutOfRange {
                    field: format!("y_test[{}]", j + 1),
                    index: y,
                    bound: l,
                });
            }
            let z_field = format!("z_test_counts[{}]", j + 1);
            check_len(&z_field, &raw.z_test_counts[j], m)?;
            let counts = raw.z_test_counts[j]
                .iter()
                .enumerate()
                .map(|(i, &z)| check_count(format!("{}[{}]", z_field, i + 1), z))
                .collect::<Result<Vec<_>, _>>()?;
            trials.push(TestTrial {
                x,
                subject: (y - 1) as usize,
                counts,
            });
        }

        let counts: Vec<u64> = stats.iter().map(|s| s.count).collect();
        let hyper = Hyperparameters::derive(&counts, raw.tau_scale, raw.l_omega_scale, settings);

        tracing::debug!(
            categories = m,
            subjects = l,
            dim = k,
            n_test,
            sigma_kappanu = hyper.sigma_kappanu,
            "data contract validated"
        );

        Ok(Self {
            num_categories: m,
            num_subjects: l,
            dim: k,
            stats,
            trials,
            hyper,
            simplex_tolerance: tol.simplex,
        })
    }

    /// Number of categories (M).
    pub fn num_categories(&self) -> usize {
        self.num_categories
    }

    /// Number of subjects (L).
    pub fn num_subjects(&self) -> usize {
        self.num_subjects
    }

    /// Feature dimension (K).
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Sufficient statistics for a 0-based (category, subject) cell.
    pub fn stats(&self, category: usize, subject: usize) -> &SufficientStatistics {
        &self.stats[category * self.num_subjects + subject]
    }

    /// All test trials in file order.
    pub fn trials(&self) -> &[TestTrial] {
        &self.trials
    }

    /// Derived hyperparameters.
    pub fn hyper(&self) -> &Hyperparameters {
        &self.hyper
    }

    /// Configured slack on simplex sums.
    pub fn simplex_tolerance(&self) -> f64 {
        self.simplex_tolerance
    }

    /// Largest learning-phase count over all cells.
    pub fn max_count(&self) -> u64 {
        self.stats.iter().map(|s| s.count).max().unwrap_or(0)
    }
}

/// The centered scatter `x_ss − N x̄ x̄ᵀ` must be PSD for the statistics to
/// describe real observations.
fn check_centered_scatter(
    field: &str,
    count: u64,
    mean: &DVector<f64>,
    sum_squares: &DMatrix<f64>,
    tol: f64,
) -> Result<(), DataError> {
    let centered = sum_squares - (count as f64) * mean * mean.transpose();
    let sym = (&centered + centered.transpose()) * 0.5;
    let min_eig = min_eigenvalue(&sym);
    let slack = tol * sum_squares.amax().max(1.0);
    if min_eig.is_nan() || min_eig < -slack {
        return Err(DataError::Invalid {
            field: field.to_string(),
            message: format!(
                "centered scatter x_ss - N*x_mean*x_meanᵀ is not positive semidefinite (min eigenvalue {:.3e})",
                min_eig
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_two_by_one() -> RawModelData {
        RawModelData {
            num_categories: 2,
            num_subjects: 1,
            dim: 1,
            counts: vec![vec![10], vec![0]],
            x_mean: vec![vec![vec![5.0]], vec![vec![0.0]]],
            x_ss: vec![vec![vec![vec![250.0]]], vec![vec![vec![0.0]]]],
            num_test: 2,
            x_test: vec![vec![4.5], vec![-1.0]],
            y_test: vec![1, 1],
            z_test_counts: vec![vec![3, 1], vec![0, 4]],
            tau_scale: 0.0,
            l_omega_scale: 0.0,
        }
    }

    #[test]
    fn valid_data_loads() {
        let data = ModelData::from_raw(&raw_two_by_one(), &Settings::default()).unwrap();
        assert_eq!(data.num_categories(), 2);
        assert_eq!(data.num_subjects(), 1);
        assert_eq!(data.dim(), 1);
        assert_eq!(data.stats(0, 0).count, 10);
        assert_eq!(data.stats(1, 0), &SufficientStatistics::empty(1));
        assert_eq!(data.trials()[1].subject, 0);
        assert_eq!(data.max_count(), 10);
        assert_eq!(data.hyper().sigma_kappanu, 40.0);
        assert_eq!(data.hyper().tau_scale, 10.0);
        assert_eq!(data.hyper().l_omega_scale, 1.0);
    }

    #[test]
    fn json_field_names_follow_model() {
        let json = serde_json::to_value(raw_two_by_one()).unwrap();
        for key in ["M", "L", "K", "N", "N_test", "y_test", "L_omega_scale"] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
        let text = json.to_string();
        let data = ModelData::from_json_str(&text, &Settings::default()).unwrap();
        assert_eq!(data.trials().len(), 2);
    }

    #[test]
    fn subject_index_is_one_based() {
        let mut raw = raw_two_by_one();
        raw.y_test[0] = 0;
        let err = ModelData::from_raw(&raw, &Settings::default()).unwrap_err();
        assert!(matches!(err, DataError::OutOfRange { index: 0, bound: 1, .. }));

        raw.y_test[0] = 2;
        let err = ModelData::from_raw(&raw, &Settings::default()).unwrap_err();
        assert!(matches!(err, DataError::OutOfRange { index: 2, .. }));
    }

    #[test]
    fn shape_mismatches_are_reported() {
        let mut raw = raw_two_by_one();
        raw.z_test_counts[1] = vec![1, 2, 3];
        let err = ModelData::from_raw(&raw, &Settings::default()).unwrap_err();
        match err {
            DataError::Shape { field, .. } => assert_eq!(field, "z_test_counts[2]"),
            other => panic!("unexpected: {other}"),
        }

        let mut raw = raw_two_by_one();
        raw.num_test = 3;
        assert!(matches!(
            ModelData::from_raw(&raw, &Settings::default()),
            Err(DataError::Shape { .. })
        ));

        let mut raw = raw_two_by_one();
        raw.x_mean[1][0] = vec![0.0, 0.0];
        assert!(matches!(
            ModelData::from_raw(&raw, &Settings::default()),
            Err(DataError::Shape { .. })
        ));
    }

    #[test]
    fn simplex_tolerance_follows_settings() {
        let data = ModelData::from_raw(&raw_two_by_one(), &Settings::default()).unwrap();
        assert_eq!(data.simplex_tolerance(), 1e-9);

        let mut settings = Settings::default();
        settings.tolerances.simplex = 1e-6;
        let data = ModelData::from_raw(&raw_two_by_one(), &settings).unwrap();
        assert_eq!(data.simplex_tolerance(), 1e-6);
    }

    #[test]
    fn empty_cell_scatter_must_be_square() {
        let mut raw = raw_two_by_one();
        raw.dim = 2;
        raw.counts = vec![vec![3], vec![0]];
        raw.x_mean = vec![vec![vec![1.0, 0.0]], vec![vec![0.0, 0.0]]];
        raw.x_ss = vec![
            vec![vec![vec![4.0, 0.0], vec![0.0, 1.0]]],
            vec![vec![vec![0.0], vec![0.0, 0.0, 0.0, 0.0]]],
        ];
        raw.x_test = vec![vec![0.5, 0.0], vec![-1.0, 0.0]];
        let err = ModelData::from_raw(&raw, &Settings::default()).unwrap_err();
        match err {
            DataError::Shape { field, .. } => assert_eq!(field, "x_ss[2,1][1]"),
            other => panic!("unexpected: {other}"),
        }

        // Empty cells are not checked for finiteness, only shape.
        raw.x_ss[1][0] = vec![vec![f64::NAN, 0.0], vec![0.0, 0.0]];
        assert!(ModelData::from_raw(&raw, &Settings::default()).is_ok());
    }

    #[test]
    fn negative_counts_rejected() {
        let mut raw = raw_two_by_one();
        raw.counts[1][0] = -1;
        assert!(matches!(
            ModelData::from_raw(&raw, &Settings::default()),
            Err(DataError::Invalid { .. })
        ));

        let mut raw = raw_two_by_one();
        raw.z_test_counts[0][0] = -2;
        assert!(matches!(
            ModelData::from_raw(&raw, &Settings::default()),
            Err(DataError::Invalid { .. })
        ));
    }

    #[test]
    fn inconsistent_scatter_rejected() {
        // N * mean² = 250 > x_ss, so the centered scatter is negative.
        let mut raw = raw_two_by_one();
        raw.x_ss[0][0] = vec![vec![200.0]];
        let err = ModelData::from_raw(&raw, &Settings::default()).unwrap_err();
        assert!(matches!(err, DataError::Invalid { .. }));
    }

    #[test]
    fn asymmetric_scatter_rejected() {
        let raw = RawModelData {
            num_categories: 1,
            num_subjects: 1,
            dim: 2,
            counts: vec![vec![4]],
            x_mean: vec![vec![vec![0.0, 0.0]]],
            x_ss: vec![vec![vec![vec![2.0, 0.5], vec![0.4, 2.0]]]],
            num_test: 0,
            x_test: vec![],
            y_test: vec![],
            z_test_counts: vec![],
            tau_scale: 1.0,
            l_omega_scale: 1.0,
        };
        let err = ModelData::from_raw(&raw, &Settings::default()).unwrap_err();
        assert!(err.to_string().contains("symmetric"));
    }

    #[test]
    fn non_finite_and_negative_scales_rejected() {
        let mut raw = raw_two_by_one();
        raw.x_test[0][0] = f64::NAN;
        assert!(ModelData::from_raw(&raw, &Settings::default()).is_err());

        let mut raw = raw_two_by_one();
        raw.tau_scale = -1.0;
        assert!(ModelData::from_raw(&raw, &Settings::default()).is_err());
    }

    #[test]
    fn zero_dimension_rejected() {
        let mut raw = raw_two_by_one();
        raw.dim = 0;
        let err = ModelData::from_raw(&raw, &Settings::default()).unwrap_err();
        assert!(matches!(err, DataError::Invalid { ref field, .. } if field == "K"));
    }

    #[test]
    fn data_errors_map_to_codes() {
        let err: cl_common::Error = DataError::OutOfRange {
            field: "y_test[1]".into(),
            index: 9,
            bound: 2,
        }
        .into();
        assert_eq!(err.code(), 22);
        let err: cl_common::Error = serde_json::from_str::<RawModelData>("{")
            .map_err(DataError::from)
            .unwrap_err()
            .into();
        assert_eq!(err.category(), cl_common::ErrorCategory::Data);
    }
}
