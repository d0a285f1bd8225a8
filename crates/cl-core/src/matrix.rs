//! Conversions between nested JSON arrays and nalgebra storage.

use nalgebra::{DMatrix, DVector};
use serde::ser::{SerializeSeq, Serializer};

/// Build a matrix from rows. `None` unless every row has the same length.
pub fn matrix_from_rows(rows: &[Vec<f64>]) -> Option<DMatrix<f64>> {
    let nrows = rows.len();
    let ncols = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|r| r.len() != ncols) {
        return None;
    }
    Some(DMatrix::from_fn(nrows, ncols, |i, j| rows[i][j]))
}

/// Rows of a matrix as nested vectors.
pub fn matrix_to_rows(m: &DMatrix<f64>) -> Vec<Vec<f64>> {
    (0..m.nrows())
        .map(|i| m.row(i).iter().copied().collect())
        .collect()
}

pub fn serialize_vector<S: Serializer>(v: &DVector<f64>, s: S) -> Result<S::Ok, S::Error> {
    s.collect_seq(v.iter())
}

pub fn serialize_vectors<S: Serializer>(vs: &[DVector<f64>], s: S) -> Result<S::Ok, S::Error> {
    let mut seq = s.serialize_seq(Some(vs.len()))?;
    for v in vs {
        seq.serialize_element(v.as_slice())?;
    }
    seq.end()
}

pub fn serialize_matrix<S: Serializer>(m: &DMatrix<f64>, s: S) -> Result<S::Ok, S::Error> {
    s.collect_seq(matrix_to_rows(m))
}

pub fn serialize_matrices<S: Serializer>(ms: &[DMatrix<f64>], s: S) -> Result<S::Ok, S::Error> {
    s.collect_seq(ms.iter().map(matrix_to_rows))
}
