//! Error types for catlearn.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Remediation suggestions for humans
//!
//! There is no retry or partial-failure semantics anywhere in the model:
//! a load either validates or fails once, and a density evaluation either
//! yields a finite scalar or fails outright.
//!
//! # Agent-Facing Output
//!
//! Errors serialize to structured JSON:
//! ```json
//! {
//!   "code": 20,
//!   "category": "data",
//!   "message": "shape mismatch in x_mean: expected 2 rows, got 3",
//!   "context": { "field": "x_mean" }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for catlearn operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Settings file errors.
    Config,
    /// Input data contract errors, raised once at load time.
    Data,
    /// Free parameter outside its declared domain.
    Parameter,
    /// Numerical degeneracy during a density evaluation.
    Numerical,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Data => write!(f, "data"),
            ErrorCategory::Parameter => write!(f, "parameter"),
            ErrorCategory::Numerical => write!(f, "numerical"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for catlearn.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("schema version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },

    // Data contract errors (20-29)
    #[error("shape mismatch in {field}: expected {expected}, got {actual}")]
    ShapeMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("invalid data in {field}: {message}")]
    InvalidData { field: String, message: String },

    #[error("{field} index {index} out of range 1..={bound}")]
    IndexOutOfRange {
        field: String,
        index: i64,
        bound: usize,
    },

    // Parameter domain errors (30-39)
    #[error("constraint violation for {parameter}: {message}")]
    ConstraintViolation { parameter: String, message: String },

    #[error("parameter vector has length {actual}, expected {expected}")]
    ParameterLength { expected: usize, actual: usize },

    // Numerical errors (40-49)
    #[error("numerical degeneracy: {0}")]
    NumericalDegeneracy(String),

    #[error("non-finite value in {quantity}")]
    NonFinite { quantity: String },

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Configuration errors
    /// - 20-29: Data contract errors
    /// - 30-39: Parameter domain errors
    /// - 40-49: Numerical errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidSettings(_) => 11,
            Error::VersionMismatch { .. } => 12,
            Error::ShapeMismatch { .. } => 20,
            Error::InvalidData { .. } => 21,
            Error::IndexOutOfRange { .. } => 22,
            Error::ConstraintViolation { .. } => 30,
            Error::ParameterLength { .. } => 31,
            Error::NumericalDegeneracy(_) => 40,
            Error::NonFinite { .. } => 41,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::InvalidSettings(_) | Error::VersionMismatch { .. } => {
                ErrorCategory::Config
            }

            Error::ShapeMismatch { .. }
            | Error::InvalidData { .. }
            | Error::IndexOutOfRange { .. } => ErrorCategory::Data,

            Error::ConstraintViolation { .. } | Error::ParameterLength { .. } => {
                ErrorCategory::Parameter
            }

            Error::NumericalDegeneracy(_) | Error::NonFinite { .. } => ErrorCategory::Numerical,

            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::Config(_) => "Run 'catlearn settings' to see which settings file was resolved.",
            Error::InvalidSettings(_) => {
                "Fix the reported field in settings.json, or remove the file to use built-in defaults."
            }
            Error::VersionMismatch { .. } => {
                "Regenerate the file for the current schema version ('catlearn schema')."
            }

            Error::ShapeMismatch { .. } => {
                "Check that every array agrees with the declared M, L and K. See 'catlearn schema data'."
            }
            Error::InvalidData { .. } => {
                "Sufficient statistics must be finite, counts non-negative, and scatter matrices symmetric PSD."
            }
            Error::IndexOutOfRange { .. } => "Subject labels in y_test are 1-based and must not exceed L.",

            Error::ConstraintViolation { .. } => {
                "The proposed parameter lies outside its declared domain; the draw must be rejected."
            }
            Error::ParameterLength { .. } => {
                "The unconstrained vector must match the model dimension reported by 'catlearn schema params'."
            }

            Error::NumericalDegeneracy(_) => {
                "The draw produced a singular or indefinite matrix; the engine should reject this proposal."
            }
            Error::NonFinite { .. } => {
                "The draw produced a non-finite density term; the engine should reject this proposal."
            }

            Error::Io(_) => "Check that the file exists and is readable.",
            Error::Json(_) => "Invalid JSON. Check syntax with 'jq . <file>'.",
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::Config(_) => "Configuration Error",
            Error::InvalidSettings(_) => "Invalid Settings",
            Error::VersionMismatch { .. } => "Schema Version Mismatch",
            Error::ShapeMismatch { .. } => "Data Shape Mismatch",
            Error::InvalidData { .. } => "Invalid Data",
            Error::IndexOutOfRange { .. } => "Index Out of Range",
            Error::ConstraintViolation { .. } => "Parameter Constraint Violation",
            Error::ParameterLength { .. } => "Parameter Length Mismatch",
            Error::NumericalDegeneracy(_) => "Numerical Degeneracy",
            Error::NonFinite { .. } => "Non-Finite Density",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Parse Error",
        }
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Additional structured context (field names, indices).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        match err {
            Error::ShapeMismatch { field, .. } | Error::InvalidData { field, .. } => {
                context.insert("field".to_string(), serde_json::json!(field));
            }
            Error::IndexOutOfRange {
                field,
                index,
                bound,
            } => {
                context.insert("field".to_string(), serde_json::json!(field));
                context.insert("index".to_string(), serde_json::json!(index));
                context.insert("bound".to_string(), serde_json::json!(bound));
            }
            Error::ConstraintViolation { parameter, .. } => {
                context.insert("parameter".to_string(), serde_json::json!(parameter));
            }
            Error::ParameterLength { expected, actual } => {
                context.insert("expected".to_string(), serde_json::json!(expected));
                context.insert("actual".to_string(), serde_json::json!(actual));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            context,
        }
    }
}

impl StructuredError {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }
}

/// Format an error for human-readable stderr output.
///
/// Output format:
/// ```text
/// ✗ [Headline]
///   Reason: [Error message]
///   Fix: [Remediation hint]
/// ```
pub fn format_error_human(err: &Error, use_color: bool) -> String {
    let (red, cyan, reset) = if use_color {
        ("\x1b[31m", "\x1b[36m", "\x1b[0m")
    } else {
        ("", "", "")
    };

    format!(
        "{red}✗{reset} {headline}\n  Reason: {message}\n  {cyan}Fix:{reset} {remediation}",
        headline = err.headline(),
        message = err,
        remediation = err.remediation()
    )
}
