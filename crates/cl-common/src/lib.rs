//! catlearn common types and errors.
//!
//! This crate provides foundational types shared across the workspace:
//! - The unified error taxonomy with stable codes
//! - Output format selection for the CLI
//! - The output schema version

pub mod error;
pub mod output;

pub use error::{Error, ErrorCategory, Result};
pub use output::OutputFormat;

/// Schema version stamped on every JSON payload written to stdout.
pub const SCHEMA_VERSION: &str = "1.0.0";
