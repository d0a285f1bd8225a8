//! Settings validation errors and semantic validation.

use thiserror::Error;

use crate::settings::Settings;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Settings validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 60,
            ValidationError::ParseError(_) => 61,
            ValidationError::InvalidValue { .. } => 65,
            ValidationError::VersionMismatch { .. } => 66,
        }
    }
}

/// Validate settings semantically.
pub fn validate_settings(settings: &Settings) -> ValidationResult<()> {
    if settings.schema_version != crate::SETTINGS_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::SETTINGS_SCHEMA_VERSION.to_string(),
            actual: settings.schema_version.clone(),
        });
    }

    require_positive("prior_defaults.tau_scale", settings.prior_defaults.tau_scale)?;
    require_positive(
        "prior_defaults.l_omega_scale",
        settings.prior_defaults.l_omega_scale,
    )?;
    require_positive(
        "kappa_nu_prior.count_multiplier",
        settings.kappa_nu_prior.count_multiplier,
    )?;
    require_positive(
        "kappa_nu_prior.empty_floor",
        settings.kappa_nu_prior.empty_floor,
    )?;
    require_positive("tolerances.symmetry", settings.tolerances.symmetry)?;
    require_positive("tolerances.psd", settings.tolerances.psd)?;
    require_positive("tolerances.simplex", settings.tolerances.simplex)?;

    Ok(())
}

fn require_positive(field: &str, value: f64) -> ValidationResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            message: format!("Must be finite and positive, got {}", value),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_settings(&Settings::default()).is_ok());
    }

    #[test]
    fn rejects_wrong_version() {
        let mut settings = Settings::default();
        settings.schema_version = "0.9.0".to_string();
        let err = validate_settings(&settings).unwrap_err();
        assert!(matches!(err, ValidationError::VersionMismatch { .. }));
        assert_eq!(err.code(), 66);
    }

    #[test]
    fn rejects_non_positive_scales() {
        let mut settings = Settings::default();
        settings.prior_defaults.tau_scale = 0.0;
        let err = validate_settings(&settings).unwrap_err();
        match err {
            ValidationError::InvalidValue { field, .. } => {
                assert_eq!(field, "prior_defaults.tau_scale")
            }
            other => panic!("unexpected error: {other}"),
        }

        let mut settings = Settings::default();
        settings.kappa_nu_prior.empty_floor = f64::NAN;
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn rejects_negative_tolerance() {
        let mut settings = Settings::default();
        settings.tolerances.psd = -1e-9;
        assert!(validate_settings(&settings).is_err());
    }
}
