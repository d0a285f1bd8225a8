//! Model settings types.
//!
//! Settings never change the model's structure. They supply the defaults the
//! data contract falls back to (a `tau_scale` or `L_omega_scale` of 0 means
//! "use the default"), the constants of the data-dependent pseudocount prior
//! scale, and the tolerances used when validating input data.

use serde::{Deserialize, Serialize};

/// Complete settings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub schema_version: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub prior_defaults: PriorDefaults,

    #[serde(default)]
    pub kappa_nu_prior: KappaNuPrior,

    #[serde(default)]
    pub tolerances: Tolerances,
}

/// Fallback prior scales used when the data file passes 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorDefaults {
    /// Half-Cauchy scale for `m_0_tau` and `tau_0`.
    #[serde(default = "default_tau_scale")]
    pub tau_scale: f64,

    /// LKJ concentration for `m_0_L_omega` and `L_omega_0`.
    #[serde(default = "default_l_omega_scale")]
    pub l_omega_scale: f64,
}

/// Constants of the half-normal prior scale on `kappa_0` and `nu_0`.
///
/// `sigma_kappanu = count_multiplier · max(N)` when any category has data,
/// otherwise `empty_floor`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KappaNuPrior {
    #[serde(default = "default_count_multiplier")]
    pub count_multiplier: f64,

    #[serde(default = "default_empty_floor")]
    pub empty_floor: f64,
}

/// Numerical tolerances for load-time data validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tolerances {
    /// Relative tolerance for symmetry of scatter matrices.
    #[serde(default = "default_symmetry_tol")]
    pub symmetry: f64,

    /// Relative slack on the smallest eigenvalue of centered scatter.
    #[serde(default = "default_psd_tol")]
    pub psd: f64,

    /// Absolute slack on simplex sums and correlation-factor row norms.
    #[serde(default = "default_simplex_tol")]
    pub simplex: f64,
}

fn default_tau_scale() -> f64 {
    10.0
}

fn default_l_omega_scale() -> f64 {
    1.0
}

fn default_count_multiplier() -> f64 {
    4.0
}

fn default_empty_floor() -> f64 {
    10.0
}

fn default_symmetry_tol() -> f64 {
    1e-8
}

fn default_psd_tol() -> f64 {
    1e-8
}

fn default_simplex_tol() -> f64 {
    1e-9
}

impl Default for PriorDefaults {
    fn default() -> Self {
        Self {
            tau_scale: default_tau_scale(),
            l_omega_scale: default_l_omega_scale(),
        }
    }
}

impl Default for KappaNuPrior {
    fn default() -> Self {
        Self {
            count_multiplier: default_count_multiplier(),
            empty_floor: default_empty_floor(),
        }
    }
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            symmetry: default_symmetry_tol(),
            psd: default_psd_tol(),
            simplex: default_simplex_tol(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: crate::SETTINGS_SCHEMA_VERSION.to_string(),
            description: None,
            prior_defaults: PriorDefaults::default(),
            kappa_nu_prior: KappaNuPrior::default(),
            tolerances: Tolerances::default(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, crate::validate::ValidationError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::validate::ValidationError::IoError(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_json_str(&content)
    }

    /// Parse settings from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, crate::validate::ValidationError> {
        serde_json::from_str(json).map_err(|e| {
            crate::validate::ValidationError::ParseError(format!("Invalid JSON: {}", e))
        })
    }

    /// Resolve a data-file half-Cauchy scale, where 0 means "default".
    pub fn effective_tau_scale(&self, requested: f64) -> f64 {
        if requested == 0.0 {
            self.prior_defaults.tau_scale
        } else {
            requested
        }
    }

    /// Resolve a data-file LKJ concentration, where 0 means "default".
    pub fn effective_l_omega_scale(&self, requested: f64) -> f64 {
        if requested == 0.0 {
            self.prior_defaults.l_omega_scale
        } else {
            requested
        }
    }
}
