//! Settings snapshots for reproducibility.
//!
//! A snapshot records which settings an evaluation ran under, so a density
//! value written to disk can be traced back to the exact prior defaults and
//! tolerances that produced it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::resolve::SettingsPath;
use crate::settings::Settings;

/// A frozen snapshot of settings state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsSnapshot {
    /// When this snapshot was taken.
    pub timestamp: DateTime<Utc>,

    /// Schema version of the settings.
    pub schema_version: String,

    /// Where the settings were resolved from.
    pub source: String,

    /// Path the settings were loaded from.
    #[serde(default)]
    pub path: Option<String>,

    /// SHA-256 of the raw file content, or of the canonical default JSON.
    pub content_hash: String,

    /// Effective default half-Cauchy scale.
    pub tau_scale: f64,

    /// Effective default LKJ concentration.
    pub l_omega_scale: f64,
}

impl SettingsSnapshot {
    /// Create a snapshot from loaded settings.
    pub fn new(settings: &Settings, resolved: &SettingsPath, raw: Option<&str>) -> Self {
        let content_hash = match raw {
            Some(content) => hash_content(content),
            None => hash_content(&serde_json::to_string(settings).unwrap_or_default()),
        };

        SettingsSnapshot {
            timestamp: Utc::now(),
            schema_version: settings.schema_version.clone(),
            source: resolved.source.to_string(),
            path: resolved.path.as_ref().map(|p| p.display().to_string()),
            content_hash,
            tau_scale: settings.prior_defaults.tau_scale,
            l_omega_scale: settings.prior_defaults.l_omega_scale,
        }
    }

    /// Check if this snapshot matches another (same settings content).
    pub fn matches(&self, other: &SettingsSnapshot) -> bool {
        self.content_hash == other.content_hash
    }

    /// Get a short identifier for this snapshot (first 12 chars of hash).
    pub fn short_id(&self) -> &str {
        &self.content_hash[..12.min(self.content_hash.len())]
    }
}

/// SHA-256 of a string, hex encoded.
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
