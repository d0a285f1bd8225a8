//! catlearn settings loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for settings.json
//! - Settings resolution (CLI → env → XDG → system → defaults)
//! - Semantic validation
//! - Settings snapshots embedded in command output

pub mod resolve;
pub mod settings;
pub mod snapshot;
pub mod validate;

pub use resolve::{resolve_settings, SettingsPath, SettingsSource};
pub use settings::{KappaNuPrior, PriorDefaults, Settings, Tolerances};
pub use snapshot::SettingsSnapshot;
pub use validate::{validate_settings, ValidationError, ValidationResult};

/// Schema version for settings files.
pub const SETTINGS_SCHEMA_VERSION: &str = "1.0.0";

/// Load settings with the standard resolution order and validate them.
///
/// Returns the settings together with a snapshot describing where they came
/// from. When no file is found the built-in defaults are used.
pub fn load_settings(
    cli_path: Option<&std::path::Path>,
) -> ValidationResult<(Settings, SettingsSnapshot)> {
    let resolved = resolve_settings(cli_path);
    match &resolved.path {
        Some(path) => {
            let content = std::fs::read_to_string(path).map_err(|e| {
                ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
            })?;
            let settings = Settings::from_json_str(&content)?;
            validate_settings(&settings)?;
            let snapshot = SettingsSnapshot::new(&settings, &resolved, Some(&content));
            Ok((settings, snapshot))
        }
        None => {
            let settings = Settings::default();
            let snapshot = SettingsSnapshot::new(&settings, &resolved, None);
            Ok((settings, snapshot))
        }
    }
}
