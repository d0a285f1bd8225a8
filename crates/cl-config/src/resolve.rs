//! Settings resolution and path discovery.
//!
//! Resolution order: CLI argument → environment variables → XDG paths → system → defaults.

use std::path::{Path, PathBuf};

/// Discovered settings file path.
#[derive(Debug, Clone, Default)]
pub struct SettingsPath {
    /// Path to settings.json (or None if not found).
    pub path: Option<PathBuf>,

    /// Where the path came from (for diagnostics).
    pub source: SettingsSource,
}

/// Where a settings file was found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SettingsSource {
    /// Explicitly provided via CLI argument.
    CliArgument,

    /// Set via environment variable.
    Environment,

    /// Found in XDG config directory.
    XdgConfig,

    /// Found in /etc/catlearn/.
    SystemConfig,

    /// Using built-in defaults.
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for SettingsSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsSource::CliArgument => write!(f, "CLI argument"),
            SettingsSource::Environment => write!(f, "environment variable"),
            SettingsSource::XdgConfig => write!(f, "XDG config"),
            SettingsSource::SystemConfig => write!(f, "system config"),
            SettingsSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

/// Environment variable names.
pub const ENV_SETTINGS_PATH: &str = "CATLEARN_SETTINGS";
pub const ENV_CONFIG_DIR: &str = "CATLEARN_CONFIG_DIR";

/// Standard settings file name.
const SETTINGS_FILENAME: &str = "settings.json";

/// Application name for XDG directories.
const APP_NAME: &str = "catlearn";

/// Resolve the settings path using the standard resolution order.
///
/// 1. Explicit CLI path (if it exists)
/// 2. CATLEARN_SETTINGS environment variable
/// 3. CATLEARN_CONFIG_DIR environment variable + filename
/// 4. XDG config directory (~/.config/catlearn/)
/// 5. System config (/etc/catlearn/)
/// 6. Built-in defaults (None)
pub fn resolve_settings(cli_path: Option<&Path>) -> SettingsPath {
    // 1. CLI argument
    if let Some(path) = cli_path {
        if path.exists() {
            return found(path.to_path_buf(), SettingsSource::CliArgument);
        }
    }

    // 2. Environment variable (direct path)
    if let Ok(env_path) = std::env::var(ENV_SETTINGS_PATH) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return found(path, SettingsSource::Environment);
        }
    }

    // 3. Environment variable (config dir)
    if let Ok(config_dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = PathBuf::from(config_dir).join(SETTINGS_FILENAME);
        if path.exists() {
            return found(path, SettingsSource::Environment);
        }
    }

    // 4. XDG config directory
    if let Some(dir) = xdg_config_dir() {
        let path = dir.join(SETTINGS_FILENAME);
        if path.exists() {
            return found(path, SettingsSource::XdgConfig);
        }
    }

    // 5. System config
    let system_path = system_config_dir().join(SETTINGS_FILENAME);
    if system_path.exists() {
        return found(system_path, SettingsSource::SystemConfig);
    }

    // 6. Built-in default
    SettingsPath::default()
}

fn found(path: PathBuf, source: SettingsSource) -> SettingsPath {
    SettingsPath {
        path: Some(path),
        source,
    }
}

/// Get the XDG config directory for catlearn.
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Get the system config directory.
pub fn system_config_dir() -> PathBuf {
    PathBuf::from("/etc").join(APP_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_source_display() {
        assert_eq!(format!("{}", SettingsSource::CliArgument), "CLI argument");
        assert_eq!(
            format!("{}", SettingsSource::Environment),
            "environment variable"
        );
        assert_eq!(format!("{}", SettingsSource::XdgConfig), "XDG config");
        assert_eq!(format!("{}", SettingsSource::SystemConfig), "system config");
        assert_eq!(
            format!("{}", SettingsSource::BuiltinDefault),
            "builtin default"
        );
    }

    #[test]
    fn test_missing_cli_path_falls_through() {
        let resolved = resolve_settings(Some(Path::new("/nonexistent/catlearn/settings.json")));
        assert_ne!(resolved.source, SettingsSource::CliArgument);
    }

    #[test]
    fn test_xdg_config_dir() {
        if let Some(path) = xdg_config_dir() {
            assert!(path.ends_with(APP_NAME));
        }
    }

    #[test]
    fn test_system_config_dir() {
        assert_eq!(system_config_dir(), PathBuf::from("/etc/catlearn"));
    }
}
