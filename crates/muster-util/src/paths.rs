//! Default paths for muster components
//!
//! Paths are user-writable by default (no root required):
//! - Policy file: `$XDG_CONFIG_HOME/muster/policies.toml` or `~/.config/muster/policies.toml`

use std::path::PathBuf;

/// Environment variable for overriding the policy file path
pub const MUSTER_CONFIG_ENV: &str = "MUSTER_CONFIG";

/// Policy filename within the config directory
const CONFIG_FILENAME: &str = "policies.toml";

/// Application subdirectory name
const APP_DIR: &str = "muster";

/// Get the default policy file path.
///
/// Order of precedence:
/// 1. `$MUSTER_CONFIG` environment variable (if set)
/// 2. `$XDG_CONFIG_HOME/muster/policies.toml` (if XDG_CONFIG_HOME is set)
/// 3. `~/.config/muster/policies.toml` (fallback)
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(MUSTER_CONFIG_ENV) {
        return PathBuf::from(path);
    }

    config_path_without_env()
}

/// Get the policy file path without checking the MUSTER_CONFIG env var.
/// Used for default values where the env var is checked separately (clap).
pub fn config_path_without_env() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join(CONFIG_FILENAME);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILENAME);
    }

    // Last resort
    PathBuf::from("/etc").join(APP_DIR).join(CONFIG_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_contains_muster() {
        let path = config_path_without_env();
        assert!(path.to_string_lossy().contains("muster"));
        assert!(path.to_string_lossy().ends_with("policies.toml"));
    }
}
