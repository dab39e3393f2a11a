//! Path resolution for armsync
//!
//! # Environment Variables
//!
//! - `ARMSYNC_CONFIG_DIR` - Override config directory (e.g., `~/dotfiles/armsync`)
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `ARMSYNC_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/armsync` (if set)
//! 3. Platform default:
//!    - Windows: `%APPDATA%\armsync`
//!    - macOS/Linux: `~/.config/armsync`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "ARMSYNC_CONFIG_DIR";

/// Name of the settings file inside the config directory
pub const SETTINGS_FILE: &str = "settings.toml";

/// Get the armsync config directory path
pub fn config_dir() -> Result<PathBuf> {
    config_dir_with(|key| std::env::var(key).ok())
}

/// Default location of the settings file
pub fn settings_file() -> Result<PathBuf> {
    Ok(config_dir()?.join(SETTINGS_FILE))
}

fn config_dir_with(env: impl Fn(&str) -> Option<String>) -> Result<PathBuf> {
    if let Some(dir) = env(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    if let Some(xdg_config) = env("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        let path = PathBuf::from(xdg_config).join("armsync");
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(app_data) = dirs::config_dir() {
            return Ok(app_data.join("armsync"));
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join("armsync");
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Expand `~` and environment variables in a path.
///
/// Unknown variables are left as written.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v).to_string())
        }
    }

    #[test]
    fn test_config_dir_env_override() {
        let dir = config_dir_with(env(&[
            (ENV_CONFIG_DIR, "/custom/config/path"),
            ("XDG_CONFIG_HOME", "/xdg"),
        ]))
        .unwrap();
        assert_eq!(dir, PathBuf::from("/custom/config/path"));
    }

    #[test]
    fn test_config_dir_env_override_with_tilde() {
        let home = dirs::home_dir().unwrap();
        let dir = config_dir_with(env(&[(ENV_CONFIG_DIR, "~/dotfiles/armsync")])).unwrap();
        assert_eq!(dir, home.join("dotfiles").join("armsync"));
    }

    #[test]
    fn test_xdg_config_home() {
        let dir = config_dir_with(env(&[("XDG_CONFIG_HOME", "/xdg")])).unwrap();
        assert_eq!(dir, PathBuf::from("/xdg/armsync"));
    }

    #[test]
    fn test_empty_xdg_config_home_is_ignored() {
        let dir = config_dir_with(env(&[("XDG_CONFIG_HOME", "")])).unwrap();
        assert!(dir.ends_with("armsync"));
        assert_ne!(dir, PathBuf::from("armsync"));
    }

    #[cfg(not(windows))]
    #[test]
    fn test_default_config_dir() {
        let home = dirs::home_dir().unwrap();
        let dir = config_dir_with(env(&[])).unwrap();
        assert_eq!(dir, home.join(".config").join("armsync"));
    }

    #[test]
    fn test_expand_with_tilde() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand("~/settings.toml"), home.join("settings.toml"));
    }

    #[test]
    fn test_expand_absolute() {
        assert_eq!(expand("/etc/armsync"), PathBuf::from("/etc/armsync"));
    }

    #[test]
    fn test_expand_unknown_env_var_unchanged() {
        let path = expand("$ARMSYNC_SURELY_UNSET_VAR/x");
        assert_eq!(path, PathBuf::from("$ARMSYNC_SURELY_UNSET_VAR/x"));
    }
}
