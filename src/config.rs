//! Configuration file management
//!
//! Reads extpack's TOML configuration from the project (`.extpack.toml`) or
//! the user config directory. Settings here sit below environment variables
//! and CLI flags.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Project-local config file name
pub const LOCAL_CONFIG_FILE: &str = ".extpack.toml";

/// Tool configuration loaded from TOML files
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// Where built modules are placed
    #[serde(default)]
    pub out_dir: Option<PathBuf>,

    /// Cargo target directory shared by all builds
    #[serde(default)]
    pub target_dir: Option<PathBuf>,

    /// Cargo executable
    #[serde(default)]
    pub cargo: Option<PathBuf>,

    /// Host interpreter used for import checks
    #[serde(default)]
    pub python: Option<PathBuf>,

    /// Target triple to build for
    #[serde(default)]
    pub target: Option<String>,

    /// Release ledger file
    #[serde(default)]
    pub ledger: Option<PathBuf>,
}

impl Config {
    /// Load configuration with custom options.
    ///
    /// # Arguments
    /// * `custom_path` - Optional custom path to config file (overrides defaults)
    /// * `skip_rc` - If true, skip loading config files (return default config)
    ///
    /// # Errors
    ///
    /// Returns an error if the chosen config file can't be read or parsed.
    pub fn load_with_options(custom_path: Option<&Path>, skip_rc: bool) -> Result<Self> {
        if skip_rc {
            return Ok(Self::default());
        }

        if let Some(path) = custom_path {
            return Self::load_from(path);
        }

        let local = Path::new(LOCAL_CONFIG_FILE);
        if local.exists() {
            return Self::load_from(local);
        }

        if let Some(config_dir) = Self::user_config_dir() {
            let config_path = config_dir.join("config.toml");
            if config_path.exists() {
                return Self::load_from(&config_path);
            }
        }

        Ok(Self::default())
    }

    fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    fn user_config_dir() -> Option<PathBuf> {
        // Check XDG_CONFIG_HOME first
        if let Some(xdg_config) = crate::env_vars::xdg_config_home() {
            return Some(PathBuf::from(xdg_config).join("extpack"));
        }

        // Fall back to ~/.config/extpack
        dirs::home_dir().map(|home| home.join(".config").join("extpack"))
    }
}

/// Resolve the output directory: flag -> `EXTPACK_OUT_DIR` -> config -> `<root>/build/lib`.
#[must_use]
pub fn out_dir(flag: Option<&Path>, config: &Config, root: &Path) -> PathBuf {
    flag.map(Path::to_path_buf)
        .or_else(|| crate::env_vars::out_dir().map(PathBuf::from))
        .or_else(|| config.out_dir.clone())
        .unwrap_or_else(|| root.join("build").join("lib"))
}

/// Resolve the Cargo target directory: flag -> `CARGO_TARGET_DIR` -> config -> per crate.
#[must_use]
pub fn target_dir(flag: Option<&Path>, config: &Config) -> Option<PathBuf> {
    flag.map(Path::to_path_buf)
        .or_else(|| crate::env_vars::cargo_target_dir().map(PathBuf::from))
        .or_else(|| config.target_dir.clone())
}

/// Resolve the Cargo executable: flag -> environment -> config -> discovery.
#[must_use]
pub fn cargo(flag: Option<&Path>, config: &Config) -> Option<PathBuf> {
    flag.map(Path::to_path_buf)
        .or_else(|| crate::env_vars::cargo().map(PathBuf::from))
        .or_else(|| config.cargo.clone())
}

/// Resolve the host interpreter: flag -> environment -> config -> discovery.
#[must_use]
pub fn python(flag: Option<&Path>, config: &Config) -> Option<PathBuf> {
    flag.map(Path::to_path_buf)
        .or_else(|| crate::env_vars::python().map(PathBuf::from))
        .or_else(|| config.python.clone())
}

/// Resolve the target triple: flag -> `CARGO_BUILD_TARGET` -> config -> host.
#[must_use]
pub fn target(flag: Option<&str>, config: &Config) -> Option<String> {
    flag.map(ToString::to_string)
        .or_else(crate::env_vars::cargo_build_target)
        .or_else(|| config.target.clone())
}

/// Resolve the ledger path: flag -> `EXTPACK_LEDGER` -> config -> data dir.
///
/// # Errors
///
/// Returns an error if no data directory can be determined.
pub fn ledger(flag: Option<&Path>, config: &Config) -> Result<PathBuf> {
    flag.map(Path::to_path_buf)
        .or_else(|| crate::env_vars::ledger().map(PathBuf::from))
        .or_else(|| config.ledger.clone())
        .or_else(crate::ledger::ReleaseLedger::default_path)
        .context("Could not determine a location for the release ledger; pass --ledger")
}
