//! Toolchain discovery
//!
//! The compiler step never consults ambient state on its own. Everything that
//! influences the produced artifact (Cargo binary, compiler release, host and
//! target triples) is captured here once and passed in explicitly, so the same
//! [`Toolchain`] always yields load-compatible artifacts.

use crate::debug;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Explicit description of the Rust toolchain used for a build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    /// Path to the Cargo executable
    pub cargo: PathBuf,
    /// Cargo release string, e.g. `1.82.0`
    pub release: String,
    /// Triple of the machine running the build
    pub host: String,
    /// Triple the artifact is built for
    pub target: String,
}

impl Toolchain {
    /// Locate Cargo and query its version and host triple
    ///
    /// `cargo` overrides discovery; `target` overrides the host triple.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Toolchain`] if Cargo can't be found or queried.
    pub fn detect(cargo: Option<&Path>, target: Option<&str>) -> Result<Self> {
        let cargo = match cargo {
            Some(path) => path.to_path_buf(),
            None => find_cargo_executable()?,
        };

        let output = Command::new(&cargo)
            .arg("-vV")
            .output()
            .map_err(|e| Error::Toolchain(format!("failed to run {} -vV: {e}", cargo.display())))?;

        if !output.status.success() {
            return Err(Error::Toolchain(format!(
                "{} -vV failed:\n{}",
                cargo.display(),
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        let info = parse_version_info(&String::from_utf8_lossy(&output.stdout))?;
        debug!(
            "cargo at {}: release {}, host {}",
            cargo.display(),
            info.release,
            info.host
        );

        let target = target
            .filter(|t| !t.is_empty())
            .map_or_else(|| info.host.clone(), ToString::to_string);

        Ok(Self {
            cargo,
            release: info.release,
            host: info.host,
            target,
        })
    }

    /// Whether the build crosses to a different target than the host
    #[must_use]
    pub fn is_cross(&self) -> bool {
        self.host != self.target
    }
}

#[derive(Debug, PartialEq, Eq)]
struct VersionInfo {
    release: String,
    host: String,
}

/// Parse the `release:` and `host:` lines of `cargo -vV`
fn parse_version_info(text: &str) -> Result<VersionInfo> {
    let mut release = None;
    let mut host = None;

    for line in text.lines() {
        if let Some(value) = line.strip_prefix("release:") {
            release = Some(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("host:") {
            host = Some(value.trim().to_string());
        }
    }

    match (release, host) {
        (Some(release), Some(host)) if !release.is_empty() && !host.is_empty() => {
            Ok(VersionInfo { release, host })
        }
        _ => Err(Error::Toolchain(format!(
            "could not read release and host from cargo -vV output:\n{text}"
        ))),
    }
}

/// Find the Cargo executable
///
/// Priority order:
/// 1. `EXTPACK_CARGO` / `CARGO` environment variables
/// 2. `cargo` in PATH
/// 3. `~/.cargo/bin/cargo`
fn find_cargo_executable() -> Result<PathBuf> {
    if let Some(path) = crate::env_vars::cargo().map(PathBuf::from)
        && path.exists()
    {
        return Ok(path);
    }

    if let Ok(output) = Command::new("which").arg("cargo").output()
        && output.status.success()
    {
        let path_str = String::from_utf8_lossy(&output.stdout);
        let path = PathBuf::from(path_str.trim());
        if path.exists() {
            return Ok(path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        let cargo_path = home.join(".cargo").join("bin").join("cargo");
        if cargo_path.exists() {
            return Ok(cargo_path);
        }
    }

    Err(Error::Toolchain(
        "Cargo executable not found. Install Rust from https://rustup.rs".to_string(),
    ))
}
