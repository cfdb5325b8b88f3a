//! Binding adapter
//!
//! Declares the calling convention a compiled extension must expose so the
//! host interpreter can load it, and turns an extension declaration into a
//! [`BuildDirective`] for the compiler step.
//!
//! Only one convention exists today (`PyO3`-style Python modules). New
//! conventions are added as new [`BindingKind`] variants; descriptors that
//! name an existing kind keep parsing unchanged.

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

static MODULE_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("should build valid regex"));

/// Calling convention used to expose native symbols to the host runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingKind {
    /// `CPython` extension module exporting `PyInit_<name>`
    #[default]
    #[serde(alias = "standard")]
    PyO3,
}

impl BindingKind {
    /// Every supported kind, in declaration order
    pub const ALL: &'static [Self] = &[Self::PyO3];

    /// Name of the entry point the host looks up when importing `module`
    #[must_use]
    pub fn init_symbol(self, module: &str) -> String {
        match self {
            Self::PyO3 => format!("PyInit_{}", leaf_name(module)),
        }
    }

    /// File suffix the host expects for an extension built for `target`
    #[must_use]
    pub fn artifact_suffix(self, target: &str) -> &'static str {
        match self {
            Self::PyO3 if target.contains("windows") => ".pyd",
            Self::PyO3 => ".so",
        }
    }

    /// Extra `rustc` arguments needed to link a loadable module for `target`
    ///
    /// Python extensions must not link libpython; on Apple targets the
    /// interpreter symbols are resolved at load time instead.
    #[must_use]
    pub fn link_args(self, target: &str) -> Vec<String> {
        match self {
            Self::PyO3 if target.contains("apple-darwin") => vec![
                "-C".to_string(),
                "link-arg=-undefined".to_string(),
                "-C".to_string(),
                "link-arg=dynamic_lookup".to_string(),
            ],
            Self::PyO3 => Vec::new(),
        }
    }
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PyO3 => f.write_str("pyo3"),
        }
    }
}

impl FromStr for BindingKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pyo3" | "standard" => Ok(Self::PyO3),
            other => Err(Error::config(format!(
                "unsupported binding kind '{other}' (supported: {})",
                Self::ALL
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
        }
    }
}

/// Cargo profile used for the build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    #[default]
    Release,
    Debug,
}

impl Profile {
    /// Directory name Cargo uses under the target dir
    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Release => "release",
            Self::Debug => "debug",
        }
    }
}

/// Everything the compiler step needs for one extension
///
/// A directive is a plan, not a product: the manifest it points at is only
/// checked when the build runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildDirective {
    /// Dotted module path the host imports (e.g. `rustyknife` or `pkg.native`)
    pub module: String,
    /// Absolute or descriptor-relative path to `Cargo.toml`
    pub manifest: PathBuf,
    pub binding: BindingKind,
    pub profile: Profile,
    /// Cargo features to enable
    pub features: Vec<String>,
    /// Extra arguments passed to `rustc` after `--`
    pub rustc_flags: Vec<String>,
}

impl BuildDirective {
    /// Set the profile
    #[must_use]
    pub const fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        self
    }

    /// Set enabled Cargo features
    #[must_use]
    pub fn with_features(mut self, features: Vec<String>) -> Self {
        self.features = features;
        self
    }

    /// Set extra `rustc` arguments
    #[must_use]
    pub fn with_rustc_flags(mut self, flags: Vec<String>) -> Self {
        self.rustc_flags = flags;
        self
    }

    /// Path of the artifact relative to the output directory
    ///
    /// `pkg.sub.native` built for Linux lands at `pkg/sub/native.so`.
    #[must_use]
    pub fn relative_artifact_path(&self, target: &str) -> PathBuf {
        let mut path: PathBuf = self.module.split('.').collect();
        let file = format!(
            "{}{}",
            leaf_name(&self.module),
            self.binding.artifact_suffix(target)
        );
        path.set_file_name(file);
        path
    }

    /// Symbol the host resolves when importing this module
    #[must_use]
    pub fn init_symbol(&self) -> String {
        self.binding.init_symbol(&self.module)
    }
}

/// Build a directive for one extension
///
/// Fails before any compilation if `extension_name` is not a module path the
/// host can import.
///
/// # Errors
///
/// Returns [`Error::Configuration`] for an invalid module name or an empty
/// manifest path.
pub fn bind(
    extension_name: &str,
    manifest_path: impl AsRef<Path>,
    binding_kind: BindingKind,
) -> Result<BuildDirective> {
    validate_module_name(extension_name)?;

    let manifest = manifest_path.as_ref();
    if manifest.as_os_str().is_empty() {
        return Err(Error::config(format!(
            "extension '{extension_name}' has an empty manifest path"
        )));
    }

    Ok(BuildDirective {
        module: extension_name.to_string(),
        manifest: manifest.to_path_buf(),
        binding: binding_kind,
        profile: Profile::Release,
        features: Vec::new(),
        rustc_flags: Vec::new(),
    })
}

/// Check that `name` is a dotted path of identifiers (`a`, `a.b`, `_a.b1`)
///
/// # Errors
///
/// Returns [`Error::Configuration`] naming the offending segment.
pub fn validate_module_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::config("extension name must not be empty"));
    }

    for segment in name.split('.') {
        if !MODULE_SEGMENT.is_match(segment) {
            return Err(Error::config(format!(
                "extension name '{name}' is not a loadable module path (bad segment '{segment}')"
            )));
        }
    }

    Ok(())
}

fn leaf_name(module: &str) -> &str {
    module.rsplit('.').next().unwrap_or(module)
}
