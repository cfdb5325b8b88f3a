//! Package descriptor
//!
//! The single declarative source of truth for what gets built and how it is
//! named and versioned. Parses `extpack.toml`:
//!
//! ```toml
//! [package]
//! name = "rustyknife"
//! version = "0.1.3"
//! zip-safe = false
//!
//! [[extension]]
//! name = "rustyknife"
//! manifest = "Cargo.toml"
//! binding = "pyo3"
//! ```
//!
//! Declaring a package never touches the build manifests it references; they
//! are resolved when a build actually runs.

use crate::binding::{self, BindingKind, BuildDirective, Profile};
use crate::error::{Error, Result};
use regex::Regex;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Default descriptor file name
pub const DESCRIPTOR_FILE: &str = "extpack.toml";

static PACKAGE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9._-]*[A-Za-z0-9])?$").expect("should build valid regex")
});

/// Pointer to a native crate and how to bind it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExtensionDeclaration {
    /// Module path the host imports
    pub name: String,
    /// `Cargo.toml` location, relative to the descriptor's directory
    pub manifest: PathBuf,
    #[serde(default)]
    pub binding: BindingKind,
    #[serde(default)]
    pub features: Vec<String>,
    /// Build with the debug profile instead of release
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub rustc_flags: Vec<String>,
}

impl ExtensionDeclaration {
    /// Create a declaration with default options
    #[must_use]
    pub fn new(name: impl Into<String>, manifest: impl Into<PathBuf>, binding: BindingKind) -> Self {
        Self {
            name: name.into(),
            manifest: manifest.into(),
            binding,
            features: Vec::new(),
            debug: false,
            rustc_flags: Vec::new(),
        }
    }

    /// Resolve the manifest against `root`
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingArtifact`] if no file exists at the resolved path.
    pub fn resolve_manifest(&self, root: &Path) -> Result<PathBuf> {
        let path = if self.manifest.is_absolute() {
            self.manifest.clone()
        } else {
            root.join(&self.manifest)
        };

        if path.is_file() {
            Ok(path)
        } else {
            Err(Error::MissingArtifact {
                what: format!("build manifest for extension '{}'", self.name),
                path,
            })
        }
    }

    /// Turn this declaration into a build directive rooted at `root`
    ///
    /// The manifest path is joined with `root` but not checked.
    ///
    /// # Errors
    ///
    /// Propagates [`binding::bind`] configuration errors.
    pub fn directive(&self, root: &Path) -> Result<BuildDirective> {
        let manifest = if self.manifest.is_absolute() {
            self.manifest.clone()
        } else {
            root.join(&self.manifest)
        };
        let profile = if self.debug {
            Profile::Debug
        } else {
            Profile::Release
        };

        Ok(binding::bind(&self.name, manifest, self.binding)?
            .with_profile(profile)
            .with_features(self.features.clone())
            .with_rustc_flags(self.rustc_flags.clone()))
    }
}

/// An immutable, validated package declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDescriptor {
    name: String,
    version: Version,
    zip_safe: bool,
    extensions: Vec<ExtensionDeclaration>,
    /// Directory manifests are resolved against
    root: PathBuf,
}

impl PackageDescriptor {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn version(&self) -> &Version {
        &self.version
    }

    #[must_use]
    pub const fn zip_safe(&self) -> bool {
        self.zip_safe
    }

    #[must_use]
    pub fn extensions(&self) -> &[ExtensionDeclaration] {
        &self.extensions
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Re-root the descriptor (manifests resolve relative to `root`)
    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Mark the package zip-safe or not
    #[must_use]
    pub const fn with_zip_safe(mut self, zip_safe: bool) -> Self {
        self.zip_safe = zip_safe;
        self
    }

    /// `name-version`, e.g. `rustyknife-0.1.3`
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }

    /// Load and declare a package from a descriptor file
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file can't be read, or
    /// [`Error::Configuration`] if it is malformed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let root = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

        Self::from_toml_str(&content, root)
    }

    /// Declare a package from descriptor text
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for TOML errors or invalid fields.
    pub fn from_toml_str(content: &str, root: impl Into<PathBuf>) -> Result<Self> {
        let file: DescriptorFile = toml::from_str(content)
            .map_err(|e| Error::config(format!("invalid descriptor: {e}")))?;

        Ok(declare(&file.package.name, &file.package.version, file.extension)?
            .with_zip_safe(file.package.zip_safe)
            .with_root(root))
    }

    /// Serialize back to descriptor TOML
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if serialization fails.
    pub fn to_toml_string(&self) -> Result<String> {
        let file = DescriptorFile {
            package: PackageSection {
                name: self.name.clone(),
                version: self.version.to_string(),
                zip_safe: self.zip_safe,
            },
            extension: self.extensions.clone(),
        };

        toml::to_string_pretty(&file)
            .map_err(|e| Error::config(format!("failed to serialize descriptor: {e}")))
    }

    /// Build directives for every extension, failing on the first bad one
    ///
    /// # Errors
    ///
    /// Returns the first [`Error::Configuration`] encountered.
    pub fn directives(&self) -> Result<Vec<BuildDirective>> {
        self.extensions
            .iter()
            .map(|ext| ext.directive(&self.root))
            .collect()
    }
}

/// Declare a package
///
/// Validates identity and extension names. Manifests are not resolved here.
///
/// # Errors
///
/// Returns [`Error::Configuration`] if the name is empty or invalid, the
/// version is not valid semver, there are no extensions, or two extensions
/// share a name.
pub fn declare(
    name: &str,
    version: &str,
    extensions: Vec<ExtensionDeclaration>,
) -> Result<PackageDescriptor> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::config("package name must not be empty"));
    }
    if !PACKAGE_NAME.is_match(name) {
        return Err(Error::config(format!("invalid package name '{name}'")));
    }

    let version = Version::parse(version.trim())
        .map_err(|e| Error::config(format!("invalid version '{version}': {e}")))?;

    if extensions.is_empty() {
        return Err(Error::config(format!(
            "package '{name}' declares no extensions"
        )));
    }

    let mut seen = HashSet::new();
    for ext in &extensions {
        binding::validate_module_name(&ext.name)?;
        if !seen.insert(ext.name.as_str()) {
            return Err(Error::config(format!(
                "extension '{}' is declared more than once",
                ext.name
            )));
        }
    }

    Ok(PackageDescriptor {
        name: name.to_string(),
        version,
        zip_safe: false,
        extensions,
        root: PathBuf::from("."),
    })
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct DescriptorFile {
    package: PackageSection,
    #[serde(default)]
    extension: Vec<ExtensionDeclaration>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PackageSection {
    name: String,
    version: String,
    #[serde(default)]
    zip_safe: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const RUSTYKNIFE: &str = r#"
[package]
name = "rustyknife"
version = "0.1.1"

[[extension]]
name = "rustyknife"
manifest = "Cargo.toml"
binding = "pyo3"
"#;

    fn knife() -> ExtensionDeclaration {
        ExtensionDeclaration::new("rustyknife", "Cargo.toml", BindingKind::PyO3)
    }

    #[test]
    fn declare_valid_package() {
        let pkg = declare("rustyknife", "0.1.1", vec![knife()]).unwrap();

        assert_eq!(pkg.name(), "rustyknife");
        assert_eq!(pkg.version(), &Version::new(0, 1, 1));
        assert_eq!(pkg.full_name(), "rustyknife-0.1.1");
        assert!(!pkg.zip_safe());
    }

    #[test]
    fn declare_rejects_malformed_version() {
        for version in ["", "0.1", "one", "0.1.1.1", "v0.1.1"] {
            let result = declare("rustyknife", version, vec![knife()]);
            assert!(
                matches!(result, Err(Error::Configuration(_))),
                "{version:?} should be rejected"
            );
        }
    }

    #[test]
    fn declare_rejects_bad_names() {
        assert!(matches!(
            declare("  ", "0.1.1", vec![knife()]),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            declare("rusty knife", "0.1.1", vec![knife()]),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn declare_requires_unique_extensions() {
        assert!(matches!(
            declare("rustyknife", "0.1.1", vec![]),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            declare("rustyknife", "0.1.1", vec![knife(), knife()]),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn declare_does_not_resolve_manifest() {
        let ext = ExtensionDeclaration::new("rustyknife", "/does/not/exist/Cargo.toml", BindingKind::PyO3);
        assert!(declare("rustyknife", "0.1.1", vec![ext]).is_ok());
    }

    #[test]
    fn parse_descriptor_text() {
        let pkg = PackageDescriptor::from_toml_str(RUSTYKNIFE, "/src/knife").unwrap();

        assert_eq!(pkg.root(), Path::new("/src/knife"));
        let ext = pkg.extensions().first().unwrap();
        assert_eq!(ext.binding, BindingKind::PyO3);
        assert!(!ext.debug);
    }

    #[test]
    fn parse_rejects_unknown_binding() {
        let content = RUSTYKNIFE.replace(r#"binding = "pyo3""#, r#"binding = "cffi""#);
        let result = PackageDescriptor::from_toml_str(&content, ".");
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn parse_extension_options() {
        let content = r#"
[package]
name = "rustyknife"
version = "0.1.3"
zip-safe = true

[[extension]]
name = "rustyknife"
manifest = "native/Cargo.toml"
features = ["python"]
debug = true
rustc-flags = ["-Ctarget-cpu=native"]
"#;
        let pkg = PackageDescriptor::from_toml_str(content, "/pkg").unwrap();
        assert!(pkg.zip_safe());

        let directive = pkg.directives().unwrap().remove(0);
        assert_eq!(directive.manifest, PathBuf::from("/pkg/native/Cargo.toml"));
        assert_eq!(directive.profile, Profile::Debug);
        assert_eq!(directive.features, vec!["python".to_string()]);
        assert_eq!(directive.rustc_flags, vec!["-Ctarget-cpu=native".to_string()]);
    }

    #[test]
    fn load_resolves_relative_to_descriptor() -> Result<()> {
        let temp = TempDir::new().map_err(|e| Error::io("tempdir", e))?;
        let descriptor = temp.path().join(DESCRIPTOR_FILE);
        fs::write(&descriptor, RUSTYKNIFE).map_err(|e| Error::io(&descriptor, e))?;

        let pkg = PackageDescriptor::load(&descriptor)?;
        let ext = pkg.extensions().first().unwrap();

        assert!(matches!(
            ext.resolve_manifest(pkg.root()),
            Err(Error::MissingArtifact { .. })
        ));

        fs::write(temp.path().join("Cargo.toml"), "[package]\n").map_err(|e| Error::io("Cargo.toml", e))?;
        assert_eq!(
            ext.resolve_manifest(pkg.root())?,
            temp.path().join("Cargo.toml")
        );

        Ok(())
    }

    #[test]
    fn toml_roundtrip_preserves_identity() {
        let pkg = PackageDescriptor::from_toml_str(RUSTYKNIFE, ".").unwrap();
        let text = pkg.to_toml_string().unwrap();
        let again = PackageDescriptor::from_toml_str(&text, ".").unwrap();

        assert_eq!(pkg, again);
    }
}
