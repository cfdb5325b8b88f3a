//! Init command
//!
//! Create an extpack.toml next to a Cargo crate

use anyhow::{Context, Result};
use extpack::{BindingKind, DESCRIPTOR_FILE, ExtensionDeclaration, declare};
use std::fs;
use std::path::Path;

/// Version used when the crate manifest doesn't carry one
const DEFAULT_VERSION: &str = "0.1.0";

/// Write a descriptor for the crate in `path`
///
/// Name and version come from `Cargo.toml` when present, otherwise from the
/// directory name.
pub(crate) fn run(path: &Path, name: Option<&str>, force: bool) -> Result<()> {
    let descriptor_path = path.join(DESCRIPTOR_FILE);

    if descriptor_path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            descriptor_path.display()
        );
    }

    fs::create_dir_all(path)
        .with_context(|| format!("Failed to create directory {}", path.display()))?;

    let manifest = read_manifest(&path.join("Cargo.toml"))?;

    let package_name = match name {
        Some(name) => name.to_string(),
        None => match manifest.as_ref().and_then(|m| m.name.clone()) {
            Some(name) => name,
            None => directory_name(path)?,
        },
    };
    let version = manifest
        .and_then(|m| m.version)
        .unwrap_or_else(|| DEFAULT_VERSION.to_string());

    let module = package_name.replace('-', "_");
    let extension = ExtensionDeclaration::new(module, "Cargo.toml", BindingKind::default());

    let descriptor = declare(&package_name, &version, vec![extension])?;
    let content = descriptor.to_toml_string()?;

    fs::write(&descriptor_path, content)
        .with_context(|| format!("Failed to write {}", descriptor_path.display()))?;

    println!("Created {}", descriptor_path.display());
    Ok(())
}

#[derive(Debug, Default)]
struct CrateManifest {
    name: Option<String>,
    version: Option<String>,
}

fn read_manifest(path: &Path) -> Result<Option<CrateManifest>> {
    if !path.exists() {
        return Ok(None);
    }

    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let value: toml::Table =
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))?;

    let package = value.get("package").and_then(toml::Value::as_table);
    let field = |key: &str| {
        package
            .and_then(|p| p.get(key))
            .and_then(toml::Value::as_str)
            .map(String::from)
    };

    Ok(Some(CrateManifest {
        name: field("name"),
        version: field("version"),
    }))
}

fn directory_name(path: &Path) -> Result<String> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .context("Failed to get current directory")?
            .join(path)
    };

    absolute
        .components()
        .next_back()
        .and_then(|c| c.as_os_str().to_str())
        .filter(|name| *name != "." && *name != "..")
        .map(String::from)
        .context("Cannot derive a package name from the directory; pass --name")
}

#[cfg(test)]
mod tests {
    use super::*;
    use extpack::PackageDescriptor;
    use tempfile::TempDir;

    #[test]
    fn uses_cargo_manifest_identity() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("Cargo.toml"),
            "[package]\nname = \"rusty-knife\"\nversion = \"0.1.3\"\n",
        )
        .unwrap();

        run(temp.path(), None, false).unwrap();

        let descriptor = PackageDescriptor::load(temp.path().join(DESCRIPTOR_FILE)).unwrap();
        assert_eq!(descriptor.name(), "rusty-knife");
        assert_eq!(descriptor.version().to_string(), "0.1.3");
        assert_eq!(
            descriptor.extensions().first().map(|e| e.name.as_str()),
            Some("rusty_knife")
        );
    }

    #[test]
    fn explicit_name_without_manifest() {
        let temp = TempDir::new().unwrap();

        run(temp.path(), Some("rustyknife"), false).unwrap();

        let descriptor = PackageDescriptor::load(temp.path().join(DESCRIPTOR_FILE)).unwrap();
        assert_eq!(descriptor.name(), "rustyknife");
        assert_eq!(descriptor.version().to_string(), DEFAULT_VERSION);
    }

    #[test]
    fn refuses_to_overwrite() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(DESCRIPTOR_FILE), "keep me").unwrap();

        let err = run(temp.path(), Some("rustyknife"), false).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert_eq!(
            fs::read_to_string(temp.path().join(DESCRIPTOR_FILE)).unwrap(),
            "keep me"
        );

        run(temp.path(), Some("rustyknife"), true).unwrap();
        assert!(PackageDescriptor::load(temp.path().join(DESCRIPTOR_FILE)).is_ok());
    }
}
