//! Metadata command
//!
//! Print package identity and extensions without building anything

use super::common::PackageArgs;
use anyhow::{Context, Result};
use extpack::{ExtensionDeclaration, PackageDescriptor};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct Metadata<'a> {
    name: &'a str,
    version: String,
    full_name: String,
    zip_safe: bool,
    extensions: &'a [ExtensionDeclaration],
}

impl<'a> From<&'a PackageDescriptor> for Metadata<'a> {
    fn from(descriptor: &'a PackageDescriptor) -> Self {
        Self {
            name: descriptor.name(),
            version: descriptor.version().to_string(),
            full_name: descriptor.full_name(),
            zip_safe: descriptor.zip_safe(),
            extensions: descriptor.extensions(),
        }
    }
}

/// Print metadata for the descriptor in `args`
pub(crate) fn run(args: &PackageArgs, json: bool) -> Result<()> {
    let descriptor = args.load_descriptor()?;
    println!("{}", render(&descriptor, json)?);
    Ok(())
}

fn render(descriptor: &PackageDescriptor, json: bool) -> Result<String> {
    let metadata = Metadata::from(descriptor);

    if json {
        return serde_json::to_string_pretty(&metadata).context("Failed to serialize metadata");
    }

    let mut lines = vec![
        format!("name: {}", metadata.name),
        format!("version: {}", metadata.version),
        format!("zip-safe: {}", metadata.zip_safe),
        "extensions:".to_string(),
    ];
    for ext in metadata.extensions {
        let mut line = format!("  {} ({}) {}", ext.name, ext.binding, ext.manifest.display());
        if !ext.features.is_empty() {
            line = format!("{line} [features: {}]", ext.features.join(", "));
        }
        if ext.debug {
            line.push_str(" [debug]");
        }
        lines.push(line);
    }

    Ok(lines.join("\n"))
}
