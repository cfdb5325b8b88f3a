//! Verify command
//!
//! Re-check a previous build: files present, unchanged, exporting their init
//! symbols and (optionally) importable by the host interpreter.

use anyhow::{Context, Result};
use extpack::{Config, HostRuntime, config, pipeline};
use std::path::Path;

/// Verify the build record in `out_dir`
pub(crate) async fn run(
    out_dir: &Path,
    python: Option<&Path>,
    import: bool,
    cfg: &Config,
) -> Result<()> {
    let host = if import {
        let python = config::python(python, cfg);
        Some(
            HostRuntime::detect(python.as_deref())
                .context("Failed to locate the host interpreter")?,
        )
    } else {
        None
    };

    if let Some(host) = &host {
        println!("Import check with {}", host.interpreter().display());
    }

    let record = pipeline::verify_out_dir(out_dir, host.as_ref()).await?;

    for artifact in &record.artifacts {
        println!("  {} ok ({})", artifact.module, artifact.path.display());
    }
    println!(
        "Verified {}-{} ({} module{})",
        record.package,
        record.version,
        record.artifacts.len(),
        if record.artifacts.len() == 1 { "" } else { "s" }
    );

    Ok(())
}
