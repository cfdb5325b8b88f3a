//! Check command
//!
//! Validate a descriptor without compiling: identity, bindings, manifests and
//! (when a ledger exists) that the version moves forward.

use super::common::PackageArgs;
use anyhow::Result;
use extpack::{BuildOptions, ReleaseLedger, config, pipeline};
use std::path::Path;

/// Check the package described by `args`
pub(crate) fn run(args: &PackageArgs, ledger_path: Option<&Path>, quiet: bool) -> Result<()> {
    let descriptor = args.load_descriptor()?;
    let cfg = args.load_config()?;

    let directives = pipeline::plan(&descriptor, &BuildOptions::default())?;

    if !quiet {
        println!("{}", descriptor.full_name());
        for directive in &directives {
            println!(
                "  {} ({}, {}) <- {}",
                directive.module,
                directive.binding,
                directive.profile.dir_name(),
                directive.manifest.display()
            );
        }
    }

    // An explicit ledger must be readable; the default one may not exist yet
    let ledger = match ledger_path {
        Some(path) => Some(ReleaseLedger::open(path)?),
        None => match config::ledger(None, &cfg) {
            Ok(path) if path.exists() => Some(ReleaseLedger::open(path)?),
            _ => None,
        },
    };

    if let Some(ledger) = ledger {
        ledger.admit(&descriptor)?;
        if !quiet {
            match ledger.latest(descriptor.name()) {
                Some(latest) => println!("Version {} follows {latest}", descriptor.version()),
                None => println!("No published releases of {}", descriptor.name()),
            }
        }
    }

    if !quiet {
        println!("Descriptor is valid");
    }

    Ok(())
}
