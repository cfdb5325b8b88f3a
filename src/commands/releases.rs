//! Releases command
//!
//! List versions recorded in the release ledger

use anyhow::Result;
use extpack::{Config, ReleaseLedger, config};
use std::path::Path;

/// List releases of `name`, or of every package when `name` is `None`
pub(crate) fn run(name: Option<&str>, ledger_path: Option<&Path>, cfg: &Config) -> Result<()> {
    let ledger = ReleaseLedger::open(config::ledger(ledger_path, cfg)?)?;
    let lines = render(&ledger, name);

    if lines.is_empty() {
        match name {
            Some(name) => println!("No releases of {name} in {}", ledger.path().display()),
            None => println!("No releases in {}", ledger.path().display()),
        }
    } else {
        for line in lines {
            println!("{line}");
        }
    }

    Ok(())
}

fn render(ledger: &ReleaseLedger, name: Option<&str>) -> Vec<String> {
    let names: Vec<&str> = match name {
        Some(name) => vec![name],
        None => ledger.packages().collect(),
    };

    let mut lines = Vec::new();
    for package in names {
        let releases = ledger.releases(package);
        if releases.is_empty() {
            continue;
        }
        lines.push(format!("{package}:"));
        for release in releases {
            let modules: Vec<&str> = release
                .artifacts
                .iter()
                .map(|a| a.module.as_str())
                .collect();
            lines.push(format!(
                "  {} ({}) {}",
                release.version,
                release.published_at.format("%Y-%m-%d %H:%M:%S UTC"),
                modules.join(", ")
            ));
        }
    }
    lines
}
