//! Publish command
//!
//! Build the package and record its version in the release ledger. The ledger
//! only accepts versions greater than every published one.

use super::build::print_report;
use super::common::{BuildArgs, interrupted};
use anyhow::{Context, Result};
use extpack::{Error, ReleaseLedger, config, pipeline};
use std::path::Path;

/// Publish the package described by `args`
pub(crate) async fn run(args: &BuildArgs, ledger_path: Option<&Path>) -> Result<()> {
    let ctx = args.resolve()?;
    let ledger_path = config::ledger(ledger_path, &ctx.config)?;
    let mut ledger = ReleaseLedger::open(&ledger_path)
        .with_context(|| format!("Failed to open release ledger {}", ledger_path.display()))?;

    if !args.quiet {
        match ledger.latest(ctx.descriptor.name()) {
            Some(latest) => println!(
                "Publishing {} (previous release {latest})",
                ctx.descriptor.full_name()
            ),
            None => println!("Publishing {} (first release)", ctx.descriptor.full_name()),
        }
    }

    let (report, release) = tokio::select! {
        result = pipeline::publish(&ctx.descriptor, &mut ledger, &ctx.toolchain, &ctx.options) => result?,
        () = interrupted() => {
            return Err(Error::Cancelled { package: ctx.descriptor.full_name() }.into());
        }
    };

    if !args.quiet {
        print_report(&report);
        println!(
            "Recorded {} {} in {}",
            ctx.descriptor.name(),
            release.version,
            ledger.path().display()
        );
    }

    Ok(())
}
