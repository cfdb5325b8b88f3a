//! Build command
//!
//! Compile every extension in the descriptor and place the loadable modules

use super::common::{BuildArgs, interrupted};
use anyhow::Result;
use extpack::{Error, PackageReport, build_package};

/// Build the package described by `args`
pub(crate) async fn run(args: &BuildArgs) -> Result<()> {
    let ctx = args.resolve()?;

    if !args.quiet {
        println!(
            "Building {} for {} (cargo {})",
            ctx.descriptor.full_name(),
            ctx.toolchain.target,
            ctx.toolchain.release
        );
        if let Some(host) = &ctx.options.host {
            if ctx.toolchain.is_cross() {
                println!("Skipping import check for cross target");
            } else {
                println!("Import check with {}", host.interpreter().display());
            }
        }
    }

    let report = tokio::select! {
        result = build_package(&ctx.descriptor, &ctx.toolchain, &ctx.options) => result?,
        () = interrupted() => {
            return Err(Error::Cancelled { package: ctx.descriptor.full_name() }.into());
        }
    };

    if !args.quiet {
        print_report(&report);
    }

    Ok(())
}

pub(crate) fn print_report(report: &PackageReport) {
    for artifact in &report.artifacts {
        println!("  {} -> {}", artifact.module, artifact.path.display());
    }
    println!(
        "Built {} in {:.2}s",
        report.package,
        report.duration.as_secs_f64()
    );
}
