//! Build pipeline
//!
//! Runs the steps strictly in order for one package:
//!
//! 1. bind every extension (configuration errors surface before any build)
//! 2. resolve every manifest (missing manifests surface before Cargo runs)
//! 3. compile every extension
//! 4. stage the libraries, check exports and import them in the host (native
//!    builds only; a cross-compiled module can't load in the host interpreter)
//! 5. place all artifacts in the output directory and write the build record
//!
//! Nothing reaches the output directory until every extension has compiled and
//! loaded, so a failure anywhere leaves the previous build intact.

use crate::artifact::{self, Artifact, BuildRecord};
use crate::binding::{BuildDirective, Profile};
use crate::compiler::{CompiledLibrary, CompilerInvocation};
use crate::debug;
use crate::descriptor::PackageDescriptor;
use crate::error::{Error, Result};
use crate::ledger::{Release, ReleaseLedger};
use crate::loader::{self, HostRuntime};
use crate::toolchain::Toolchain;
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Options for [`build_package`]
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Directory modules are placed in
    pub out_dir: PathBuf,
    /// Shared Cargo target directory (defaults to each crate's `target/`)
    pub target_dir: Option<PathBuf>,
    /// Force a profile for every extension
    pub profile: Option<Profile>,
    /// Interpreter used to import staged modules; `None` skips the import
    pub host: Option<HostRuntime>,
    /// Print per-extension progress and Cargo output
    pub verbose: bool,
    /// Show a spinner while Cargo runs
    pub progress: bool,
}

/// Outcome of a successful package build
#[derive(Debug, Clone)]
pub struct PackageReport {
    pub package: String,
    pub artifacts: Vec<Artifact>,
    /// Location of the written build record
    pub record: PathBuf,
    pub duration: Duration,
}

/// Build, verify and place every extension of `descriptor`
///
/// # Errors
///
/// Returns the first error of any step; see the module docs for ordering.
pub async fn build_package(
    descriptor: &PackageDescriptor,
    toolchain: &Toolchain,
    options: &BuildOptions,
) -> Result<PackageReport> {
    let start_time = Instant::now();

    let directives = plan(descriptor, options)?;

    let mut compiled = Vec::with_capacity(directives.len());
    for directive in &directives {
        let library = compile(directive, toolchain, options).await?;
        compiled.push(library);
    }

    let staging = TempDir::new().map_err(|e| Error::io(std::env::temp_dir(), e))?;
    for (directive, library) in directives.iter().zip(&compiled) {
        let staged = staging
            .path()
            .join(directive.relative_artifact_path(&toolchain.target));
        artifact::place_atomically(&library.path, &staged)?;
        loader::check_exports(&staged, &directive.module, &directive.init_symbol())?;
    }

    match &options.host {
        Some(_) if toolchain.is_cross() => {
            debug!(
                "skipping host import: built for {} on {}",
                toolchain.target, toolchain.host
            );
        }
        Some(host) => {
            for directive in &directives {
                host.verify_import(staging.path(), &directive.module).await?;
            }
        }
        None => {}
    }

    let mut artifacts = Vec::with_capacity(directives.len());
    for directive in &directives {
        let relative = directive.relative_artifact_path(&toolchain.target);
        let dest = options.out_dir.join(&relative);
        let sha256 = artifact::place_atomically(&staging.path().join(&relative), &dest)?;

        if options.verbose {
            println!("Placed {} at {}", directive.module, dest.display());
        }

        artifacts.push(Artifact {
            module: directive.module.clone(),
            path: dest,
            version: descriptor.version().clone(),
            binding: directive.binding,
            init_symbol: directive.init_symbol(),
            target: toolchain.target.clone(),
            sha256,
        });
    }

    let record = BuildRecord {
        package: descriptor.name().to_string(),
        version: descriptor.version().clone(),
        toolchain: toolchain.release.clone(),
        artifacts,
    };
    let record_path = record.write(&options.out_dir)?;

    debug!(
        "built {} in {:?}",
        descriptor.full_name(),
        start_time.elapsed()
    );

    Ok(PackageReport {
        package: descriptor.full_name(),
        artifacts: record.artifacts,
        record: record_path,
        duration: start_time.elapsed(),
    })
}

/// Bind every extension and resolve every manifest without compiling
///
/// # Errors
///
/// [`Error::Configuration`] for a bad extension, then
/// [`Error::MissingArtifact`] for the first unresolvable manifest.
pub fn plan(descriptor: &PackageDescriptor, options: &BuildOptions) -> Result<Vec<BuildDirective>> {
    let mut directives = descriptor.directives()?;

    for (directive, declaration) in directives.iter_mut().zip(descriptor.extensions()) {
        directive.manifest = declaration.resolve_manifest(descriptor.root())?;
        if let Some(profile) = options.profile {
            directive.profile = profile;
        }
    }

    Ok(directives)
}

async fn compile(
    directive: &BuildDirective,
    toolchain: &Toolchain,
    options: &BuildOptions,
) -> Result<CompiledLibrary> {
    if options.verbose {
        println!(
            "Building {} ({}, {})...",
            directive.module,
            directive.binding,
            directive.profile.dir_name()
        );
    }

    let spinner = options.progress.then(|| {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Compiling {}", directive.module));
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    });

    let mut invocation =
        CompilerInvocation::new(directive, toolchain).with_target_dir(options.target_dir.clone());
    let result = invocation.build().await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    let library = result?;
    if options.verbose {
        print!("{}", library.output);
        println!(
            "Compiled {} in {:.2}s",
            directive.module,
            library.duration.as_secs_f64()
        );
    }

    Ok(library)
}

/// Check the ledger, build, then record the release
///
/// The version check runs first, so a regressing version never reaches Cargo.
///
/// # Errors
///
/// [`Error::Configuration`] for a non-monotonic version, otherwise whatever
/// [`build_package`] or [`ReleaseLedger::record`] returns.
pub async fn publish(
    descriptor: &PackageDescriptor,
    ledger: &mut ReleaseLedger,
    toolchain: &Toolchain,
    options: &BuildOptions,
) -> Result<(PackageReport, Release)> {
    ledger.admit(descriptor)?;

    let report = build_package(descriptor, toolchain, options).await?;
    let release = ledger
        .record(descriptor, &report.artifacts, Utc::now())?
        .clone();

    Ok((report, release))
}

/// Verify the artifacts listed in a build record are still loadable
///
/// # Errors
///
/// [`Error::MissingArtifact`] if there is no record or a file is gone,
/// [`Error::Load`] if a file changed or no longer exports its init symbol.
pub async fn verify_out_dir(out_dir: &Path, host: Option<&HostRuntime>) -> Result<BuildRecord> {
    let record = BuildRecord::read(out_dir)?.ok_or_else(|| Error::MissingArtifact {
        what: "build record".to_string(),
        path: out_dir.join(artifact::BUILD_RECORD_FILE),
    })?;

    for artifact in &record.artifacts {
        if !artifact.path.is_file() {
            return Err(Error::MissingArtifact {
                what: format!("module {}", artifact.module),
                path: artifact.path.clone(),
            });
        }

        let digest = artifact::sha256_file(&artifact.path)?;
        if digest != artifact.sha256 {
            return Err(Error::Load {
                module: artifact.module.clone(),
                diagnostic: format!(
                    "{} changed since it was built (sha256 {digest}, expected {})",
                    artifact.path.display(),
                    artifact.sha256
                ),
            });
        }

        loader::check_artifact(artifact)?;

        if let Some(host) = host {
            host.verify_import(out_dir, &artifact.module).await?;
        }
    }

    Ok(record)
}
