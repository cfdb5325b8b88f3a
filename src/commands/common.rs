//! Shared command plumbing
//!
//! Flag parsing shared by `check`, `build`, `publish` and `verify`, and the
//! flag -> environment -> config -> default resolution for each setting.

use anyhow::{Context, Result};
use clap::Args;
use extpack::{
    BuildOptions, Config, DESCRIPTOR_FILE, HostRuntime, PackageDescriptor, Profile, Toolchain,
    config,
};
use std::path::{Path, PathBuf};

/// Options shared by every command that reads a descriptor
#[derive(Debug, Args)]
pub(crate) struct PackageArgs {
    /// Path to the package descriptor
    #[arg(long, short = 'f', default_value = DESCRIPTOR_FILE)]
    pub(crate) descriptor: PathBuf,

    /// Use this config file instead of .extpack.toml / ~/.config/extpack/config.toml
    #[arg(long, value_name = "PATH")]
    pub(crate) config: Option<PathBuf>,

    /// Ignore config files
    #[arg(long)]
    pub(crate) no_config: bool,
}

impl PackageArgs {
    pub(crate) fn load_config(&self) -> Result<Config> {
        Config::load_with_options(
            self.config.as_deref(),
            self.no_config || extpack::env_vars::no_config(),
        )
    }

    pub(crate) fn load_descriptor(&self) -> Result<PackageDescriptor> {
        load_descriptor(&self.descriptor)
    }
}

/// Options for commands that compile
#[derive(Debug, Args)]
pub(crate) struct BuildArgs {
    #[command(flatten)]
    pub(crate) package: PackageArgs,

    /// Directory built modules are placed in [default: <package>/build/lib]
    #[arg(long, short = 'o', value_name = "DIR")]
    pub(crate) out_dir: Option<PathBuf>,

    /// Cargo target directory [default: <crate>/target]
    #[arg(long, value_name = "DIR")]
    pub(crate) target_dir: Option<PathBuf>,

    /// Target triple to build for [default: host]
    #[arg(long)]
    pub(crate) target: Option<String>,

    /// Cargo executable
    #[arg(long, value_name = "PATH")]
    pub(crate) cargo: Option<PathBuf>,

    /// Python interpreter used to import built modules
    #[arg(long, value_name = "PATH")]
    pub(crate) python: Option<PathBuf>,

    /// Skip importing built modules in the host interpreter
    #[arg(long)]
    pub(crate) no_import_check: bool,

    /// Build every extension with the debug profile
    #[arg(long, conflicts_with = "release")]
    pub(crate) dev: bool,

    /// Build every extension with the release profile
    #[arg(long)]
    pub(crate) release: bool,

    /// Show Cargo output and per-extension progress
    #[arg(long, short)]
    pub(crate) verbose: bool,

    /// Suppress all output except errors
    #[arg(long, short, conflicts_with = "verbose")]
    pub(crate) quiet: bool,
}

/// Everything a build needs, resolved once
#[derive(Debug)]
pub(crate) struct BuildContext {
    pub(crate) descriptor: PackageDescriptor,
    pub(crate) toolchain: Toolchain,
    pub(crate) options: BuildOptions,
    pub(crate) config: Config,
}

impl BuildArgs {
    pub(crate) const fn profile(&self) -> Option<Profile> {
        if self.dev {
            Some(Profile::Debug)
        } else if self.release {
            Some(Profile::Release)
        } else {
            None
        }
    }

    /// Load the descriptor and resolve toolchain, host and directories
    ///
    /// Descriptor errors come first so configuration problems never wait on
    /// toolchain discovery.
    pub(crate) fn resolve(&self) -> Result<BuildContext> {
        let descriptor = self.package.load_descriptor()?;
        let cfg = self.package.load_config()?;

        let cargo = config::cargo(self.cargo.as_deref(), &cfg);
        let target = config::target(self.target.as_deref(), &cfg);
        let toolchain = Toolchain::detect(cargo.as_deref(), target.as_deref())
            .context("Failed to locate the Rust toolchain")?;

        let host = if self.no_import_check {
            None
        } else {
            let python = config::python(self.python.as_deref(), &cfg);
            Some(
                HostRuntime::detect(python.as_deref())
                    .context("Failed to locate the host interpreter (use --no-import-check to skip)")?,
            )
        };

        let options = BuildOptions {
            out_dir: config::out_dir(self.out_dir.as_deref(), &cfg, descriptor.root()),
            target_dir: config::target_dir(self.target_dir.as_deref(), &cfg),
            profile: self.profile(),
            host,
            verbose: self.verbose,
            progress: !self.quiet && !self.verbose && std::io::IsTerminal::is_terminal(&std::io::stderr()),
        };

        Ok(BuildContext {
            descriptor,
            toolchain,
            options,
            config: cfg,
        })
    }
}

/// Load a descriptor with a helpful error
pub(crate) fn load_descriptor(path: &Path) -> Result<PackageDescriptor> {
    PackageDescriptor::load(path)
        .with_context(|| format!("Failed to load package descriptor {}", path.display()))
}

/// Wait for Ctrl-C; used to cancel a running build
pub(crate) async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available: never resolve
        std::future::pending::<()>().await;
    }
}
