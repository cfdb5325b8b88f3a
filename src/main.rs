//! extpack command-line interface
//!
//! Declare, build and publish a package of native Python extension modules
//! written in Rust

use clap::{Parser, Subcommand};
use commands::common::{BuildArgs, PackageArgs};
use std::path::PathBuf;
use std::process;

/// Exit status for a build cancelled with Ctrl-C
const EXIT_CANCELLED: i32 = 130;

/// Display an error with optional backtrace information
fn display_error(err: &anyhow::Error, backtrace_enabled: bool) {
    eprintln!("error: {err}");

    let mut source = err.source();
    while let Some(err) = source {
        eprintln!("caused by: {err}");
        source = err.source();
    }

    // Capture still requires RUST_BACKTRACE or RUST_LIB_BACKTRACE
    if backtrace_enabled {
        let backtrace = err.backtrace();
        if backtrace.status() == std::backtrace::BacktraceStatus::Captured {
            eprintln!("\nBacktrace:");
            eprintln!("{backtrace}");
        }
    }
}

fn library_error(err: &anyhow::Error) -> Option<&extpack::Error> {
    err.chain().find_map(|cause| cause.downcast_ref::<extpack::Error>())
}

#[derive(Parser)]
#[command(name = "extpack")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build and publish Rust-backed Python extension modules", long_about = None)]
#[command(disable_version_flag = true)]
pub(crate) struct Cli {
    /// Print version
    #[arg(short = 'V', long = "version", action = clap::ArgAction::Version)]
    _version: Option<bool>,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Show stack backtrace on errors
    #[arg(long, global = true)]
    backtrace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an extpack.toml for a Cargo crate
    Init {
        /// Directory containing the crate
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Package name [default: Cargo package name or directory name]
        #[arg(long)]
        name: Option<String>,

        /// Overwrite an existing descriptor
        #[arg(long)]
        force: bool,
    },

    /// Print package name, version and extensions
    Metadata {
        #[command(flatten)]
        package: PackageArgs,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Validate the descriptor without compiling
    Check {
        #[command(flatten)]
        package: PackageArgs,

        /// Release ledger to check the version against
        #[arg(long, value_name = "PATH", env = "EXTPACK_LEDGER")]
        ledger: Option<PathBuf>,

        /// Suppress all output except errors
        #[arg(long, short)]
        quiet: bool,
    },

    /// Compile every extension and place the modules in the output directory
    Build {
        #[command(flatten)]
        args: BuildArgs,
    },

    /// Build and record a new release in the ledger
    Publish {
        #[command(flatten)]
        args: BuildArgs,

        /// Release ledger [default: <data dir>/extpack/releases.json]
        #[arg(long, value_name = "PATH", env = "EXTPACK_LEDGER")]
        ledger: Option<PathBuf>,
    },

    /// List published releases
    Releases {
        /// Only list this package
        name: Option<String>,

        /// Release ledger [default: <data dir>/extpack/releases.json]
        #[arg(long, value_name = "PATH", env = "EXTPACK_LEDGER")]
        ledger: Option<PathBuf>,

        /// Use this config file
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Ignore config files
        #[arg(long)]
        no_config: bool,
    },

    /// Check that previously built modules are intact and loadable
    Verify {
        #[command(flatten)]
        package: PackageArgs,

        /// Output directory to verify [default: from descriptor and config]
        #[arg(long, short = 'o', value_name = "DIR")]
        out_dir: Option<PathBuf>,

        /// Python interpreter used to import the modules
        #[arg(long, value_name = "PATH")]
        python: Option<PathBuf>,

        /// Skip importing modules in the host interpreter
        #[arg(long)]
        no_import_check: bool,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    extpack::init_debug(cli.debug);
    let backtrace = cli.backtrace;

    let result = run(cli.command).await;

    if let Err(e) = result {
        let lib_err = library_error(&e);
        if let Some(lib_err) = lib_err {
            extpack::debug!("{} raised", lib_err.kind());
        }
        display_error(&e, backtrace);

        let code = match lib_err {
            Some(extpack::Error::Cancelled { .. }) => EXIT_CANCELLED,
            _ => 1,
        };
        process::exit(code);
    }
}

async fn run(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Init { path, name, force } => commands::init::run(&path, name.as_deref(), force),
        Commands::Metadata { package, json } => commands::metadata::run(&package, json),
        Commands::Check {
            package,
            ledger,
            quiet,
        } => commands::check::run(&package, ledger.as_deref(), quiet),
        Commands::Build { args } => commands::build::run(&args).await,
        Commands::Publish { args, ledger } => commands::publish::run(&args, ledger.as_deref()).await,
        Commands::Releases {
            name,
            ledger,
            config,
            no_config,
        } => {
            let cfg = extpack::Config::load_with_options(
                config.as_deref(),
                no_config || extpack::env_vars::no_config(),
            )?;
            commands::releases::run(name.as_deref(), ledger.as_deref(), &cfg)
        }
        Commands::Verify {
            package,
            out_dir,
            python,
            no_import_check,
        } => {
            let cfg = package.load_config()?;
            let out_dir = match out_dir {
                Some(dir) => dir,
                None => {
                    let descriptor = package.load_descriptor()?;
                    extpack::config::out_dir(None, &cfg, descriptor.root())
                }
            };
            commands::verify::run(&out_dir, python.as_deref(), !no_import_check, &cfg).await
        }
        Commands::Completion { shell } => commands::completion::run(shell),
    }
}

mod commands;
