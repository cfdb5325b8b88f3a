//! Compiler invocation
//!
//! Drives Cargo to turn a [`BuildDirective`] into a shared library:
//!
//! ```bash
//! cargo rustc --lib --manifest-path Cargo.toml --target-dir target \
//!     --target x86_64-unknown-linux-gnu --message-format=json-render-diagnostics \
//!     --release -- <rustc flags> <binding link args>
//! ```
//!
//! The compiled file is found from Cargo's `compiler-artifact` messages rather
//! than guessed from naming conventions. Cargo is spawned with kill-on-drop, so
//! dropping the build future (e.g. on Ctrl-C) stops the compiler too.

use crate::binding::{BuildDirective, Profile};
use crate::debug;
use crate::error::{Error, Result};
use crate::toolchain::Toolchain;
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

/// Lifecycle of one compilation
///
/// `Succeeded` and `Failed` are terminal. A failed build is never retried
/// automatically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildState {
    /// Requested, manifest not yet resolved
    Pending,
    /// Cargo is running
    Compiling,
    /// Holds the compiled library inside the Cargo target directory
    Succeeded(PathBuf),
    Failed,
}

impl BuildState {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded(_) | Self::Failed)
    }
}

/// Outcome of a successful compilation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledLibrary {
    /// Library path inside the Cargo target directory
    pub path: PathBuf,
    pub duration: Duration,
    /// Combined Cargo output, kept for `--verbose`
    pub output: String,
}

/// One Cargo run for one directive
#[derive(Debug)]
pub struct CompilerInvocation<'a> {
    directive: &'a BuildDirective,
    toolchain: &'a Toolchain,
    target_dir: Option<PathBuf>,
    state: BuildState,
}

impl<'a> CompilerInvocation<'a> {
    /// Prepare an invocation; nothing runs until [`Self::build`]
    #[must_use]
    pub const fn new(directive: &'a BuildDirective, toolchain: &'a Toolchain) -> Self {
        Self {
            directive,
            toolchain,
            target_dir: None,
            state: BuildState::Pending,
        }
    }

    /// Use a specific Cargo target directory instead of `<crate>/target`
    #[must_use]
    pub fn with_target_dir(mut self, target_dir: Option<PathBuf>) -> Self {
        self.target_dir = target_dir;
        self
    }

    #[must_use]
    pub const fn state(&self) -> &BuildState {
        &self.state
    }

    /// Compile the extension
    ///
    /// # Errors
    ///
    /// - [`Error::MissingArtifact`] if the manifest doesn't exist (Cargo is
    ///   never started)
    /// - [`Error::Toolchain`] if Cargo can't be spawned
    /// - [`Error::Build`] with Cargo's stderr if compilation fails or produces
    ///   no `cdylib`
    pub async fn build(&mut self) -> Result<CompiledLibrary> {
        if self.state.is_terminal() {
            return Err(Error::config(format!(
                "build of extension {} already finished",
                self.directive.module
            )));
        }

        let manifest = match self.resolve_manifest() {
            Ok(manifest) => manifest,
            Err(e) => {
                self.state = BuildState::Failed;
                return Err(e);
            }
        };

        self.state = BuildState::Compiling;
        match self.run_cargo(&manifest).await {
            Ok(library) => {
                self.state = BuildState::Succeeded(library.path.clone());
                Ok(library)
            }
            Err(e) => {
                self.state = BuildState::Failed;
                Err(e)
            }
        }
    }

    fn resolve_manifest(&self) -> Result<PathBuf> {
        let manifest = &self.directive.manifest;
        if manifest.is_file() {
            Ok(manifest.clone())
        } else {
            Err(Error::MissingArtifact {
                what: format!("build manifest for extension '{}'", self.directive.module),
                path: manifest.clone(),
            })
        }
    }

    /// Cargo target directory for this build
    #[must_use]
    pub fn target_dir(&self) -> PathBuf {
        self.target_dir.clone().unwrap_or_else(|| {
            self.directive
                .manifest
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."))
                .join("target")
        })
    }

    /// Arguments passed to Cargo (without the executable)
    #[must_use]
    pub fn cargo_args(&self, manifest: &Path) -> Vec<OsString> {
        let directive = self.directive;
        let mut args: Vec<OsString> = vec![
            "rustc".into(),
            "--lib".into(),
            "--manifest-path".into(),
            manifest.into(),
            "--target-dir".into(),
            self.target_dir().into(),
            "--target".into(),
            self.toolchain.target.clone().into(),
            "--message-format=json-render-diagnostics".into(),
        ];

        if directive.profile == Profile::Release {
            args.push("--release".into());
        }

        if !directive.features.is_empty() {
            args.push("--features".into());
            args.push(directive.features.join(",").into());
        }

        let link_args = directive.binding.link_args(&self.toolchain.target);
        if !directive.rustc_flags.is_empty() || !link_args.is_empty() {
            args.push("--".into());
            args.extend(directive.rustc_flags.iter().map(Into::into));
            args.extend(link_args.into_iter().map(Into::into));
        }

        args
    }

    async fn run_cargo(&self, manifest: &Path) -> Result<CompiledLibrary> {
        let start_time = Instant::now();
        let module = &self.directive.module;

        let mut cmd = Command::new(&self.toolchain.cargo);
        cmd.args(self.cargo_args(manifest))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Cargo uses these when compiling C/C++ dependencies
        for (name, value) in crate::env_vars::build_tool_env() {
            cmd.env(name, value);
        }

        debug!(
            "running {} for {module} ({} -> {})",
            self.toolchain.cargo.display(),
            self.toolchain.host,
            self.toolchain.target
        );

        let output = cmd.output().await.map_err(|e| {
            Error::Toolchain(format!(
                "failed to execute {}: {e}",
                self.toolchain.cargo.display()
            ))
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        debug!(
            "cargo exited with {} after {:?}",
            output.status,
            start_time.elapsed()
        );

        if !output.status.success() {
            return Err(Error::Build {
                module: module.clone(),
                diagnostic: stderr,
            });
        }

        let Some(path) = find_cdylib(&stdout) else {
            return Err(Error::Build {
                module: module.clone(),
                diagnostic: format!(
                    "cargo reported no cdylib artifact; set `crate-type = [\"cdylib\"]` in [lib]\n{stderr}"
                ),
            });
        };

        Ok(CompiledLibrary {
            path,
            duration: start_time.elapsed(),
            output: stderr,
        })
    }
}

#[derive(Debug, Deserialize)]
struct CargoMessage {
    reason: String,
    #[serde(default)]
    target: Option<CargoTarget>,
    #[serde(default)]
    filenames: Vec<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct CargoTarget {
    #[serde(default)]
    kind: Vec<String>,
}

/// Pick the shared library out of Cargo's JSON message stream
///
/// The last `cdylib` artifact wins; dependencies are never `cdylib` under
/// `cargo rustc --lib`. Non-JSON lines are ignored.
fn find_cdylib(stdout: &str) -> Option<PathBuf> {
    stdout
        .lines()
        .filter_map(|line| serde_json::from_str::<CargoMessage>(line).ok())
        .filter(|msg| msg.reason == "compiler-artifact")
        .filter(|msg| {
            msg.target
                .as_ref()
                .is_some_and(|t| t.kind.iter().any(|k| k == "cdylib"))
        })
        .filter_map(|msg| msg.filenames.into_iter().find(|f| is_shared_library(f)))
        .last()
}

fn is_shared_library(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| matches!(ext, "so" | "dylib" | "dll"))
}
