//! Host runtime load check
//!
//! An artifact that compiles is not necessarily loadable. Two checks catch
//! the usual mismatches before a package is published:
//!
//! 1. the file must export the binding's init symbol (a module renamed in the
//!    descriptor but not in the crate fails here), and
//! 2. the host interpreter must be able to import it from the output
//!    directory.

use crate::artifact::Artifact;
use crate::debug;
use crate::error::{Error, Result};
use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command as StdCommand, Stdio};
use tokio::process::Command;

const IMPORT_PROBE: &str = "import importlib, sys; importlib.import_module(sys.argv[1])";

/// Check that the library at `path` exports the init symbol the host looks up
///
/// Exported names are stored verbatim in the dynamic symbol table, so a byte
/// search is enough to detect a missing entry point.
///
/// # Errors
///
/// Returns [`Error::Load`] if the symbol is absent, or [`Error::Io`] if the
/// file can't be read.
pub fn check_exports(path: &Path, module: &str, init_symbol: &str) -> Result<()> {
    let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;

    if contains(&bytes, init_symbol.as_bytes()) {
        Ok(())
    } else {
        Err(Error::Load {
            module: module.to_string(),
            diagnostic: format!(
                "{} does not export {init_symbol}; the crate's module name must match the extension name",
                path.display()
            ),
        })
    }
}

/// [`check_exports`] for an already placed artifact
///
/// # Errors
///
/// See [`check_exports`].
pub fn check_artifact(artifact: &Artifact) -> Result<()> {
    check_exports(&artifact.path, &artifact.module, &artifact.init_symbol)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|window| window == needle)
}

/// The interpreter that will load built extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRuntime {
    interpreter: PathBuf,
}

impl HostRuntime {
    /// Use a specific interpreter
    #[must_use]
    pub fn new(interpreter: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
        }
    }

    /// Find the interpreter
    ///
    /// Priority: `explicit` -> `EXTPACK_PYTHON`/`PYO3_PYTHON` -> `python3` ->
    /// `python` in PATH.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Toolchain`] if no interpreter can be found.
    pub fn detect(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Ok(Self::new(path));
        }

        if let Some(path) = crate::env_vars::python() {
            return Ok(Self::new(path));
        }

        for candidate in ["python3", "python"] {
            if let Ok(output) = StdCommand::new("which").arg(candidate).output()
                && output.status.success()
            {
                let path = PathBuf::from(String::from_utf8_lossy(&output.stdout).trim());
                if path.exists() {
                    return Ok(Self::new(path));
                }
            }
        }

        Err(Error::Toolchain(
            "no Python interpreter found; set EXTPACK_PYTHON or pass --python".to_string(),
        ))
    }

    #[must_use]
    pub fn interpreter(&self) -> &Path {
        &self.interpreter
    }

    /// Import `module` with `out_dir` first on the module search path
    ///
    /// # Errors
    ///
    /// Returns [`Error::Load`] with the interpreter's stderr if the import
    /// fails, or [`Error::Toolchain`] if the interpreter can't be started.
    pub async fn verify_import(&self, out_dir: &Path, module: &str) -> Result<()> {
        debug!(
            "importing {module} with {} from {}",
            self.interpreter.display(),
            out_dir.display()
        );

        let output = Command::new(&self.interpreter)
            .args(["-c", IMPORT_PROBE, module])
            .env("PYTHONPATH", search_path(out_dir))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                Error::Toolchain(format!(
                    "failed to run {}: {e}",
                    self.interpreter.display()
                ))
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(Error::Load {
                module: module.to_string(),
                diagnostic: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        }
    }
}

/// `out_dir` prepended to any existing `PYTHONPATH`
fn search_path(out_dir: &Path) -> OsString {
    let existing = env::var_os("PYTHONPATH").unwrap_or_default();
    let paths = std::iter::once(out_dir.to_path_buf())
        .chain(env::split_paths(&existing).filter(|p| !p.as_os_str().is_empty()));
    env::join_paths(paths).unwrap_or_else(|_| out_dir.as_os_str().to_os_string())
}
