//! Error taxonomy for the build-and-bind pipeline
//!
//! Every variant is fatal at this layer. Nothing is retried: a bad descriptor,
//! a broken crate or an incompatible host all need a human to fix them.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while declaring, building, placing or loading an extension
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or missing descriptor fields, detected before any build
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A referenced manifest or produced file cannot be resolved
    #[error("missing artifact: {what} not found at {}", path.display())]
    MissingArtifact { what: String, path: PathBuf },

    /// Cargo failed; `diagnostic` is its stderr, unmodified
    #[error("build of extension {module} failed:\n{diagnostic}")]
    Build { module: String, diagnostic: String },

    /// The artifact compiled but the host runtime refused to import it
    #[error("host runtime could not load extension {module}:\n{diagnostic}")]
    Load { module: String, diagnostic: String },

    /// Cargo or the host interpreter could not be located or queried
    #[error("toolchain error: {0}")]
    Toolchain(String),

    /// The build was interrupted before an artifact was placed
    #[error("build of {package} was cancelled")]
    Cancelled { package: String },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The release ledger could not be read or written
    #[error("release ledger {}: {message}", path.display())]
    Ledger { path: PathBuf, message: String },
}

impl Error {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Short machine-friendly name of the error kind
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "ConfigurationError",
            Self::MissingArtifact { .. } => "MissingArtifactError",
            Self::Build { .. } => "BuildError",
            Self::Load { .. } => "LoadError",
            Self::Toolchain(_) => "ToolchainError",
            Self::Cancelled { .. } => "Cancelled",
            Self::Io { .. } => "IoError",
            Self::Ledger { .. } => "LedgerError",
        }
    }
}

/// Result alias used across the library
pub type Result<T, E = Error> = std::result::Result<T, E>;
