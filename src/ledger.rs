//! Release ledger
//!
//! Remembers which versions of each package have been published so a release
//! can only move forward. Stored as JSON and rewritten atomically; writers
//! serialize on a `<ledger>.lock` file.
//!
//! ```json
//! {
//!   "packages": {
//!     "rustyknife": [
//!       { "version": "0.1.1", "published_at": "2024-05-01T12:00:00Z", "artifacts": [] }
//!     ]
//!   }
//! }
//! ```

use crate::artifact::{self, Artifact};
use crate::descriptor::PackageDescriptor;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

/// Default ledger file name inside the data directory
pub const LEDGER_FILE: &str = "releases.json";

/// A published artifact, reduced to what identifies it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedArtifact {
    pub module: String,
    pub target: String,
    pub sha256: String,
}

impl From<&Artifact> for PublishedArtifact {
    fn from(artifact: &Artifact) -> Self {
        Self {
            module: artifact.module.clone(),
            target: artifact.target.clone(),
            sha256: artifact.sha256.clone(),
        }
    }
}

/// One accepted release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub version: Version,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub artifacts: Vec<PublishedArtifact>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct LedgerData {
    #[serde(default)]
    packages: BTreeMap<String, Vec<Release>>,
}

/// Published versions per package name
#[derive(Debug, Clone)]
pub struct ReleaseLedger {
    path: PathBuf,
    data: LedgerData,
}

impl ReleaseLedger {
    /// Open the ledger at `path`; a missing file is an empty ledger
    ///
    /// # Errors
    ///
    /// Returns [`Error::Ledger`] if the file exists but isn't a valid ledger.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = read_data(&path)?;
        Ok(Self { path, data })
    }

    /// Default location: `<data dir>/extpack/releases.json`
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("extpack").join(LEDGER_FILE))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Releases of `name`, oldest first
    #[must_use]
    pub fn releases(&self, name: &str) -> &[Release] {
        self.data.packages.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Names of all packages with at least one release
    pub fn packages(&self) -> impl Iterator<Item = &str> {
        self.data.packages.keys().map(String::as_str)
    }

    /// Highest published version of `name`
    #[must_use]
    pub fn latest(&self, name: &str) -> Option<&Version> {
        self.releases(name).iter().map(|r| &r.version).max()
    }

    /// Check that `descriptor` may be published
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if its version is not strictly greater
    /// than every published version of the same name.
    pub fn admit(&self, descriptor: &PackageDescriptor) -> Result<()> {
        self.admit_version(descriptor.name(), descriptor.version())
    }

    /// Check that `version` would advance `name`
    ///
    /// # Errors
    ///
    /// See [`Self::admit`].
    pub fn admit_version(&self, name: &str, version: &Version) -> Result<()> {
        match self.latest(name) {
            Some(latest) if version <= latest => Err(Error::config(format!(
                "version {version} of {name} does not exceed published version {latest}"
            ))),
            _ => Ok(()),
        }
    }

    /// Record a release and persist the ledger
    ///
    /// Holds an exclusive lock on `<ledger>.lock` while it re-reads the file,
    /// re-checks monotonicity and saves, so concurrent publishers never accept
    /// the same version or drop each other's releases.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for a non-monotonic version, or
    /// [`Error::Io`]/[`Error::Ledger`] if locking, reading or saving fails.
    pub fn record(
        &mut self,
        descriptor: &PackageDescriptor,
        artifacts: &[Artifact],
        published_at: DateTime<Utc>,
    ) -> Result<&Release> {
        let _lock = self.lock()?;

        self.data = read_data(&self.path)?;
        self.admit(descriptor)?;

        let releases = self
            .data
            .packages
            .entry(descriptor.name().to_string())
            .or_default();
        releases.push(Release {
            version: descriptor.version().clone(),
            published_at,
            artifacts: artifacts.iter().map(PublishedArtifact::from).collect(),
        });

        self.save()?;

        self.releases(descriptor.name())
            .last()
            .ok_or_else(|| Error::Ledger {
                path: self.path.clone(),
                message: "release vanished after recording".to_string(),
            })
    }

    /// Lock file next to the ledger; the ledger itself is replaced on save
    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Block until this process holds the ledger lock (released on drop)
    fn lock(&self) -> Result<File> {
        let lock_path = self.lock_path();
        if let Some(parent) = lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| Error::io(&lock_path, e))?;
        file.lock_exclusive().map_err(|e| Error::Ledger {
            path: self.path.clone(),
            message: format!("failed to lock {}: {e}", lock_path.display()),
        })?;

        Ok(file)
    }

    fn save(&self) -> Result<()> {
        let json = serde_json::to_vec_pretty(&self.data).map_err(|e| Error::Ledger {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        artifact::write_atomic(&self.path, &json)
    }
}

fn read_data(path: &Path) -> Result<LedgerData> {
    if !path.exists() {
        return Ok(LedgerData::default());
    }

    let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| Error::Ledger {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
