//! Artifact placement
//!
//! Compiled modules are copied into a temporary file next to their final
//! location and renamed over it. A reader of the output directory sees either
//! the previous artifact or the complete new one, never a partial write, and a
//! build that stops before the rename leaves the previous artifact in place.

use crate::binding::BindingKind;
use crate::error::{Error, Result};
use semver::Version;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// File written next to placed artifacts describing the last build
pub const BUILD_RECORD_FILE: &str = "extpack-build.json";

/// A compiled, placed extension module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Module path the host imports
    pub module: String,
    /// Where the module was placed
    ///
    /// The build record stores this relative to the output directory, so a
    /// record stays valid when read from another working directory.
    pub path: PathBuf,
    /// Package version the artifact was built for
    pub version: Version,
    pub binding: BindingKind,
    /// Entry point the host resolves
    pub init_symbol: String,
    /// Target triple
    pub target: String,
    /// Hex SHA-256 of the placed file
    pub sha256: String,
}

impl Artifact {
    /// Whether two artifacts expose the same loadable surface
    ///
    /// Byte equality is not required: rebuilding an unchanged crate may embed
    /// different paths or timestamps.
    #[must_use]
    pub fn load_compatible(&self, other: &Self) -> bool {
        self.module == other.module
            && self.binding == other.binding
            && self.init_symbol == other.init_symbol
            && self.target == other.target
    }
}

/// Record of one package build, written to [`BUILD_RECORD_FILE`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub package: String,
    pub version: Version,
    /// Cargo release used for the build
    pub toolchain: String,
    pub artifacts: Vec<Artifact>,
}

impl BuildRecord {
    /// Read a record from `out_dir`, if one exists
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] or [`Error::Configuration`] if the file exists
    /// but can't be read or parsed.
    pub fn read(out_dir: &Path) -> Result<Option<Self>> {
        let path = out_dir.join(BUILD_RECORD_FILE);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
        let mut record: Self = serde_json::from_str(&content)
            .map_err(|e| Error::config(format!("invalid build record {}: {e}", path.display())))?;

        for artifact in &mut record.artifacts {
            if artifact.path.is_relative() {
                artifact.path = out_dir.join(&artifact.path);
            }
        }

        Ok(Some(record))
    }

    /// Atomically write the record into `out_dir`
    ///
    /// Artifact paths under `out_dir` are stored relative to it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] on filesystem errors.
    pub fn write(&self, out_dir: &Path) -> Result<PathBuf> {
        let path = out_dir.join(BUILD_RECORD_FILE);

        let mut stored = self.clone();
        for artifact in &mut stored.artifacts {
            if let Ok(relative) = artifact.path.strip_prefix(out_dir) {
                artifact.path = relative.to_path_buf();
            }
        }

        let json = serde_json::to_vec_pretty(&stored)
            .map_err(|e| Error::config(format!("failed to serialize build record: {e}")))?;
        write_atomic(&path, &json)?;
        Ok(path)
    }
}

/// Copy `source` to `dest` via a temporary file in `dest`'s directory
///
/// Creates missing parent directories. Returns the hex SHA-256 of the bytes
/// that were placed.
///
/// # Errors
///
/// Returns [`Error::MissingArtifact`] if `source` doesn't exist, or
/// [`Error::Io`] if copying or renaming fails. On error `dest` is untouched.
pub fn place_atomically(source: &Path, dest: &Path) -> Result<String> {
    if !source.is_file() {
        return Err(Error::MissingArtifact {
            what: "compiled module".to_string(),
            path: source.to_path_buf(),
        });
    }

    let parent = parent_dir(dest);
    fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;

    let mut input = File::open(source).map_err(|e| Error::io(source, e))?;
    let mut temp = NamedTempFile::new_in(parent).map_err(|e| Error::io(parent, e))?;
    let mut hashing = HashingWriter::new(temp.as_file_mut());
    io::copy(&mut input, &mut hashing).map_err(|e| Error::io(dest, e))?;
    let digest = hashing.finish();

    temp.as_file().sync_all().map_err(|e| Error::io(dest, e))?;
    copy_permissions(source, temp.path())?;

    // NamedTempFile removes itself if persist is never reached
    temp.persist(dest).map_err(|e| Error::io(dest, e.error))?;

    Ok(digest)
}

/// Write `bytes` to `path` with the same temp-then-rename guarantee
///
/// # Errors
///
/// Returns [`Error::Io`] on filesystem errors.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = parent_dir(path);
    fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;

    let mut temp = NamedTempFile::new_in(parent).map_err(|e| Error::io(parent, e))?;
    temp.write_all(bytes).map_err(|e| Error::io(path, e))?;
    temp.as_file().sync_all().map_err(|e| Error::io(path, e))?;
    temp.persist(path).map_err(|e| Error::io(path, e.error))?;

    Ok(())
}

/// Hex SHA-256 of a file
///
/// # Errors
///
/// Returns [`Error::Io`] if the file can't be read.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(|e| Error::io(path, e))?;
    let result = hasher.finalize();
    Ok(format!("{result:x}"))
}

fn parent_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

fn copy_permissions(source: &Path, dest: &Path) -> Result<()> {
    let permissions = fs::metadata(source)
        .map_err(|e| Error::io(source, e))?
        .permissions();
    fs::set_permissions(dest, permissions).map_err(|e| Error::io(dest, e))
}

/// Writer that hashes everything passing through it
struct HashingWriter<W> {
    inner: W,
    hasher: Sha256,
}

impl<W: Write> HashingWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
        }
    }

    fn finish(self) -> String {
        let result = self.hasher.finalize();
        format!("{result:x}")
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.hasher.update(buf.get(..written).unwrap_or_default());
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
