//! Durable storage for received images.
//!
//! The `Filesystem` trait keeps the placement policy in `ArtifactStore`
//! independent of the real disk, so failure paths can be exercised in tests.

mod artifact_store;

pub use artifact_store::{ArtifactStore, DATE_DIR_FORMAT, FILE_EXTENSION, FILE_NAME_FORMAT};

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tempfile::NamedTempFile;
use tracing::info;

/// Minimal filesystem surface the artifact store needs.
pub trait Filesystem: Send + Sync {
    /// Create a directory and its parents. Must succeed if it already exists.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Write `bytes` to a new file at `path`, replacing any existing file.
    ///
    /// Concurrent writers to the same path must leave exactly one complete
    /// payload behind.
    fn write_file(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;
}

/// Filesystem backed by the local disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFilesystem;

impl Filesystem for LocalFilesystem {
    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    /// Writes to a temp file next to `path`, syncs it, then renames it into
    /// place. The last rename wins; readers never see a partial file.
    fn write_file(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(bytes)?;
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Ensure the storage root exists.
///
/// Returns `true` if the directory had to be created.
pub fn ensure_base_dir(base_dir: &Path) -> Result<bool> {
    if base_dir.is_dir() {
        return Ok(false);
    }

    fs::create_dir_all(base_dir)
        .with_context(|| format!("Failed to create data directory {}", base_dir.display()))?;
    info!("Created data directory {}", base_dir.display());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_local_write_and_overwrite() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("image.jpg");

        LocalFilesystem.write_file(&path, b"first").unwrap();
        LocalFilesystem.write_file(&path, b"2nd").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"2nd");
    }

    #[test]
    fn test_local_write_leaves_no_temp_files() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("image.jpg");

        LocalFilesystem.write_file(&path, b"hello").unwrap();
        LocalFilesystem.write_file(&path, b"again").unwrap();

        let names: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("image.jpg")]);
    }

    #[test]
    fn test_local_write_missing_dir_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("absent").join("image.jpg");
        assert!(LocalFilesystem.write_file(&path, b"hello").is_err());
    }

    #[test]
    fn test_local_create_dir_all_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("a").join("b");

        LocalFilesystem.create_dir_all(&dir).unwrap();
        LocalFilesystem.create_dir_all(&dir).unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn test_ensure_base_dir_creates_once() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().join("data");

        assert!(ensure_base_dir(&base).unwrap());
        assert!(!ensure_base_dir(&base).unwrap());
        assert!(base.is_dir());
    }

    #[test]
    fn test_ensure_base_dir_fails_on_file() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().join("data");
        fs::write(&base, "not a directory").unwrap();

        assert!(ensure_base_dir(&base).is_err());
    }
}
