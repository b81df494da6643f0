//! Date-partitioned artifact store.
//!
//! Layout: `<base_dir>/<YYYY-MM-DD>/<HHMMSS>.jpg`. Two images captured in
//! the same second land on the same path and the later write wins.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local};
use tracing::debug;

use super::{Filesystem, LocalFilesystem};
use crate::domain::{Artifact, ArtifactReference};
use crate::error::IngestError;

/// Directory name format for the day partition
pub const DATE_DIR_FORMAT: &str = "%Y-%m-%d";

/// File stem format within a day partition
pub const FILE_NAME_FORMAT: &str = "%H%M%S";

/// Extension given to every stored image
pub const FILE_EXTENSION: &str = "jpg";

/// Writes received payloads under a base directory.
#[derive(Clone)]
pub struct ArtifactStore {
    base_dir: PathBuf,
    fs: Arc<dyn Filesystem>,
}

impl ArtifactStore {
    /// Create a store writing to the local disk.
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self::with_filesystem(base_dir, Arc::new(LocalFilesystem))
    }

    /// Create a store on top of a custom filesystem.
    pub fn with_filesystem(base_dir: impl AsRef<Path>, fs: Arc<dyn Filesystem>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            fs,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Path an artifact captured at `captured_at` is stored under.
    pub fn path_for(&self, captured_at: &DateTime<Local>) -> PathBuf {
        self.base_dir
            .join(captured_at.format(DATE_DIR_FORMAT).to_string())
            .join(format!(
                "{}.{}",
                captured_at.format(FILE_NAME_FORMAT),
                FILE_EXTENSION
            ))
    }

    /// Write `bytes` durably and return the handle for the consumer.
    pub fn store(
        &self,
        bytes: &[u8],
        captured_at: DateTime<Local>,
    ) -> Result<ArtifactReference, IngestError> {
        let path = self.path_for(&captured_at);

        if let Some(dir) = path.parent() {
            self.fs
                .create_dir_all(dir)
                .map_err(|source| IngestError::StorageWrite {
                    path: dir.to_path_buf(),
                    source,
                })?;
        }

        self.fs
            .write_file(&path, bytes)
            .map_err(|source| IngestError::StorageWrite {
                path: path.clone(),
                source,
            })?;

        debug!("Wrote {} bytes to {}", bytes.len(), path.display());

        let artifact = Artifact {
            captured_at,
            storage_path: path,
            size_bytes: bytes.len() as u64,
        };
        Ok(artifact.reference())
    }
}

impl std::fmt::Debug for ArtifactStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactStore")
            .field("base_dir", &self.base_dir)
            .finish()
    }
}
