//! Stored images and the handles passed to the consumer.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

/// One image written to durable storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Moment storage began for this transfer
    pub captured_at: DateTime<Local>,
    /// Where the bytes live (`<base>/<YYYY-MM-DD>/<HHMMSS>.jpg`)
    pub storage_path: PathBuf,
    /// Number of bytes written
    pub size_bytes: u64,
}

impl Artifact {
    /// Create the queue handle for this artifact.
    pub fn reference(&self) -> ArtifactReference {
        ArtifactReference {
            storage_path: self.storage_path.clone(),
            captured_at: self.captured_at,
            size_bytes: self.size_bytes,
            peer: None,
        }
    }
}

/// Lightweight handle placed on the handoff queue.
///
/// The consumer owns it once dequeued; ingestion never looks at it again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactReference {
    pub storage_path: PathBuf,
    pub captured_at: DateTime<Local>,
    pub size_bytes: u64,
    /// Client that sent the image, when known
    pub peer: Option<SocketAddr>,
}

impl ArtifactReference {
    /// Attach the sending peer's address.
    pub fn with_peer(mut self, peer: SocketAddr) -> Self {
        self.peer = Some(peer);
        self
    }

    pub fn path(&self) -> &Path {
        &self.storage_path
    }

    /// File name without directories, e.g. `143022.jpg`.
    pub fn file_name(&self) -> String {
        self.storage_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}
