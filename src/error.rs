use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Connection closed after {received} of {expected} bytes")]
    TransportClosed { received: usize, expected: usize },

    #[error("No data received for {elapsed:?}")]
    TransportTimeout { elapsed: Duration },

    #[error("Declared frame length {declared} exceeds limit of {limit} bytes")]
    FrameTooLarge { declared: u32, limit: u32 },

    #[error("Transport error: {0}")]
    Transport(#[source] io::Error),

    #[error("Failed to write {}: {source}", .path.display())]
    StorageWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("Config error: {0}")]
    Config(String),
}

impl IngestError {
    /// Whether the error was caused by the remote peer rather than this host.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            IngestError::TransportClosed { .. }
                | IngestError::TransportTimeout { .. }
                | IngestError::FrameTooLarge { .. }
                | IngestError::Transport(_)
        )
    }
}
