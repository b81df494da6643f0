//! Per-connection handler.
//!
//! Drives one connection through `Reading -> Storing -> Publishing -> Closed`.
//! Any failure jumps straight to `Closed`. The connection is shut down by a
//! drop guard, so it is closed exactly once however the handler exits.

use std::fmt;
use std::io::{self, Read};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use tracing::{debug, error, info, warn};

use crate::domain::ArtifactReference;
use crate::error::IngestError;
use crate::protocol::FrameReader;
use crate::queue::{ArtifactPublisher, PublishOutcome};
use crate::storage::ArtifactStore;

/// A connection the handler can read a frame from and then close.
pub trait Transport: Read + Send {
    /// Close both directions of the connection.
    fn close(&mut self) -> io::Result<()>;
}

impl Transport for TcpStream {
    fn close(&mut self) -> io::Result<()> {
        match self.shutdown(Shutdown::Both) {
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }
}

/// Source of capture timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// Wall clock in the local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Handler lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerState {
    Reading,
    Storing,
    Publishing,
    Closed,
}

impl fmt::Display for HandlerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerState::Reading => write!(f, "reading"),
            HandlerState::Storing => write!(f, "storing"),
            HandlerState::Publishing => write!(f, "publishing"),
            HandlerState::Closed => write!(f, "closed"),
        }
    }
}

/// How a connection ended.
#[derive(Debug)]
pub enum HandlerOutcome {
    /// Image stored and queued for the consumer.
    Published(ArtifactReference),
    /// Image stored but the queue refused the reference.
    Dropped(ArtifactReference),
    /// Peer closed without sending anything.
    Empty,
    /// Transfer or storage failed; nothing was published.
    Failed(IngestError),
}

impl HandlerOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, HandlerOutcome::Published(_))
    }
}

/// Closes the wrapped connection when dropped.
struct ConnectionGuard<T: Transport> {
    transport: T,
    peer: SocketAddr,
}

impl<T: Transport> Drop for ConnectionGuard<T> {
    fn drop(&mut self) {
        debug!("Closing connection with {}", self.peer);
        if let Err(e) = self.transport.close() {
            debug!("Error closing connection with {}: {}", self.peer, e);
        }
    }
}

/// Runs the ingestion state machine for one connection at a time.
///
/// Shared between connection threads behind an `Arc`.
pub struct ConnectionHandler {
    reader: FrameReader,
    store: ArtifactStore,
    publisher: ArtifactPublisher,
    clock: Arc<dyn Clock>,
    read_timeout: Option<Duration>,
}

impl ConnectionHandler {
    /// Create a handler with default frame limits and no read deadline.
    pub fn new(store: ArtifactStore, publisher: ArtifactPublisher) -> Self {
        Self {
            reader: FrameReader::new(),
            store,
            publisher,
            clock: Arc::new(SystemClock),
            read_timeout: None,
        }
    }

    /// Reject frames declaring more than `max_frame_bytes`.
    pub fn with_max_frame_bytes(mut self, max_frame_bytes: u32) -> Self {
        self.reader = self.reader.with_max_frame_bytes(max_frame_bytes);
        self
    }

    /// Per-read deadline; `None` waits forever.
    pub fn with_read_timeout(mut self, read_timeout: Option<Duration>) -> Self {
        self.read_timeout = read_timeout;
        self.reader = self.reader.with_read_timeout(read_timeout);
        self
    }

    /// Use a custom clock for capture timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Handle one connection to completion and close it.
    pub fn handle<T: Transport>(&self, transport: T, peer: SocketAddr) -> HandlerOutcome {
        info!("Connected: {}", peer);

        let mut guard = ConnectionGuard { transport, peer };
        let outcome = self.run(&mut guard.transport, peer);
        drop(guard);

        info!("Closed connection with {}", peer);
        outcome
    }

    fn run<R: Read>(&self, reader: &mut R, peer: SocketAddr) -> HandlerOutcome {
        let mut state = HandlerState::Reading;

        let frame = match self.reader.read_frame(reader) {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                info!("{} closed the connection without sending data", peer);
                self.transition(&mut state, HandlerState::Closed, peer);
                return HandlerOutcome::Empty;
            }
            Err(e) => {
                warn!("Transfer from {} failed: {}", peer, e);
                self.transition(&mut state, HandlerState::Closed, peer);
                return HandlerOutcome::Failed(e);
            }
        };
        info!("Received {} bytes from {}", frame.declared_len(), peer);

        self.transition(&mut state, HandlerState::Storing, peer);
        let captured_at = self.clock.now();
        let reference = match self.store.store(frame.payload(), captured_at) {
            Ok(reference) => reference.with_peer(peer),
            Err(e) => {
                error!("Failed to store image from {}: {}", peer, e);
                self.transition(&mut state, HandlerState::Closed, peer);
                return HandlerOutcome::Failed(e);
            }
        };
        drop(frame);
        info!("Stored image at {}", reference.storage_path.display());

        self.transition(&mut state, HandlerState::Publishing, peer);
        let outcome = match self.publisher.publish(reference.clone()) {
            PublishOutcome::Queued => HandlerOutcome::Published(reference),
            PublishOutcome::DroppedFull | PublishOutcome::Disconnected => {
                HandlerOutcome::Dropped(reference)
            }
        };

        self.transition(&mut state, HandlerState::Closed, peer);
        outcome
    }

    fn transition(&self, state: &mut HandlerState, next: HandlerState, peer: SocketAddr) {
        debug!("{}: {} -> {}", peer, state, next);
        *state = next;
    }
}
