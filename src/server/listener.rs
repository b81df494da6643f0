//! TCP listener for the ingestion server.
//!
//! Accepts connections in a loop and hands each one to a fresh thread, so
//! a slow or stalled client never holds up the accept loop.

use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use socket2::{Domain, Protocol, Socket, Type};
use tracing::{debug, error, info, warn};

use super::handler::ConnectionHandler;
use crate::error::IngestError;

/// How long the accept loop sleeps when no connection is pending.
pub const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long `run` waits for in-flight connections after the loop stops.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Pending-connection backlog passed to `listen(2)`
pub const LISTEN_BACKLOG: i32 = 128;

/// Counts in-flight connections; released when the handler thread ends.
struct AdmissionPermit {
    active: Arc<AtomicUsize>,
}

impl AdmissionPermit {
    /// Take a slot, or `None` if `limit` connections are already active.
    /// A limit of zero means unlimited.
    fn acquire(active: &Arc<AtomicUsize>, limit: usize) -> Option<Self> {
        let previous = active.fetch_add(1, Ordering::SeqCst);
        if limit > 0 && previous >= limit {
            active.fetch_sub(1, Ordering::SeqCst);
            return None;
        }
        Some(Self {
            active: active.clone(),
        })
    }
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// TCP server receiving one image per connection.
pub struct IngestServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    handler: Arc<ConnectionHandler>,
    /// Maximum concurrent connections (0 = unlimited).
    max_connections: usize,
    active: Arc<AtomicUsize>,
    /// Upper bound on the shutdown wait for in-flight connections.
    drain_timeout: Duration,
    /// Running flag.
    running: Arc<AtomicBool>,
}

impl IngestServer {
    /// Bind the listening socket.
    ///
    /// Fails with `IngestError::Bind` if the address is unavailable.
    pub fn bind(addr: SocketAddr, handler: ConnectionHandler) -> Result<Self, IngestError> {
        let bind_err = |source| IngestError::Bind { addr, source };

        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
            .map_err(bind_err)?;
        socket.set_reuse_address(true).map_err(bind_err)?;
        socket.bind(&addr.into()).map_err(bind_err)?;
        socket.listen(LISTEN_BACKLOG).map_err(bind_err)?;

        let listener: TcpListener = socket.into();
        listener.set_nonblocking(true).map_err(bind_err)?;
        let local_addr = listener.local_addr().map_err(bind_err)?;

        Ok(Self {
            listener,
            local_addr,
            handler: Arc::new(handler),
            max_connections: 0,
            active: Arc::new(AtomicUsize::new(0)),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Limit the number of connections handled at once.
    ///
    /// Connections above the limit are closed immediately.
    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Bound the time `run` waits for in-flight connections on shutdown.
    pub fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    /// Address actually bound (resolves port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Get a handle to stop the server.
    ///
    /// Clearing the flag stops accepting within `ACCEPT_POLL_INTERVAL`; `run`
    /// then returns once in-flight connections finish or the drain timeout
    /// passes.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// Number of connections currently being handled.
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Run the accept loop until the running flag is cleared, then wait for
    /// in-flight connections to finish.
    pub fn run(&self) -> Result<(), IngestError> {
        info!("Ingest server listening on {}", self.local_addr);
        info!("Storing images under {}", self.handler.store().base_dir().display());

        while self.running.load(Ordering::SeqCst) {
            match self.listener.accept() {
                Ok((stream, peer)) => self.dispatch(stream, peer),
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    error!("Accept error: {}", e);
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }

        self.drain();
        info!("Ingest server stopped");
        Ok(())
    }

    /// Wait up to `drain_timeout` for active handlers to finish.
    fn drain(&self) {
        let pending = self.active_connections();
        if pending == 0 {
            return;
        }

        info!("Waiting for {} in-flight connections", pending);
        let deadline = Instant::now() + self.drain_timeout;
        while self.active_connections() > 0 {
            if Instant::now() >= deadline {
                warn!(
                    "Drain timeout of {:?} passed with {} connections still active",
                    self.drain_timeout,
                    self.active_connections()
                );
                return;
            }
            thread::sleep(ACCEPT_POLL_INTERVAL);
        }
    }

    /// Start a handler thread for an accepted connection.
    fn dispatch(&self, stream: TcpStream, peer: SocketAddr) {
        let Some(permit) = AdmissionPermit::acquire(&self.active, self.max_connections) else {
            warn!(
                "Connection limit of {} reached, rejecting {}",
                self.max_connections, peer
            );
            let _ = stream.shutdown(std::net::Shutdown::Both);
            return;
        };

        if let Err(e) = self.configure_stream(&stream) {
            warn!("Failed to configure connection from {}: {}", peer, e);
            return;
        }

        let handler = self.handler.clone();
        let spawned = thread::Builder::new()
            .name(format!("conn-{peer}"))
            .spawn(move || {
                let _permit = permit;
                let outcome = handler.handle(stream, peer);
                debug!("Connection {} finished: {:?}", peer, outcome);
            });

        if let Err(e) = spawned {
            error!("Failed to spawn handler for {}: {}", peer, e);
        }
    }

    fn configure_stream(&self, stream: &TcpStream) -> std::io::Result<()> {
        stream.set_nonblocking(false)?;
        stream.set_read_timeout(self.handler.read_timeout())?;
        stream.set_nodelay(true).ok();
        Ok(())
    }
}
