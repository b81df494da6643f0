//! Ingestion server module.
//!
//! `IngestServer` accepts TCP connections and runs a `ConnectionHandler`
//! for each one on its own thread.

mod handler;
mod listener;

pub use handler::{Clock, ConnectionHandler, HandlerOutcome, HandlerState, SystemClock, Transport};
pub use listener::{IngestServer, ACCEPT_POLL_INTERVAL, DEFAULT_DRAIN_TIMEOUT, LISTEN_BACKLOG};
