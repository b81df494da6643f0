//! Consumer side of the handoff queue.
//!
//! This module defines the `ArtifactConsumer` trait and a polling loop that
//! feeds it from the queue on its own schedule. The trait only handles
//! presentation; different implementations can print, render, or forward.

mod console_consumer;
mod poller;

pub use console_consumer::ConsoleConsumer;
pub use poller::{QueuePoller, DEFAULT_POLL_INTERVAL};

use crate::domain::ArtifactReference;

/// Presents newly stored artifacts.
pub trait ArtifactConsumer: Send {
    /// Present one artifact. Must cope with a file that has gone missing.
    fn present(&mut self, reference: &ArtifactReference);

    /// Called when polling starts.
    fn on_start(&mut self) {}

    /// Called when polling stops.
    fn on_stop(&mut self) {}
}
