//! Multi-producer, single-consumer FIFO of artifact references.
//!
//! Publishing never blocks. An unbounded queue always accepts; a bounded
//! queue drops the newest reference when full. The consumer side only
//! offers non-blocking reads so it can live inside a polling loop.

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};
use tracing::warn;

use crate::domain::ArtifactReference;

/// Result of a publish attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The reference is queued for the consumer.
    Queued,
    /// A bounded queue was full; the reference was dropped.
    DroppedFull,
    /// The consumer side is gone; the reference was dropped.
    Disconnected,
}

/// Producer handle, cloned into every connection handler.
#[derive(Debug, Clone)]
pub struct ArtifactPublisher {
    tx: Sender<ArtifactReference>,
}

impl ArtifactPublisher {
    /// Queue a reference for the consumer without blocking.
    pub fn publish(&self, reference: ArtifactReference) -> PublishOutcome {
        match self.tx.try_send(reference) {
            Ok(()) => PublishOutcome::Queued,
            Err(TrySendError::Full(dropped)) => {
                warn!(
                    "Handoff queue full, dropping {}",
                    dropped.storage_path.display()
                );
                PublishOutcome::DroppedFull
            }
            Err(TrySendError::Disconnected(dropped)) => {
                warn!(
                    "No consumer attached, dropping {}",
                    dropped.storage_path.display()
                );
                PublishOutcome::Disconnected
            }
        }
    }
}

/// Consumer end of the handoff queue.
///
/// Not `Clone`: exactly one owner drains it.
#[derive(Debug)]
pub struct HandoffQueue {
    tx: Sender<ArtifactReference>,
    rx: Receiver<ArtifactReference>,
}

impl HandoffQueue {
    /// Queue that never refuses a reference.
    pub fn unbounded() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx }
    }

    /// Queue holding at most `capacity` references; further publishes are dropped.
    ///
    /// A capacity of zero is treated as one, since a rendezvous channel would
    /// drop every reference that is not being received at that instant.
    pub fn bounded(capacity: usize) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
        Self { tx, rx }
    }

    /// Create a producer handle.
    pub fn publisher(&self) -> ArtifactPublisher {
        ArtifactPublisher {
            tx: self.tx.clone(),
        }
    }

    /// Take the oldest reference, if any. Never blocks.
    pub fn try_consume(&self) -> Option<ArtifactReference> {
        match self.rx.try_recv() {
            Ok(reference) => Some(reference),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Take everything currently queued, oldest first.
    pub fn drain(&self) -> Vec<ArtifactReference> {
        self.rx.try_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Capacity of a bounded queue, `None` when unbounded.
    pub fn capacity(&self) -> Option<usize> {
        self.rx.capacity()
    }
}

impl Default for HandoffQueue {
    fn default() -> Self {
        Self::unbounded()
    }
}
