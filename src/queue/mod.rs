//! Handoff queue module.
//!
//! Decouples connection threads (producers) from the single consumer that
//! presents stored images.

mod handoff;

pub use handoff::{ArtifactPublisher, HandoffQueue, PublishOutcome};
