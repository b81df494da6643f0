//! Domain models for photo ingestion.
//!
//! These types carry no I/O of their own; the protocol, storage and
//! queue modules produce and move them around.

mod artifact;
mod frame;

pub use artifact::{Artifact, ArtifactReference};
pub use frame::Frame;
