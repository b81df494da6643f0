//! Photodrop - photo ingestion server.
//!
//! Clients push one image per TCP connection as a 4-byte big-endian length
//! followed by the image bytes. Each image is written to
//! `<data_dir>/<YYYY-MM-DD>/<HHMMSS>.jpg` and a reference to it is handed to
//! a consumer through a non-blocking queue.
//!
//! The pieces, leaf first:
//! - [`protocol::FrameReader`] reassembles one frame from a connection.
//! - [`storage::ArtifactStore`] files the bytes by capture time.
//! - [`server::ConnectionHandler`] runs read, store and publish for one connection.
//! - [`server::IngestServer`] accepts connections, one thread each.
//! - [`queue::HandoffQueue`] carries references to the consumer.
//! - [`consumer::QueuePoller`] drains the queue on a fixed interval.

pub mod config;
pub mod consumer;
pub mod domain;
pub mod error;
pub mod protocol;
pub mod queue;
pub mod server;
pub mod storage;

pub use config::Config;
pub use domain::{Artifact, ArtifactReference, Frame};
pub use error::IngestError;
pub use queue::{ArtifactPublisher, HandoffQueue, PublishOutcome};
pub use server::{ConnectionHandler, HandlerOutcome, IngestServer};
pub use storage::ArtifactStore;
