//! Wire protocol module.
//!
//! One frame per connection: a 4-byte big-endian length followed by
//! exactly that many payload bytes. The server never answers.

mod frame_reader;

pub use frame_reader::{write_frame, FrameReader, DEFAULT_MAX_FRAME_BYTES, LENGTH_PREFIX_LEN, READ_CHUNK_SIZE};
