//! Length-prefixed frame reader.
//!
//! Reassembles one payload from a transport that may hand back any number
//! of bytes per read call.

use std::io::{self, ErrorKind, Read, Write};
use std::time::Duration;

use tracing::debug;

use crate::domain::Frame;
use crate::error::IngestError;

/// Size of the length prefix on the wire
pub const LENGTH_PREFIX_LEN: usize = 4;

/// Largest single read request while receiving a payload
pub const READ_CHUNK_SIZE: usize = 4096;

/// Default ceiling on the declared payload length (32 MiB)
pub const DEFAULT_MAX_FRAME_BYTES: u32 = 32 * 1024 * 1024;

/// Reads one frame from a connection.
#[derive(Debug, Clone)]
pub struct FrameReader {
    /// Declared lengths above this are rejected before allocating.
    max_frame_bytes: u32,
    /// Per-read deadline configured on the transport, used for error reporting.
    read_timeout: Option<Duration>,
}

impl FrameReader {
    /// Create a reader with the default frame ceiling and no deadline.
    pub fn new() -> Self {
        Self {
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            read_timeout: None,
        }
    }

    /// Set the maximum accepted payload length.
    pub fn with_max_frame_bytes(mut self, max_frame_bytes: u32) -> Self {
        self.max_frame_bytes = max_frame_bytes;
        self
    }

    /// Record the per-read deadline applied to the transport.
    ///
    /// The reader does not arm the deadline itself; the caller sets it on the
    /// socket. It is only used to describe `TransportTimeout` errors.
    pub fn with_read_timeout(mut self, read_timeout: Option<Duration>) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    pub fn max_frame_bytes(&self) -> u32 {
        self.max_frame_bytes
    }

    /// Read one complete frame.
    ///
    /// Returns `Ok(None)` if the peer closed the connection before sending
    /// anything. Any close after the first byte is `TransportClosed`.
    pub fn read_frame<R: Read>(&self, reader: &mut R) -> Result<Option<Frame>, IngestError> {
        let mut prefix = [0u8; LENGTH_PREFIX_LEN];
        let mut filled = 0;

        while filled < LENGTH_PREFIX_LEN {
            let n = self.read_some(reader, &mut prefix[filled..])?;
            if n == 0 {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(IngestError::TransportClosed {
                    received: filled,
                    expected: LENGTH_PREFIX_LEN,
                });
            }
            filled += n;
        }

        let declared_len = u32::from_be_bytes(prefix);
        if declared_len > self.max_frame_bytes {
            return Err(IngestError::FrameTooLarge {
                declared: declared_len,
                limit: self.max_frame_bytes,
            });
        }
        debug!("Frame declares {} bytes", declared_len);

        let expected = declared_len as usize;
        let mut payload = Vec::with_capacity(expected);
        let mut chunk = [0u8; READ_CHUNK_SIZE];

        while payload.len() < expected {
            let want = (expected - payload.len()).min(READ_CHUNK_SIZE);
            let n = self.read_some(reader, &mut chunk[..want])?;
            if n == 0 {
                return Err(IngestError::TransportClosed {
                    received: payload.len(),
                    expected,
                });
            }
            payload.extend_from_slice(&chunk[..n]);
        }

        // Length matches by construction, so this is always `Some`.
        Ok(Frame::new(declared_len, payload))
    }

    /// Single read call with interrupt retry and timeout mapping.
    fn read_some<R: Read>(&self, reader: &mut R, buf: &mut [u8]) -> Result<usize, IngestError> {
        loop {
            match reader.read(buf) {
                Ok(n) => return Ok(n),
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(ref e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Err(IngestError::TransportTimeout {
                        elapsed: self.read_timeout.unwrap_or_default(),
                    });
                }
                Err(e) => return Err(IngestError::Transport(e)),
            }
        }
    }
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Write one frame: the big-endian length followed by the payload.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> io::Result<()> {
    let len = u32::try_from(payload.len()).map_err(|_| {
        io::Error::new(
            ErrorKind::InvalidInput,
            format!("payload of {} bytes does not fit a u32 length", payload.len()),
        )
    })?;

    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(payload)?;
    writer.flush()
}
