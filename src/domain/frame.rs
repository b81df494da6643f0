//! One length-prefixed transfer read off a connection.

/// A fully received frame.
///
/// Only constructed once every declared byte has arrived, so holding a
/// `Frame` means the payload is complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    declared_len: u32,
    payload: Vec<u8>,
}

impl Frame {
    /// Build a frame from a complete payload.
    ///
    /// Returns `None` if the payload length disagrees with the declared length.
    pub fn new(declared_len: u32, payload: Vec<u8>) -> Option<Self> {
        if payload.len() != declared_len as usize {
            return None;
        }
        Some(Self {
            declared_len,
            payload,
        })
    }

    pub fn declared_len(&self) -> u32 {
        self.declared_len
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Consume the frame, handing the payload to the caller.
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}
