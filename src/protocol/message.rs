use bytes::Bytes;
use log::*;

use super::frame::{
    coding::{Data, OpCode},
    mask::apply_mask_at,
    Frame,
};
use crate::error::{CapacityError, Error, Result};

/// A logical message whose fragments are still arriving.
///
/// Payload bytes are unmasked as they are appended, so the buffer never holds
/// masked data once a call returns.
#[derive(Debug)]
pub struct IncompleteMessage {
    opcode: Data,
    payload: Vec<u8>,
    max_size: usize,
}

impl IncompleteMessage {
    /// Start a message whose first frame announced `length` payload bytes.
    pub fn new(opcode: Data, length: u64, max_size: usize) -> Result<Self> {
        let mut message = IncompleteMessage { opcode, payload: Vec::new(), max_size };
        message.reserve_frame(length)?;
        Ok(message)
    }

    /// Make room for another physical frame of `length` bytes.
    ///
    /// The size limit applies to the whole message, so this fails before any
    /// byte of an oversized frame is read.
    pub fn reserve_frame(&mut self, length: u64) -> Result<()> {
        let size = usize::try_from(length)
            .ok()
            .and_then(|length| length.checked_add(self.payload.len()))
            .unwrap_or(usize::MAX);
        if size > self.max_size {
            error!("Payload length ({}) exceeds max allowed ({})", size, self.max_size);
            return Err(CapacityError::MessageTooLong { size, max_size: self.max_size }.into());
        }
        self.payload
            .try_reserve_exact(size - self.payload.len())
            .map_err(|_| {
                error!("Failed to allocate {} bytes for payload", size);
                Error::OutOfMemory { requested: size }
            })
    }

    /// Append masked bytes that start `offset` bytes into the current frame payload.
    pub fn extend_masked(&mut self, tail: &[u8], mask: Option<[u8; 4]>, offset: usize) {
        let start = self.payload.len();
        self.payload.extend_from_slice(tail);
        if let Some(mask) = mask {
            apply_mask_at(&mut self.payload[start..], mask, offset);
        }
    }

    /// Convert an incomplete message into a complete one.
    pub fn complete(self) -> Frame {
        Frame::message(OpCode::Data(self.opcode), Bytes::from(self.payload))
    }
}
