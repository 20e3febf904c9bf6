use bytes::Bytes;
use log::*;
use std::{fmt, io::Write, str};

use super::{
    coding::{CloseCode, Control, OpCode},
    mask::generate_mask,
};
use crate::error::Result;

/// A frame header as it travels on the wire, without the payload length.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct FrameHeader {
    /// Indicates that the frame is the last one of a possibly fragmented message.
    pub is_final: bool,
    /// Reserved for protocol extensions.
    pub rsv1: bool,
    /// Reserved for protocol extensions.
    pub rsv2: bool,
    /// Reserved for protocol extensions.
    pub rsv3: bool,
    /// WebSocket protocol opcode.
    pub opcode: OpCode,
    /// A frame mask, if any.
    pub mask: Option<[u8; 4]>,
}

impl Default for FrameHeader {
    fn default() -> Self {
        FrameHeader {
            is_final: true,
            rsv1: false,
            rsv2: false,
            rsv3: false,
            opcode: OpCode::Control(Control::Close),
            mask: None,
        }
    }
}

impl FrameHeader {
    /// The longest possible header: two fixed bytes, eight length bytes and a mask.
    pub const MAX_SIZE: usize = 14;

    /// Get the size of the header formatted with given payload length.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self, length: u64) -> usize {
        2 + LengthFormat::for_length(length).extra_bytes() + if self.mask.is_some() { 4 } else { 0 }
    }

    /// Format a header for given payload size.
    pub fn format(&self, length: u64, output: &mut impl Write) -> Result<()> {
        let code: u8 = self.opcode.into();

        let one = {
            code | if self.is_final { 0x80 } else { 0 }
                | if self.rsv1 { 0x40 } else { 0 }
                | if self.rsv2 { 0x20 } else { 0 }
                | if self.rsv3 { 0x10 } else { 0 }
        };

        let lenfmt = LengthFormat::for_length(length);

        let two = { lenfmt.length_byte() | if self.mask.is_some() { 0x80 } else { 0 } };

        output.write_all(&[one, two])?;
        match lenfmt {
            LengthFormat::U8(_) => (),
            LengthFormat::U16 => output.write_all(&(length as u16).to_be_bytes())?,
            LengthFormat::U64 => output.write_all(&length.to_be_bytes())?,
        }

        if let Some(ref mask) = self.mask {
            output.write_all(mask)?;
        }

        Ok(())
    }

    /// Generate a random frame mask and store this in the header.
    ///
    /// Of course this does not change frame contents. It just generates a mask.
    pub(crate) fn set_random_mask(&mut self) {
        self.mask = Some(generate_mask())
    }
}

/// Encoding class of the 7-bit length field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LengthFormat {
    U8(u8),
    U16,
    U64,
}

impl LengthFormat {
    /// Get the length format for a given data size.
    #[inline]
    pub(crate) fn for_length(length: u64) -> Self {
        if length < 126 {
            LengthFormat::U8(length as u8)
        } else if length < 65536 {
            LengthFormat::U16
        } else {
            LengthFormat::U64
        }
    }

    /// Get the size of the length encoding.
    #[inline]
    pub(crate) fn extra_bytes(&self) -> usize {
        match *self {
            LengthFormat::U8(_) => 0,
            LengthFormat::U16 => 2,
            LengthFormat::U64 => 8,
        }
    }

    /// Encode the given length.
    #[inline]
    pub(crate) fn length_byte(&self) -> u8 {
        match *self {
            LengthFormat::U8(b) => b,
            LengthFormat::U16 => 126,
            LengthFormat::U64 => 127,
        }
    }

    /// Get the length format from a given length byte.
    #[inline]
    pub(crate) fn for_byte(byte: u8) -> Self {
        match byte & 0x7F {
            126 => LengthFormat::U16,
            127 => LengthFormat::U64,
            b => LengthFormat::U8(b),
        }
    }
}

/// A complete logical message, or a single control frame, as delivered to the caller.
///
/// The payload is already unmasked and, for fragmented messages, holds every
/// fragment in arrival order. The opcode is that of the first fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    opcode: OpCode,
    payload: Bytes,
}

impl Frame {
    /// Create a frame from an opcode and an unmasked payload.
    pub fn message(opcode: OpCode, payload: impl Into<Bytes>) -> Self {
        Frame { opcode, payload: payload.into() }
    }

    /// Get the OpCode of the frame.
    #[inline]
    pub fn opcode(&self) -> OpCode {
        self.opcode
    }

    /// Get the length of the payload.
    #[inline]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Check if the payload is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Get a reference to the frame's payload.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Get the payload as text.
    pub fn to_text(&self) -> Result<&str> {
        Ok(str::from_utf8(&self.payload)?)
    }

    /// Consume the frame into its payload.
    #[inline]
    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    /// Status code carried by a CLOSE frame, `None` for any other frame.
    ///
    /// A CLOSE frame with fewer than two payload bytes yields [`CloseCode::Status`] (1005).
    /// Any reason text after the code is ignored.
    pub fn close_code(&self) -> Option<CloseCode> {
        if self.opcode != OpCode::Control(Control::Close) {
            return None;
        }
        let code = match *self.payload {
            [hi, lo, ..] => CloseCode::from(u16::from_be_bytes([hi, lo])),
            _ => CloseCode::Status,
        };
        trace!("WebSocket close code is {}", code);
        Some(code)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} frame (length {})", self.opcode, self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::frame::coding::Data;

    #[test]
    fn format() {
        let header = FrameHeader { opcode: OpCode::Control(Control::Ping), ..Default::default() };
        let mut buf = Vec::with_capacity(header.len(2));
        header.format(2, &mut buf).unwrap();
        assert_eq!(buf, vec![0x89, 0x02]);
    }

    #[test]
    fn format_masked() {
        let header = FrameHeader {
            opcode: OpCode::Data(Data::Text),
            mask: Some([0xde, 0xad, 0xbe, 0xef]),
            ..Default::default()
        };
        let mut buf = Vec::new();
        header.format(5, &mut buf).unwrap();
        assert_eq!(buf, vec![0x81, 0x85, 0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(header.len(5), 6);
    }

    #[test]
    fn length_classes() {
        let header = FrameHeader { opcode: OpCode::Data(Data::Binary), ..Default::default() };
        for (length, expected) in [
            (0u64, vec![0x82, 0x00]),
            (125, vec![0x82, 0x7d]),
            (126, vec![0x82, 0x7e, 0x00, 0x7e]),
            (127, vec![0x82, 0x7e, 0x00, 0x7f]),
            (65535, vec![0x82, 0x7e, 0xff, 0xff]),
            (65536, vec![0x82, 0x7f, 0, 0, 0, 0, 0, 0x01, 0x00, 0x00]),
        ] {
            let mut buf = Vec::new();
            header.format(length, &mut buf).unwrap();
            assert_eq!(buf, expected, "length {length}");
            assert_eq!(header.len(length), expected.len());
        }
    }

    #[test]
    fn close_code() {
        let close = OpCode::Control(Control::Close);
        assert_eq!(Frame::message(close, Bytes::new()).close_code(), Some(CloseCode::Status));
        assert_eq!(Frame::message(close, vec![0x03]).close_code(), Some(CloseCode::Status));
        assert_eq!(Frame::message(close, vec![0x03, 0xe8]).close_code(), Some(CloseCode::Normal));
        assert_eq!(
            Frame::message(close, b"\x03\xeagoing down".to_vec()).close_code(),
            Some(CloseCode::Protocol)
        );
        assert_eq!(Frame::message(OpCode::Data(Data::Text), vec![0x03, 0xe8]).close_code(), None);
    }

    #[test]
    fn display() {
        let f = Frame::message(OpCode::Data(Data::Text), "hi there");
        assert_eq!(f.to_string(), "TEXT frame (length 8)");
        assert_eq!(f.to_text().unwrap(), "hi there");
    }
}
