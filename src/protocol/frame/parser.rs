//! Incremental frame header parser.
//!
//! Bytes may arrive one at a time or all at once; the parser stages whatever
//! the current state still needs and never looks past the end of the header.

use log::*;

use super::{
    coding::OpCode,
    frame::{FrameHeader, LengthFormat},
};
use crate::{
    error::{ProtocolError, Result},
    protocol::Role,
};

/// Outcome of feeding bytes to a resumable parser.
#[derive(Debug, PartialEq, Eq)]
pub enum Parse<T> {
    /// At least this many more bytes are required.
    NeedMore(usize),
    /// Parsing finished.
    Ready(T),
}

/// Position of the parser inside a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    /// FIN, RSV1-3 and opcode.
    Initial,
    /// Mask bit and 7-bit length.
    Length,
    /// 16-bit extended length.
    ExtendedLength16,
    /// 64-bit extended length.
    ExtendedLength64,
    /// Masking key.
    Mask,
    /// The header is complete, payload bytes follow.
    Payload,
}

impl ParseState {
    /// Number of header bytes the state consumes.
    pub fn width(self) -> usize {
        match self {
            ParseState::Initial | ParseState::Length => 1,
            ParseState::ExtendedLength16 => 2,
            ParseState::ExtendedLength64 => 8,
            ParseState::Mask => 4,
            ParseState::Payload => 0,
        }
    }

    fn name(self) -> &'static str {
        match self {
            ParseState::Initial => "INITIAL",
            ParseState::Length => "LENGTH",
            ParseState::ExtendedLength16 => "XLENGTH",
            ParseState::ExtendedLength64 => "XLENGTH2",
            ParseState::Mask => "MASK",
            ParseState::Payload => "PAYLOAD",
        }
    }
}

/// Resumable parser for a single frame header.
#[derive(Debug, Clone, Copy)]
pub struct HeaderParser {
    role: Role,
    state: ParseState,
    staging: [u8; 8],
    staged: usize,
    header: FrameHeader,
    length: u64,
}

impl HeaderParser {
    /// Create a parser for frames received by an endpoint of the given role.
    pub fn new(role: Role) -> Self {
        HeaderParser {
            role,
            state: ParseState::Initial,
            staging: [0; 8],
            staged: 0,
            header: FrameHeader::default(),
            length: 0,
        }
    }

    /// The current state.
    pub fn state(&self) -> ParseState {
        self.state
    }

    /// True when no byte of a header has been consumed yet.
    pub fn is_idle(&self) -> bool {
        self.state == ParseState::Initial && self.staged == 0
    }

    /// Bytes still needed to leave the current state.
    pub fn wanted(&self) -> usize {
        self.state.width() - self.staged
    }

    /// Forget the finished header and expect the next one.
    pub fn reset(&mut self) {
        self.state = ParseState::Initial;
        self.staged = 0;
        self.header = FrameHeader::default();
        self.length = 0;
    }

    /// Consume header bytes from `input`.
    ///
    /// Returns the number of bytes consumed, which never goes past the end of
    /// the header. Once the header is complete the parser stays in
    /// [`ParseState::Payload`] until [`reset`](Self::reset) is called.
    pub fn feed(&mut self, input: &[u8]) -> Result<(usize, Parse<(FrameHeader, u64)>)> {
        let mut consumed = 0;
        while self.state != ParseState::Payload {
            let width = self.state.width();
            let take = self.wanted().min(input.len() - consumed);
            self.staging[self.staged..self.staged + take]
                .copy_from_slice(&input[consumed..consumed + take]);
            self.staged += take;
            consumed += take;

            if self.staged < width {
                trace!(
                    "Incomplete read in state {} (have {} of {} bytes)",
                    self.state.name(),
                    self.staged,
                    width
                );
                return Ok((consumed, Parse::NeedMore(width - self.staged)));
            }

            let next = self.advance()?;
            trace!("WebSocket parse state {} -> {}", self.state.name(), next.name());
            self.state = next;
            self.staged = 0;
        }
        Ok((consumed, Parse::Ready((self.header, self.length))))
    }

    /// Interpret the fully staged bytes of the current state.
    fn advance(&mut self) -> Result<ParseState> {
        let bytes = self.staging;
        Ok(match self.state {
            ParseState::Initial => {
                let first = bytes[0];
                self.header.is_final = first & 0x80 != 0;
                self.header.rsv1 = first & 0x40 != 0;
                self.header.rsv2 = first & 0x20 != 0;
                self.header.rsv3 = first & 0x10 != 0;
                if self.header.rsv1 || self.header.rsv2 || self.header.rsv3 {
                    error!("RSV bit(s) must be low");
                    return Err(ProtocolError::NonZeroReservedBits.into());
                }

                let opcode = OpCode::from(first & 0x0F);
                if !opcode.is_valid() {
                    error!("Invalid opcode received: {:02X}", first & 0x0F);
                    return Err(ProtocolError::InvalidOpcode(first & 0x0F).into());
                }
                self.header.opcode = opcode;
                ParseState::Length
            }
            ParseState::Length => {
                let second = bytes[0];
                let masked = second & 0x80 != 0;
                match (self.role, masked) {
                    (Role::Server, false) => {
                        error!("Client data is not masked, aborting");
                        return Err(ProtocolError::UnmaskedFrameFromClient.into());
                    }
                    (Role::Client, true) => {
                        error!("Server data is masked, aborting");
                        return Err(ProtocolError::MaskedFrameFromServer.into());
                    }
                    _ => (),
                }
                match LengthFormat::for_byte(second) {
                    LengthFormat::U8(len) => {
                        self.length = len.into();
                        self.after_length()
                    }
                    LengthFormat::U16 => ParseState::ExtendedLength16,
                    LengthFormat::U64 => ParseState::ExtendedLength64,
                }
            }
            ParseState::ExtendedLength16 => {
                self.length = u16::from_be_bytes([bytes[0], bytes[1]]).into();
                self.after_length()
            }
            ParseState::ExtendedLength64 => {
                let length = u64::from_be_bytes(bytes);
                if length & (1 << 63) != 0 {
                    error!("Frame length {} is too large", length);
                    return Err(ProtocolError::InvalidPayloadLength(length).into());
                }
                self.length = length;
                self.after_length()
            }
            ParseState::Mask => {
                self.header.mask = Some([bytes[0], bytes[1], bytes[2], bytes[3]]);
                ParseState::Payload
            }
            ParseState::Payload => ParseState::Payload,
        })
    }

    fn after_length(&self) -> ParseState {
        match self.role {
            Role::Server => ParseState::Mask,
            Role::Client => ParseState::Payload,
        }
    }
}
