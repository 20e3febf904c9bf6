//! Resumable decoding of logical messages from raw bytes.
//!
//! [`Decoder::feed`] accepts whatever bytes are at hand and reports how many it
//! took, so it can sit behind a blocking loop (see [`WebSocket::read`]) or an
//! event-driven reactor alike.
//!
//! [`WebSocket::read`]: crate::WebSocket::read

use log::*;

use super::{
    frame::{
        coding::{Data, OpCode},
        mask::apply_mask_at,
        parser::{HeaderParser, Parse},
        Frame, FrameHeader,
    },
    message::IncompleteMessage,
    Role,
};
use crate::error::{ProtocolError, Result};

/// Payload progress of the physical frame currently being received.
#[derive(Debug)]
struct InFlight {
    header: FrameHeader,
    remaining: u64,
    received: usize,
    /// Control frames are delivered on their own and never join `incomplete`.
    control: Vec<u8>,
}

/// Turns a byte stream into frames, one logical message at a time.
#[derive(Debug)]
pub struct Decoder {
    parser: HeaderParser,
    max_payload_len: usize,
    in_flight: Option<InFlight>,
    incomplete: Option<IncompleteMessage>,
}

impl Decoder {
    /// Create a decoder for frames received by an endpoint of the given role.
    pub fn new(role: Role, max_payload_len: usize) -> Self {
        Decoder { parser: HeaderParser::new(role), max_payload_len, in_flight: None, incomplete: None }
    }

    /// True once any byte of a frame or any fragment of a message has been taken.
    pub fn in_progress(&self) -> bool {
        !self.parser.is_idle() || self.incomplete.is_some()
    }

    /// Bytes the decoder can take right now without reading past the current frame.
    pub fn wanted(&self) -> usize {
        match self.in_flight {
            Some(ref frame) => usize::try_from(frame.remaining).unwrap_or(usize::MAX),
            None => self.parser.wanted(),
        }
    }

    /// Feed bytes into the decoder.
    ///
    /// Returns the number of bytes consumed together with either a finished
    /// frame or the number of bytes still needed. Bytes past a finished frame
    /// are left unconsumed. After an error the decoder must not be used again.
    pub fn feed(&mut self, mut input: &[u8]) -> Result<(usize, Parse<Frame>)> {
        let mut consumed = 0;
        loop {
            if self.in_flight.is_none() {
                let (n, parsed) = self.parser.feed(input)?;
                consumed += n;
                input = &input[n..];
                match parsed {
                    Parse::NeedMore(more) => return Ok((consumed, Parse::NeedMore(more))),
                    Parse::Ready((header, length)) => {
                        self.in_flight = Some(self.start_frame(header, length)?);
                    }
                }
            }

            let n = self.read_payload(input);
            consumed += n;
            input = &input[n..];

            let more = self.wanted();
            if more > 0 {
                return Ok((consumed, Parse::NeedMore(more)));
            }
            if let Some(frame) = self.finish_frame() {
                return Ok((consumed, Parse::Ready(frame)));
            }
        }
    }

    /// Validate a fresh header against the message state and reserve payload space.
    fn start_frame(&mut self, header: FrameHeader, length: u64) -> Result<InFlight> {
        trace!("WebSocket {} frame header complete (length {})", header.opcode, length);
        let mut control = Vec::new();
        match header.opcode {
            OpCode::Control(_) => {
                if !header.is_final {
                    error!("Fragmented {} frame", header.opcode);
                    return Err(ProtocolError::FragmentedControlFrame.into());
                }
                if length > 125 {
                    error!("{} frame too big (length {})", header.opcode, length);
                    return Err(ProtocolError::ControlFrameTooBig.into());
                }
                control.reserve_exact(length as usize);
            }
            OpCode::Data(Data::Continue) => match self.incomplete {
                Some(ref mut message) => message.reserve_frame(length)?,
                None => {
                    error!("Continue frame but nothing to continue");
                    return Err(ProtocolError::UnexpectedContinueFrame.into());
                }
            },
            OpCode::Data(data) => {
                if self.incomplete.is_some() {
                    error!("Received {} while waiting for more fragments", data);
                    return Err(ProtocolError::ExpectedFragment(data).into());
                }
                self.incomplete = Some(IncompleteMessage::new(data, length, self.max_payload_len)?);
            }
        }
        Ok(InFlight { header, remaining: length, received: 0, control })
    }

    /// Copy and unmask as much of the current payload as `input` holds.
    fn read_payload(&mut self, input: &[u8]) -> usize {
        let Some(frame) = self.in_flight.as_mut() else { return 0 };
        let take = usize::try_from(frame.remaining).unwrap_or(usize::MAX).min(input.len());
        let chunk = &input[..take];
        let mask = frame.header.mask;

        if frame.header.opcode.is_control() {
            let start = frame.control.len();
            frame.control.extend_from_slice(chunk);
            if let Some(mask) = mask {
                apply_mask_at(&mut frame.control[start..], mask, frame.received);
            }
        } else if let Some(ref mut message) = self.incomplete {
            message.extend_masked(chunk, mask, frame.received);
        }

        frame.received += take;
        frame.remaining -= take as u64;
        take
    }

    /// Close out a fully received physical frame.
    ///
    /// Returns the frame to hand to the caller, or `None` if more fragments follow.
    fn finish_frame(&mut self) -> Option<Frame> {
        let frame = self.in_flight.take()?;
        self.parser.reset();
        debug!("WebSocket {} frame received (length {})", frame.header.opcode, frame.received);

        match frame.header.opcode {
            OpCode::Control(_) => Some(Frame::message(frame.header.opcode, frame.control)),
            OpCode::Data(_) if frame.header.is_final => {
                self.incomplete.take().map(IncompleteMessage::complete)
            }
            OpCode::Data(_) => None,
        }
    }
}
