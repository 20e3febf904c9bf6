//! Generic WebSocket framing over an established channel.

mod decoder;
pub mod frame;
mod message;

pub use self::{
    decoder::Decoder,
    frame::{
        coding::{CloseCode, Control as OpCtl, Data as OpData, OpCode},
        Frame, FrameHeader,
    },
};

use log::*;
use std::{io, time::Duration};

use self::frame::{mask::apply_mask, Parse};
use crate::{
    channel::Channel,
    error::{Error, ProtocolError, Result},
};

/// Default upper bound for the payload of one logical message: 25 MiB.
pub const DEFAULT_MAX_PAYLOAD_LEN: usize = 25 * 1024 * 1024;

/// Indicates a Client or Server role of the websocket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// This socket is a server: incoming frames must be masked, outgoing frames are not.
    Server,
    /// This socket is a client: outgoing frames are masked, incoming frames must not be.
    Client,
}

/// The configuration for a WebSocket connection.
///
/// # Example
/// ```
/// # use std::time::Duration;
/// # use wss::protocol::WebSocketConfig;
/// let conf = WebSocketConfig::default()
///     .max_payload_len(1 << 20)
///     .frame_timeout(Duration::from_millis(250));
/// ```
#[derive(Debug, Clone, Copy)]
#[non_exhaustive]
pub struct WebSocketConfig {
    /// Largest accepted payload of one logical message, summed over all of its
    /// fragments. The default value is 25 MiB.
    pub max_payload_len: usize,
    /// How long to wait for more bytes once a frame has started to arrive.
    /// A stall longer than this fails the read with a protocol error.
    /// The default value is 1 second.
    pub frame_timeout: Duration,
    /// Largest number of payload bytes requested from the channel in one read.
    /// The default value is 4 KiB.
    pub read_chunk_size: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            max_payload_len: DEFAULT_MAX_PAYLOAD_LEN,
            frame_timeout: Duration::from_secs(1),
            read_chunk_size: 4 * 1024,
        }
    }
}

impl WebSocketConfig {
    /// Set [`Self::max_payload_len`].
    pub fn max_payload_len(mut self, max_payload_len: usize) -> Self {
        self.max_payload_len = max_payload_len;
        self
    }

    /// Set [`Self::frame_timeout`].
    pub fn frame_timeout(mut self, frame_timeout: Duration) -> Self {
        self.frame_timeout = frame_timeout;
        self
    }

    /// Set [`Self::read_chunk_size`].
    pub fn read_chunk_size(mut self, read_chunk_size: usize) -> Self {
        self.read_chunk_size = read_chunk_size;
        self
    }
}

/// WebSocket framing over a single peer connection.
///
/// Owns the channel and at most one partially received message. Each
/// [`read`](Self::read) hands out a freshly owned [`Frame`].
#[derive(Debug)]
pub struct WebSocket<C> {
    channel: C,
    role: Role,
    config: WebSocketConfig,
    decoder: Decoder,
    chunk: Box<[u8]>,
    close_code: Option<CloseCode>,
    /// Set once a read failed or hit end of stream.
    failed: bool,
}

impl<C> WebSocket<C> {
    /// Wrap an established channel without performing a handshake.
    pub fn from_channel(channel: C, role: Role, config: Option<WebSocketConfig>) -> Self {
        let config = config.unwrap_or_default();
        WebSocket {
            channel,
            role,
            config,
            decoder: Decoder::new(role, config.max_payload_len),
            chunk: vec![0; config.read_chunk_size.max(FrameHeader::MAX_SIZE)].into_boxed_slice(),
            close_code: None,
            failed: false,
        }
    }

    /// Returns a shared reference to the inner channel.
    pub fn get_ref(&self) -> &C {
        &self.channel
    }

    /// Returns a mutable reference to the inner channel.
    pub fn get_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Consume the connection and return the channel.
    ///
    /// Any partially received message is dropped.
    pub fn into_channel(self) -> C {
        self.channel
    }

    /// The role of this endpoint.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Read the configuration.
    pub fn get_config(&self) -> &WebSocketConfig {
        &self.config
    }

    /// The close code recorded by the last failed read, if any.
    ///
    /// Send it to the peer with [`close`](Self::close) before dropping the connection.
    pub fn close_code(&self) -> Option<CloseCode> {
        self.close_code
    }
}

#[cfg(unix)]
impl<R, W> WebSocket<crate::channel::FdChannel<R, W>> {
    /// Wrap a pair of descriptors, e.g. both halves of `stream.try_clone()`.
    pub fn from_fds(reader: R, writer: W, role: Role, config: Option<WebSocketConfig>) -> Self {
        WebSocket::from_channel(crate::channel::FdChannel::new(reader, writer), role, config)
    }
}

impl<C: Channel> WebSocket<C> {
    /// Read the next logical message or control frame.
    ///
    /// Waits up to `timeout` for a frame to start (`None` waits forever);
    /// pass `ready = true` to skip that wait when data is known to be pending.
    /// Once a frame has started, each further wait is bounded by
    /// [`WebSocketConfig::frame_timeout`].
    ///
    /// Returns `Ok(None)` if nothing arrived in time. On error the connection
    /// records a [`close_code`](Self::close_code) when the peer should be told
    /// why. Every later read fails with [`Error::AlreadyClosed`] and leaves
    /// the recorded code alone; writing stays possible.
    pub fn read(&mut self, timeout: Option<Duration>, ready: bool) -> Result<Option<Frame>> {
        if self.failed {
            debug!("Read from a WebSocket that already failed");
            return Err(Error::AlreadyClosed);
        }
        let mut ready = ready;
        loop {
            let in_progress = self.decoder.in_progress();
            if ready {
                ready = false;
            } else {
                let wait = if in_progress { Some(self.config.frame_timeout) } else { timeout };
                match self.channel.poll_read(wait) {
                    Ok(true) => (),
                    Ok(false) if in_progress => {
                        error!("Partial WebSocket frame received (discarding)");
                        return Err(self.fail(ProtocolError::IncompleteFrame.into(), true));
                    }
                    Ok(false) => {
                        trace!("No WebSocket frame within {:?}", timeout);
                        return Ok(None);
                    }
                    Err(e) => {
                        debug!("WebSocket channel poll failed: {}", e);
                        return Err(self.fail(e.into(), in_progress));
                    }
                }
            }

            let want = self.decoder.wanted().min(self.chunk.len());
            let n = match self.channel.read(&mut self.chunk[..want]) {
                Ok(0) if in_progress => {
                    error!("Channel closed in the middle of a WebSocket frame");
                    return Err(self.fail(ProtocolError::IncompleteFrame.into(), true));
                }
                Ok(0) => {
                    debug!("WebSocket channel closed by peer");
                    return Err(self.fail(Error::ConnectionClosed, false));
                }
                Ok(n) => n,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!("WebSocket channel read failed: {}", e);
                    return Err(self.fail(e.into(), in_progress));
                }
            };

            let fed = self.decoder.feed(&self.chunk[..n]);
            match fed {
                Ok((_, Parse::Ready(frame))) => return Ok(Some(frame)),
                Ok((_, Parse::NeedMore(_))) => (),
                Err(e) => return Err(self.fail(e, true)),
            }
        }
    }

    /// Send a whole, unfragmented message.
    ///
    /// Server connections send the payload as is; client connections mask it
    /// with a fresh random key. Reserved opcodes are rejected before anything is written.
    pub fn write(&mut self, opcode: OpCode, payload: &[u8]) -> Result<()> {
        if !opcode.is_valid() {
            error!("Invalid frame opcode: {}", u8::from(opcode));
            return Err(ProtocolError::InvalidOpcode(opcode.into()).into());
        }

        let mut header = FrameHeader { is_final: true, opcode, ..FrameHeader::default() };
        let length = payload.len() as u64;
        debug!(
            "Sending WebSocket {} frame (length {}, incl. {} header)",
            opcode,
            length,
            header.len(length)
        );

        match self.role {
            Role::Server => {
                let mut head = Vec::with_capacity(FrameHeader::MAX_SIZE);
                header.format(length, &mut head)?;
                self.channel.write_all(&head)?;
                self.channel.write_all(payload)?;
            }
            Role::Client => {
                // 5.  If the data is being sent by the client, the frame(s) MUST be
                // masked as defined in Section 5.3. (RFC 6455)
                header.set_random_mask();
                let mut out = Vec::with_capacity(header.len(length) + payload.len());
                header.format(length, &mut out)?;
                let start = out.len();
                out.extend_from_slice(payload);
                if let Some(mask) = header.mask {
                    apply_mask(&mut out[start..], mask);
                }
                self.channel.write_all(&out)?;
            }
        }
        Ok(())
    }

    /// Send a CLOSE frame carrying `code`.
    ///
    /// Only codes 1000 to 1011 and 1015 are accepted; anything else is
    /// rejected without writing.
    pub fn close(&mut self, code: CloseCode) -> Result<()> {
        let raw = u16::from(code);
        if !code.is_sendable() {
            error!("Invalid WebSocket close status code: {}", raw);
            return Err(Error::InvalidCloseCode(raw));
        }
        self.write(OpCode::Control(OpCtl::Close), &raw.to_be_bytes())
    }

    /// Stop reading and record the close code for a failed read.
    ///
    /// I/O failures that cut a frame short are reported to the peer as protocol errors.
    fn fail(&mut self, err: Error, mid_frame: bool) -> Error {
        self.failed = true;
        let code = match err.close_code() {
            Some(code) => Some(code),
            None if mid_frame => Some(CloseCode::Protocol),
            None => None,
        };
        if code.is_some() {
            self.close_code = code;
        }
        err
    }
}
