//! Error handling.

mod capacity_error;
mod protocol_error;

use std::{io, result, str};

use crate::protocol::frame::coding::CloseCode;

pub use self::{capacity_error::CapacityError, protocol_error::ProtocolError};

/// Result type of all wss library calls.
pub type Result<T, E = Error> = result::Result<T, E>;

/// Possible WebSocket errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The peer closed the underlying channel between frames.
    ///
    /// Nothing was lost: no frame was in progress when the channel reached end of stream.
    #[error("Connection closed by peer")]
    ConnectionClosed,
    /// Trying to read from a connection after an earlier read failed or reached end of stream.
    ///
    /// The close code recorded by the first failure is kept.
    #[error("Trying to work with closed connection")]
    AlreadyClosed,
    /// Input-output error on the underlying channel.
    ///
    /// When this happens while a frame is partially received, the connection
    /// records [`CloseCode::Protocol`] and should be considered unusable.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// A message is bigger than the configured maximum payload length.
    #[error("Space limit exceeded: {0}")]
    Capacity(#[from] CapacityError),
    /// Protocol violation.
    #[error("WebSocket protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    /// The payload buffer for a message could not be allocated.
    #[error("Failed to allocate {requested} bytes for a message payload")]
    OutOfMemory {
        /// Total size of the buffer that was requested.
        requested: usize,
    },
    /// The close code may not be sent in a CLOSE frame.
    #[error("Invalid WebSocket close status code: {0}")]
    InvalidCloseCode(u16),
    /// UTF coding error.
    #[error("UTF-8 encoding error")]
    Utf8,
}

impl Error {
    /// The close code a peer should be sent after this error, if any.
    ///
    /// Caller errors and plain I/O failures carry no close code.
    pub fn close_code(&self) -> Option<CloseCode> {
        match self {
            Error::Protocol(_) => Some(CloseCode::Protocol),
            Error::Capacity(_) => Some(CloseCode::Size),
            Error::OutOfMemory { .. } => Some(CloseCode::Error),
            Error::ConnectionClosed
            | Error::AlreadyClosed
            | Error::Io(_)
            | Error::InvalidCloseCode(_)
            | Error::Utf8 => None,
        }
    }
}

impl From<str::Utf8Error> for Error {
    fn from(_: str::Utf8Error) -> Self {
        Error::Utf8
    }
}
