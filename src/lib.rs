//! WebSocket framing for connections that are already established.
//!
//! The opening handshake, TLS and socket setup are somebody else's job. Hand
//! a connected [`Channel`] to [`WebSocket::from_channel`] (or a pair of
//! descriptors to [`WebSocket::from_fds`]) and exchange frames:
//!
//! ```no_run
//! # #[cfg(unix)]
//! # fn main() -> wss::Result<()> {
//! use std::{os::unix::net::UnixStream, time::Duration};
//! use wss::{Data, OpCode, Role, WebSocket};
//!
//! let stream = UnixStream::connect("/run/app.sock")?;
//! let mut ws = WebSocket::from_fds(stream.try_clone()?, stream, Role::Client, None);
//! ws.write(OpCode::Data(Data::Text), b"{hello there}")?;
//! if let Some(frame) = ws.read(Some(Duration::from_secs(5)), false)? {
//!     println!("{}: {}", frame, frame.to_text()?);
//! }
//! # Ok(())
//! # }
//! # #[cfg(not(unix))]
//! # fn main() {}
//! ```
#![deny(
    missing_docs,
    missing_copy_implementations,
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_must_use,
    unused_mut,
    unused_imports,
    unused_import_braces
)]

pub mod channel;
pub mod error;
pub mod logging;
pub mod protocol;

#[cfg(unix)]
pub use crate::channel::FdChannel;
pub use crate::{
    channel::{CallbackChannel, Channel},
    error::{Error, Result},
    protocol::{
        frame::coding::{CloseCode, Control, Data, OpCode},
        Frame, Role, WebSocket, WebSocketConfig, DEFAULT_MAX_PAYLOAD_LEN,
    },
};
