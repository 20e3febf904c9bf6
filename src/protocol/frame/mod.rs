//! Utilities to work with raw WebSocket frames.

pub mod coding;

#[allow(clippy::module_inception)]
mod frame;
pub mod mask;
pub mod parser;

pub use self::{
    frame::{Frame, FrameHeader},
    parser::{HeaderParser, Parse, ParseState},
};
