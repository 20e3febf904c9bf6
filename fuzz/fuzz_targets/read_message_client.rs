#![no_main]
use libfuzzer_sys::fuzz_target;
use std::io::{self, Cursor};
use wss::{channel::stream_callbacks, Role, WebSocket};

fuzz_target!(|data: &[u8]| {
    let channel = stream_callbacks(Cursor::new(data), io::sink());
    let mut socket = WebSocket::from_channel(channel, Role::Client, None);
    while let Ok(Some(_)) = socket.read(None, true) {}
});
