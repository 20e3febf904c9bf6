//! Malformed input is refused and the connection records why.

use std::{
    io::{self, Cursor},
    time::Duration,
};

use wss::{
    channel::{stream_callbacks, StreamCallbacks},
    error::{CapacityError, ProtocolError},
    CallbackChannel, CloseCode, Data, Error, OpCode, Role, WebSocket, WebSocketConfig,
};

type Moc = WebSocket<StreamCallbacks<Cursor<Vec<u8>>, Vec<u8>>>;

fn reading(role: Role, incoming: &[u8], config: Option<WebSocketConfig>) -> Moc {
    env_logger::try_init().ok();
    WebSocket::from_channel(stream_callbacks(Cursor::new(incoming.to_vec()), Vec::new()), role, config)
}

#[test]
fn nonzero_reserved_bits() {
    for first in [0xc1, 0xa1, 0x91] {
        let mut ws = reading(Role::Client, &[first, 0x00], None);
        let err = ws.read(None, false).unwrap_err();
        assert!(matches!(err, Error::Protocol(ProtocolError::NonZeroReservedBits)));
        assert_eq!(ws.close_code(), Some(CloseCode::Protocol));
    }
}

#[test]
fn unmasked_frame_to_server() {
    let mut ws = reading(Role::Server, &[0x81, 0x02, b'h', b'i'], None);
    let err = ws.read(None, false).unwrap_err();
    assert!(matches!(err, Error::Protocol(ProtocolError::UnmaskedFrameFromClient)));
    assert_eq!(ws.close_code(), Some(CloseCode::Protocol));
}

#[test]
fn masked_frame_to_client() {
    let mut ws = reading(Role::Client, &[0x81, 0x82, 1, 2, 3, 4, 0, 0], None);
    let err = ws.read(None, false).unwrap_err();
    assert!(matches!(err, Error::Protocol(ProtocolError::MaskedFrameFromServer)));
    assert_eq!(ws.close_code(), Some(CloseCode::Protocol));
}

#[test]
fn reserved_opcode() {
    let mut ws = reading(Role::Client, &[0x83, 0x00], None);
    let err = ws.read(None, false).unwrap_err();
    assert!(matches!(err, Error::Protocol(ProtocolError::InvalidOpcode(3))));
    assert_eq!(ws.close_code(), Some(CloseCode::Protocol));
}

#[test]
fn oversized_message() {
    // 64-bit length of 1 MiB against a 64 KiB limit, payload never sent.
    let mut ws = reading(
        Role::Client,
        &[0x82, 0x7f, 0, 0, 0, 0, 0, 0x10, 0, 0],
        Some(WebSocketConfig::default().max_payload_len(64 * 1024)),
    );
    let err = ws.read(None, false).unwrap_err();
    assert!(matches!(
        err,
        Error::Capacity(CapacityError::MessageTooLong { size: 1048576, max_size: 65536 })
    ));
    assert_eq!(ws.close_code(), Some(CloseCode::Size));
}

#[test]
fn length_with_top_bit_set() {
    let mut ws = reading(Role::Client, &[0x82, 0x7f, 0x80, 0, 0, 0, 0, 0, 0, 1], None);
    let err = ws.read(None, false).unwrap_err();
    assert!(matches!(err, Error::Protocol(ProtocolError::InvalidPayloadLength(_))));
    assert_eq!(ws.close_code(), Some(CloseCode::Protocol));
}

#[test]
fn truncated_frame() {
    let mut ws = reading(Role::Client, &[0x82, 0x7e, 0x01], None);
    let err = ws.read(None, false).unwrap_err();
    assert!(matches!(err, Error::Protocol(ProtocolError::IncompleteFrame)));
    assert_eq!(ws.close_code(), Some(CloseCode::Protocol));
}

#[test]
fn truncated_between_fragments() {
    let mut ws = reading(Role::Client, &[0x01, 0x01, b'a'], None);
    let err = ws.read(None, false).unwrap_err();
    assert!(matches!(err, Error::Protocol(ProtocolError::IncompleteFrame)));
    assert_eq!(ws.close_code(), Some(CloseCode::Protocol));
}

#[test]
fn stalled_frame_times_out() {
    env_logger::try_init().ok();
    // The first poll reports data, every later one times out.
    let channel = CallbackChannel::new(
        (Cursor::new(vec![0x82u8, 0x05, 1, 2]), 0u32),
        |(input, _), buf| io::Read::read(input, buf),
        |_, buf| Ok(buf.len()),
    )
    .with_poll(|(_, polls), _| {
        *polls += 1;
        Ok(*polls == 1)
    });
    let mut ws = WebSocket::from_channel(
        channel,
        Role::Client,
        Some(WebSocketConfig::default().frame_timeout(Duration::from_millis(10))),
    );

    let err = ws.read(Some(Duration::from_secs(1)), false).unwrap_err();
    assert!(matches!(err, Error::Protocol(ProtocolError::IncompleteFrame)));
    assert_eq!(ws.close_code(), Some(CloseCode::Protocol));
}

#[test]
fn io_error_mid_frame() {
    env_logger::try_init().ok();
    let mut calls = 0;
    let channel = CallbackChannel::new(
        (),
        move |_, buf: &mut [u8]| {
            calls += 1;
            match calls {
                1 => {
                    buf[0] = 0x82;
                    Ok(1)
                }
                _ => Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
            }
        },
        |_, buf: &[u8]| Ok(buf.len()),
    );
    let mut ws = WebSocket::from_channel(channel, Role::Client, None);
    let err = ws.read(None, false).unwrap_err();
    assert!(matches!(err, Error::Io(ref e) if e.kind() == io::ErrorKind::ConnectionReset));
    assert_eq!(ws.close_code(), Some(CloseCode::Protocol));
}

#[test]
fn io_error_while_idle() {
    env_logger::try_init().ok();
    let channel = CallbackChannel::new(
        (),
        |_, _: &mut [u8]| Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
        |_, buf: &[u8]| Ok(buf.len()),
    );
    let mut ws = WebSocket::from_channel(channel, Role::Server, None);
    assert!(matches!(ws.read(None, false), Err(Error::Io(_))));
    assert_eq!(ws.close_code(), None);
}

#[test]
fn close_codes() {
    let mut ws = reading(Role::Server, &[], None);
    for code in [999u16, 1012, 1013, 1014, 1016, 3000] {
        let err = ws.close(CloseCode::from(code)).unwrap_err();
        assert!(matches!(err, Error::InvalidCloseCode(c) if c == code));
    }
    assert!(ws.get_ref().data().1.is_empty());

    for code in 1000u16..=1011 {
        ws.close(CloseCode::from(code)).unwrap();
    }
    ws.close(CloseCode::Tls).unwrap();

    let written = &ws.get_ref().data().1;
    assert_eq!(written.len(), 13 * 4);
    assert_eq!(&written[..4], &[0x88, 0x02, 0x03, 0xe8]);
    assert_eq!(&written[48..], &[0x88, 0x02, 0x03, 0xf7]);
}

#[test]
fn reserved_opcode_not_sent() {
    let mut ws = reading(Role::Client, &[], None);
    for raw in [0x3u8, 0x7, 0xb, 0xf, 0x10, 0x81, 0xff] {
        let err = ws.write(OpCode::from(raw), b"x").unwrap_err();
        assert!(matches!(err, Error::Protocol(ProtocolError::InvalidOpcode(r)) if r == raw));
    }
    assert!(ws.get_ref().data().1.is_empty());
    ws.write(OpCode::Data(Data::Continue), b"").unwrap();
    assert_eq!(ws.get_ref().data().1.len(), 6);
}
