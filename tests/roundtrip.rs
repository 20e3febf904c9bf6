//! Frames exchanged between a client and a server over real socket pairs.

#![cfg(unix)]

use std::{
    io::Write,
    os::unix::net::UnixStream,
    thread::{sleep, spawn},
    time::Duration,
};

use rand::{Rng, RngCore};
use wss::{
    protocol::frame::{mask::apply_mask, FrameHeader},
    CloseCode, Control, Data, Error, FdChannel, OpCode, Role, WebSocket,
};

type Sock = WebSocket<FdChannel<UnixStream, UnixStream>>;

const TIMEOUT: Option<Duration> = Some(Duration::from_secs(5));

fn socket_pair() -> (Sock, Sock) {
    env_logger::try_init().ok();

    let (a, b) = UnixStream::pair().unwrap();
    let server = WebSocket::from_fds(a.try_clone().unwrap(), a, Role::Server, None);
    let client = WebSocket::from_fds(b.try_clone().unwrap(), b, Role::Client, None);
    (server, client)
}

/// Encode one frame the way a client would, with full control over FIN and opcode.
fn client_frame(first: u8, payload: &[u8]) -> Vec<u8> {
    let header = FrameHeader {
        is_final: first & 0x80 != 0,
        opcode: OpCode::from(first & 0x0f),
        mask: Some(rand::random()),
        ..FrameHeader::default()
    };
    let mut out = Vec::new();
    header.format(payload.len() as u64, &mut out).unwrap();
    let start = out.len();
    out.extend_from_slice(payload);
    apply_mask(&mut out[start..], header.mask.unwrap());
    out
}

#[test]
fn hello_there_both_ways() {
    let (mut server, mut client) = socket_pair();

    client.write(OpCode::Data(Data::Text), b"{hello there}").unwrap();
    let frame = server.read(TIMEOUT, false).unwrap().expect("no frame from client");
    assert_eq!(frame.opcode(), OpCode::Data(Data::Text));
    assert_eq!(frame.len(), 13);
    assert_eq!(frame.to_text().unwrap(), "{hello there}");

    server.write(OpCode::Data(Data::Text), b"{hello there}").unwrap();
    let frame = client.read(TIMEOUT, false).unwrap().expect("no frame from server");
    assert_eq!(frame.to_text().unwrap(), "{hello there}");
}

#[test]
fn length_boundaries() {
    let (mut server, client) = socket_pair();
    let lengths = [0usize, 1, 125, 126, 127, 65535, 65536, 100_000];

    let writer = spawn(move || {
        let mut client = client;
        let mut rng = rand::rng();
        let mut sent = Vec::new();
        for len in lengths {
            let mut payload = vec![0; len];
            rng.fill_bytes(&mut payload);
            client.write(OpCode::Data(Data::Binary), &payload).unwrap();
            sent.push(payload);
        }
        (client, sent)
    });

    let mut received = Vec::new();
    for _ in lengths {
        let frame = server.read(TIMEOUT, false).unwrap().expect("timed out");
        assert_eq!(frame.opcode(), OpCode::Data(Data::Binary));
        received.push(frame.into_payload());
    }
    let (_client, sent) = writer.join().unwrap();
    for (sent, received) in sent.iter().zip(&received) {
        assert_eq!(sent.len(), received.len());
        assert_eq!(&sent[..], &received[..]);
    }
}

#[test]
fn server_sends_every_length_class() {
    let (server, mut client) = socket_pair();

    let writer = spawn(move || {
        let mut server = server;
        for len in [0usize, 125, 126, 65535, 65536] {
            server.write(OpCode::Data(Data::Binary), &vec![0xa5; len]).unwrap();
        }
        server
    });

    for len in [0usize, 125, 126, 65535, 65536] {
        let frame = client.read(TIMEOUT, false).unwrap().expect("timed out");
        assert_eq!(frame.len(), len);
        assert!(frame.payload().iter().all(|&b| b == 0xa5));
    }
    writer.join().unwrap();
}

#[test]
fn fragmented_message_with_ping() {
    let (mut server, client) = socket_pair();
    let (mut raw, _) = client.into_channel().into_inner();

    raw.write_all(&client_frame(0x01, b"Hello")).unwrap();
    raw.write_all(&client_frame(0x89, b"are you there")).unwrap();
    raw.write_all(&client_frame(0x00, b", ")).unwrap();
    raw.write_all(&client_frame(0x80, b"World!")).unwrap();

    let ping = server.read(TIMEOUT, false).unwrap().unwrap();
    assert_eq!(ping.opcode(), OpCode::Control(Control::Ping));
    assert_eq!(ping.payload(), b"are you there");

    let message = server.read(TIMEOUT, false).unwrap().unwrap();
    assert_eq!(message.opcode(), OpCode::Data(Data::Text));
    assert_eq!(message.to_text().unwrap(), "Hello, World!");
}

#[test]
fn fragments_arrive_slowly() {
    let (mut server, client) = socket_pair();
    let (raw, _) = client.into_channel().into_inner();

    let mut bytes = client_frame(0x02, &[1, 2, 3]);
    bytes.extend(client_frame(0x80, &[4, 5]));
    let trickle = spawn(move || {
        let mut raw = raw;
        for chunk in bytes.chunks(3) {
            raw.write_all(chunk).unwrap();
            sleep(Duration::from_millis(5));
        }
        raw
    });

    let frame = server.read(TIMEOUT, false).unwrap().unwrap();
    assert_eq!(frame.payload(), [1, 2, 3, 4, 5]);
    trickle.join().unwrap();
}

#[test]
fn close_handshake() {
    let (mut server, mut client) = socket_pair();

    client.close(CloseCode::Normal).unwrap();
    let frame = server.read(TIMEOUT, false).unwrap().unwrap();
    assert_eq!(frame.opcode(), OpCode::Control(Control::Close));
    assert_eq!(frame.payload(), [0x03, 0xe8]);
    assert_eq!(frame.close_code(), Some(CloseCode::Normal));

    server.close(CloseCode::Away).unwrap();
    let frame = client.read(TIMEOUT, false).unwrap().unwrap();
    assert_eq!(frame.close_code(), Some(CloseCode::Away));

    drop(client);
    assert!(matches!(server.read(TIMEOUT, false), Err(Error::ConnectionClosed)));
    assert_eq!(server.close_code(), None);
}

#[test]
fn idle_timeout_is_not_an_error() {
    let (mut server, _client) = socket_pair();
    let frame = server.read(Some(Duration::from_millis(20)), false).unwrap();
    assert!(frame.is_none());
    assert_eq!(server.close_code(), None);
}

#[test]
fn random_messages() {
    let (mut server, mut client) = socket_pair();
    let mut rng = rand::rng();

    for _ in 0..50 {
        let len = rng.random_range(0..2048);
        let payload: Vec<u8> = (0..len).map(|_| rng.random()).collect();
        client.write(OpCode::Data(Data::Binary), &payload).unwrap();
        let frame = server.read(TIMEOUT, true).unwrap().unwrap();
        assert_eq!(frame.payload(), &payload[..]);
    }
}
