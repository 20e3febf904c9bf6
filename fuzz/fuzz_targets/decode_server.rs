#![no_main]
use libfuzzer_sys::fuzz_target;
use wss::protocol::{frame::Parse, Decoder, Role};

fuzz_target!(|data: &[u8]| {
    let mut decoder = Decoder::new(Role::Server, 64 * 1024);
    let mut input = data;
    while !input.is_empty() {
        match decoder.feed(input) {
            Ok((consumed, Parse::Ready(_))) => input = &input[consumed..],
            Ok((consumed, Parse::NeedMore(_))) => {
                assert_eq!(consumed, input.len());
                break;
            }
            Err(_) => break,
        }
    }
});
