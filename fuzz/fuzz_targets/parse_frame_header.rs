#![no_main]
use libfuzzer_sys::fuzz_target;
use wss::protocol::{frame::HeaderParser, Role};

fuzz_target!(|data: &[u8]| {
    for role in [Role::Server, Role::Client] {
        let mut parser = HeaderParser::new(role);
        if let Ok((consumed, _)) = parser.feed(data) {
            assert!(consumed <= data.len());
            assert!(consumed <= 14);
        }
    }
});
