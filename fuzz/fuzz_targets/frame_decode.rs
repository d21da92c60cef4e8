//! Fuzz target for Frame::decode
//!
//! Arbitrary text must never panic the decoder. Whatever decodes must encode
//! again and decode to the same frame.

#![no_main]

use kith_proto::Frame;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else { return };
    let Ok(frame) = Frame::decode(text) else { return };

    let encoded = frame.encode().expect("decoded frame must encode");
    let again = Frame::decode(&encoded).expect("encoded frame must decode");
    assert_eq!(frame, again);
});
