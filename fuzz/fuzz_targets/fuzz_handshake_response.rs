//! Fuzzes the handshake response and request decoders.
//!
//! Run with:
//!   cargo +nightly fuzz run fuzz_handshake_response
#![no_main]
use acrt_protocol::{HandshakeRequest, HandshakeResponse, sanitize_text};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(response) = HandshakeResponse::decode(data) {
        let _track = sanitize_text(&response.track_name);
        let _encoded = response.encode();
    }
    if let Ok(request) = HandshakeRequest::decode(data) {
        assert_eq!(HandshakeRequest::decode(&request.encode()), Ok(request));
    }
});
