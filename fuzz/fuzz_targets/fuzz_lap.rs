//! Fuzzes the lap record decoder.
//!
//! Run with:
//!   cargo +nightly fuzz run fuzz_lap
#![no_main]
use acrt_protocol::{LapRecord, sanitize_text};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(lap) = LapRecord::decode(data) {
        let _driver = sanitize_text(&lap.driver_name);
        let _encoded = lap.encode();
    }
});
