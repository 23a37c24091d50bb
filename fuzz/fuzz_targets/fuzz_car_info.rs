//! Fuzzes the car-state record decoder.
//!
//! Run with:
//!   cargo +nightly fuzz run fuzz_car_info
#![no_main]
use acrt_protocol::{CAR_INFO_SIZE, CarInfoRecord};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Errors are expected on arbitrary bytes; panics are not.
    if let Ok(record) = CarInfoRecord::decode(data) {
        let encoded = record.encode();
        assert_eq!(encoded.len(), CAR_INFO_SIZE);
        let _label = record.gear_label();
    }
});
