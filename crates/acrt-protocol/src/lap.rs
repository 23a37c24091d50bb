//! Lap completion record, streamed after [`crate::HandshakeOperation::RequestLapInfo`].

use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::reader::{PacketReader, PacketWriter};
use crate::text::TEXT_UNITS;

/// Wire size of [`LapRecord`].
pub const LAP_RECORD_SIZE: usize = 212;

/// Byte offsets of [`LapRecord`] fields (sequential, 1-byte packing).
pub mod offsets {
    use crate::text::TEXT_BYTES;

    pub const CAR_IDENTIFIER_NUMBER: usize = 0;
    pub const LAP: usize = 4;
    pub const DRIVER_NAME: usize = 8;
    pub const CAR_NAME: usize = DRIVER_NAME + TEXT_BYTES;
    pub const TIME: usize = CAR_NAME + TEXT_BYTES;
}

/// A completed lap of any car in the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LapRecord {
    pub car_identifier_number: i32,
    pub lap: i32,
    pub driver_name: String,
    pub car_name: String,
    /// Lap time in milliseconds.
    pub time_ms: i32,
}

impl LapRecord {
    pub fn encode(&self) -> [u8; LAP_RECORD_SIZE] {
        let mut out = [0u8; LAP_RECORD_SIZE];
        let mut writer = PacketWriter::new(&mut out);
        writer.put_i32(offsets::CAR_IDENTIFIER_NUMBER, self.car_identifier_number);
        writer.put_i32(offsets::LAP, self.lap);
        writer.put_text(offsets::DRIVER_NAME, TEXT_UNITS, &self.driver_name);
        writer.put_text(offsets::CAR_NAME, TEXT_UNITS, &self.car_name);
        writer.put_i32(offsets::TIME, self.time_ms);
        out
    }

    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
        let reader = PacketReader::new("lap", data, LAP_RECORD_SIZE)?;
        Ok(Self {
            car_identifier_number: reader.i32_at(offsets::CAR_IDENTIFIER_NUMBER)?,
            lap: reader.i32_at(offsets::LAP)?,
            driver_name: reader.text_at(offsets::DRIVER_NAME, TEXT_UNITS)?,
            car_name: reader.text_at(offsets::CAR_NAME, TEXT_UNITS)?,
            time_ms: reader.i32_at(offsets::TIME)?,
        })
    }
}
