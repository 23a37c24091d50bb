//! Assetto Corsa Remote Telemetry UDP wire codec.
//!
//! This crate is intentionally I/O-free: it maps datagrams to and from the
//! four fixed-size records of the protocol and nothing else, so it can be
//! tested and fuzzed without a running simulator.
//!
//! # Protocol
//!
//! | Record                | Direction       | Size  |
//! |-----------------------|-----------------|-------|
//! | [`HandshakeRequest`]  | client → server | 12 B  |
//! | [`HandshakeResponse`] | server → client | 408 B |
//! | [`LapRecord`]         | server → client | 212 B |
//! | [`CarInfoRecord`]     | server → client | 328 B |
//!
//! All numbers are little-endian; text fields are 50 UTF-16LE code units,
//! null padded. The server listens on UDP port [`DEFAULT_SERVER_PORT`].
//!
//! ```
//! use acrt_protocol::{HandshakeOperation, HandshakeRequest};
//!
//! let bytes = HandshakeRequest::new(HandshakeOperation::Connect).encode();
//! assert_eq!(bytes, [1, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0]);
//! ```

#![deny(static_mut_refs)]

pub mod car_info;
pub mod error;
pub mod handshake;
pub mod lap;
mod reader;
pub mod text;

pub use car_info::{
    CAR_INFO_SIZE, CarInfoRecord, Coordinates, FIELD_LAYOUT, FieldSpan, PerWheel, field_span,
    gear_label,
};
pub use error::CodecError;
pub use handshake::{
    DEFAULT_CLIENT_IDENTIFIER, DEFAULT_CLIENT_VERSION, HANDSHAKE_REQUEST_SIZE,
    HANDSHAKE_RESPONSE_SIZE, HandshakeOperation, HandshakeRequest, HandshakeResponse,
    SERVER_STATUS_OK,
};
pub use lap::{LAP_RECORD_SIZE, LapRecord};
pub use text::{TEXT_UNITS, decode_utf16_fixed, encode_utf16_fixed, sanitize_text};

/// UDP port the Remote Telemetry server listens on.
pub const DEFAULT_SERVER_PORT: u16 = 9996;

/// Largest record the server sends; receive buffers must hold at least this.
pub const MAX_INBOUND_SIZE: usize = HANDSHAKE_RESPONSE_SIZE;
