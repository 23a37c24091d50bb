//! Handshake request and response records.
//!
//! The client opens a session with [`HandshakeOperation::Connect`], receives a
//! [`HandshakeResponse`] describing the session, confirms the stream it wants
//! with [`HandshakeOperation::RequestCarInfo`] or
//! [`HandshakeOperation::RequestLapInfo`], and signs off with
//! [`HandshakeOperation::Disconnect`].

use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::reader::{PacketReader, PacketWriter};
use crate::text::TEXT_UNITS;

/// Wire size of [`HandshakeRequest`].
pub const HANDSHAKE_REQUEST_SIZE: usize = 12;

/// Wire size of [`HandshakeResponse`].
pub const HANDSHAKE_RESPONSE_SIZE: usize = 408;

/// Identifier sent by this client. The server does not interpret it.
pub const DEFAULT_CLIENT_IDENTIFIER: u32 = 1;

/// Remote telemetry interface version this client speaks.
pub const DEFAULT_CLIENT_VERSION: u32 = 1;

/// Status code returned by current servers in [`HandshakeResponse::identifier`].
pub const SERVER_STATUS_OK: u32 = 4242;

/// Byte offsets of [`HandshakeRequest`] fields.
pub mod request_offsets {
    pub const IDENTIFIER: usize = 0;
    pub const VERSION: usize = 4;
    pub const OPERATION: usize = 8;
}

/// Byte offsets of [`HandshakeResponse`] fields (sequential, 1-byte packing).
pub mod response_offsets {
    use crate::text::TEXT_BYTES;

    pub const CAR_NAME: usize = 0;
    pub const DRIVER_NAME: usize = CAR_NAME + TEXT_BYTES;
    pub const IDENTIFIER: usize = DRIVER_NAME + TEXT_BYTES;
    pub const VERSION: usize = IDENTIFIER + 4;
    pub const TRACK_NAME: usize = VERSION + 4;
    pub const TRACK_CONFIG: usize = TRACK_NAME + TEXT_BYTES;
}

/// Operation carried by a [`HandshakeRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum HandshakeOperation {
    Connect = 0,
    RequestCarInfo = 1,
    RequestLapInfo = 2,
    Disconnect = 3,
}

impl HandshakeOperation {
    pub const fn as_u32(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for HandshakeOperation {
    type Error = CodecError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Connect),
            1 => Ok(Self::RequestCarInfo),
            2 => Ok(Self::RequestLapInfo),
            3 => Ok(Self::Disconnect),
            other => Err(CodecError::UnknownOperation(other)),
        }
    }
}

/// Client → server handshake datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandshakeRequest {
    pub identifier: u32,
    pub version: u32,
    pub operation: HandshakeOperation,
}

impl HandshakeRequest {
    /// Request with the default client identifier and version.
    pub const fn new(operation: HandshakeOperation) -> Self {
        Self {
            identifier: DEFAULT_CLIENT_IDENTIFIER,
            version: DEFAULT_CLIENT_VERSION,
            operation,
        }
    }

    pub const fn with_identity(operation: HandshakeOperation, identifier: u32, version: u32) -> Self {
        Self {
            identifier,
            version,
            operation,
        }
    }

    pub fn encode(&self) -> [u8; HANDSHAKE_REQUEST_SIZE] {
        let mut out = [0u8; HANDSHAKE_REQUEST_SIZE];
        let mut writer = PacketWriter::new(&mut out);
        writer.put_u32(request_offsets::IDENTIFIER, self.identifier);
        writer.put_u32(request_offsets::VERSION, self.version);
        writer.put_u32(request_offsets::OPERATION, self.operation.as_u32());
        out
    }

    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
        let reader = PacketReader::new("handshake request", data, HANDSHAKE_REQUEST_SIZE)?;
        Ok(Self {
            identifier: reader.u32_at(request_offsets::IDENTIFIER)?,
            version: reader.u32_at(request_offsets::VERSION)?,
            operation: HandshakeOperation::try_from(reader.u32_at(request_offsets::OPERATION)?)?,
        })
    }
}

/// Server → client reply to [`HandshakeOperation::Connect`].
///
/// Text fields are returned as decoded from the wire (up to the first null);
/// the server's `'%'` terminator is still present. See
/// [`crate::sanitize_text`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeResponse {
    pub car_name: String,
    pub driver_name: String,
    /// Server status code, [`SERVER_STATUS_OK`] on current servers.
    pub identifier: u32,
    /// Server version.
    pub version: u32,
    pub track_name: String,
    pub track_config: String,
}

impl HandshakeResponse {
    pub fn encode(&self) -> [u8; HANDSHAKE_RESPONSE_SIZE] {
        let mut out = [0u8; HANDSHAKE_RESPONSE_SIZE];
        let mut writer = PacketWriter::new(&mut out);
        writer.put_text(response_offsets::CAR_NAME, TEXT_UNITS, &self.car_name);
        writer.put_text(response_offsets::DRIVER_NAME, TEXT_UNITS, &self.driver_name);
        writer.put_u32(response_offsets::IDENTIFIER, self.identifier);
        writer.put_u32(response_offsets::VERSION, self.version);
        writer.put_text(response_offsets::TRACK_NAME, TEXT_UNITS, &self.track_name);
        writer.put_text(response_offsets::TRACK_CONFIG, TEXT_UNITS, &self.track_config);
        out
    }

    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
        let reader = PacketReader::new("handshake response", data, HANDSHAKE_RESPONSE_SIZE)?;
        Ok(Self {
            car_name: reader.text_at(response_offsets::CAR_NAME, TEXT_UNITS)?,
            driver_name: reader.text_at(response_offsets::DRIVER_NAME, TEXT_UNITS)?,
            identifier: reader.u32_at(response_offsets::IDENTIFIER)?,
            version: reader.u32_at(response_offsets::VERSION)?,
            track_name: reader.text_at(response_offsets::TRACK_NAME, TEXT_UNITS)?,
            track_config: reader.text_at(response_offsets::TRACK_CONFIG, TEXT_UNITS)?,
        })
    }
}
