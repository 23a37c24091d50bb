//! Codec error types.

use thiserror::Error;

/// Errors produced while decoding Remote Telemetry datagrams.
///
/// Decoding is all-or-nothing: when any of these is returned, no part of the
/// datagram has been exposed to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Buffer is shorter than the fixed wire size of the record.
    #[error("malformed {packet} packet: expected at least {expected} bytes, got {actual}")]
    MalformedPacket {
        packet: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Handshake operation field carries a value outside the protocol's enum.
    #[error("unknown handshake operation {0}")]
    UnknownOperation(u32),
}

impl CodecError {
    pub(crate) fn short(packet: &'static str, expected: usize, actual: usize) -> Self {
        Self::MalformedPacket {
            packet,
            expected,
            actual,
        }
    }
}
