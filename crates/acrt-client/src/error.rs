//! Client error types.

use std::io;
use std::net::AddrParseError;

use acrt_protocol::CodecError;
use thiserror::Error;

use crate::dispatch::UpdateKind;

/// Errors surfaced by the Remote Telemetry client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The configured server address is not an IPv4 address.
    #[error("invalid server address '{input}': {source}")]
    InvalidAddress {
        input: String,
        #[source]
        source: AddrParseError,
    },

    /// The requested data type selector is not one the server can stream.
    #[error("unsupported data type '{0}' (expected car info or lap time)")]
    UnsupportedDataType(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Bind, connect, send or receive failed on the UDP socket.
    #[error("socket failure while {context}: {source}")]
    SocketFailure {
        context: &'static str,
        #[source]
        source: io::Error,
    },

    /// A datagram did not match the record the current state expects.
    #[error(transparent)]
    MalformedPacket(#[from] CodecError),

    /// A subscriber returned an error or panicked during dispatch.
    #[error("{kind} subscriber failed: {message}")]
    SubscriberFailure { kind: UpdateKind, message: String },
}

impl ClientError {
    pub(crate) fn socket(context: &'static str, source: io::Error) -> Self {
        Self::SocketFailure { context, source }
    }

    /// Whether the error ends the receive loop.
    ///
    /// Malformed datagrams and subscriber failures are dropped and reported;
    /// only socket failures tear the connection down.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::SocketFailure { .. })
    }
}

/// A specialized `Result` type for client operations.
pub type Result<T, E = ClientError> = std::result::Result<T, E>;
