//! Error types for acrtctl

use acrt_client::ClientError;
use acrt_protocol::CodecError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Server unreachable: {0}")]
    ServerUnreachable(String),

    #[error("Malformed capture: {0}")]
    MalformedCapture(#[from] CodecError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl From<ClientError> for CliError {
    fn from(error: ClientError) -> Self {
        match error {
            ClientError::SocketFailure { .. } => CliError::ServerUnreachable(error.to_string()),
            ClientError::MalformedPacket(codec) => CliError::MalformedCapture(codec),
            other => CliError::InvalidConfiguration(other.to_string()),
        }
    }
}

impl CliError {
    /// Process exit code reported for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::InvalidConfiguration(_) | CliError::JsonError(_) => 4,
            CliError::MalformedCapture(_) => 4,
            CliError::ServerUnreachable(_) => 5,
            CliError::IoError(_) => 1,
        }
    }
}
