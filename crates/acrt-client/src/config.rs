//! Client configuration.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::Path;
use std::str::FromStr;

use acrt_protocol::{
    DEFAULT_CLIENT_IDENTIFIER, DEFAULT_CLIENT_VERSION, DEFAULT_SERVER_PORT, HandshakeOperation,
    MAX_INBOUND_SIZE,
};
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

/// Receive buffer used when none is configured; comfortably above the
/// largest inbound record.
pub const DEFAULT_RECV_BUFFER_SIZE: usize = 512;

/// Telemetry stream requested after the handshake.
///
/// Fixed for the lifetime of a connection; switching streams requires a new
/// client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    /// Per-physics-step car state ([`acrt_protocol::CarInfoRecord`]).
    #[default]
    CarInfo,
    /// One record per completed lap ([`acrt_protocol::LapRecord`]).
    LapTime,
}

impl DataType {
    /// Handshake operation that subscribes to this stream.
    pub const fn handshake_operation(self) -> HandshakeOperation {
        match self {
            DataType::CarInfo => HandshakeOperation::RequestCarInfo,
            DataType::LapTime => HandshakeOperation::RequestLapInfo,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            DataType::CarInfo => "car_info",
            DataType::LapTime => "lap_time",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "car" | "carinfo" | "car_info" | "1" => Ok(DataType::CarInfo),
            "lap" | "laptime" | "lap_time" | "lapinfo" | "lap_info" | "2" => Ok(DataType::LapTime),
            _ => Err(ClientError::UnsupportedDataType(s.to_string())),
        }
    }
}

impl TryFrom<u32> for DataType {
    type Error = ClientError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            1 => Ok(DataType::CarInfo),
            2 => Ok(DataType::LapTime),
            other => Err(ClientError::UnsupportedDataType(other.to_string())),
        }
    }
}

/// Connection settings for [`crate::AcUdpConnection`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// IPv4 address of the machine running the simulator.
    pub server_address: String,
    pub port: u16,
    pub data_type: DataType,
    /// Identifier sent in every handshake request.
    pub identifier: u32,
    /// Interface version sent in every handshake request.
    pub version: u32,
    pub recv_buffer_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_address: Ipv4Addr::LOCALHOST.to_string(),
            port: DEFAULT_SERVER_PORT,
            data_type: DataType::default(),
            identifier: DEFAULT_CLIENT_IDENTIFIER,
            version: DEFAULT_CLIENT_VERSION,
            recv_buffer_size: DEFAULT_RECV_BUFFER_SIZE,
        }
    }
}

impl ClientConfig {
    pub fn new(server_address: impl Into<String>, data_type: DataType) -> Self {
        Self {
            server_address: server_address.into(),
            data_type,
            ..Self::default()
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Parse a JSON configuration document; missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ClientError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file.
    pub async fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            ClientError::InvalidConfig(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&content)
    }

    /// Parsed server IPv4 address.
    pub fn server_ip(&self) -> Result<Ipv4Addr> {
        self.server_address
            .trim()
            .parse::<Ipv4Addr>()
            .map_err(|source| ClientError::InvalidAddress {
                input: self.server_address.clone(),
                source,
            })
    }

    pub fn server_endpoint(&self) -> Result<SocketAddr> {
        Ok(SocketAddr::V4(SocketAddrV4::new(self.server_ip()?, self.port)))
    }

    pub fn validate(&self) -> Result<()> {
        self.server_ip()?;

        if self.port == 0 {
            return Err(ClientError::InvalidConfig("port must be nonzero".to_string()));
        }

        if self.recv_buffer_size < MAX_INBOUND_SIZE {
            return Err(ClientError::InvalidConfig(format!(
                "receive buffer of {} bytes cannot hold a {MAX_INBOUND_SIZE}-byte handshake response",
                self.recv_buffer_size
            )));
        }

        Ok(())
    }
}
