//! Command implementations for acrtctl

pub mod decode;
pub mod watch;

use std::path::PathBuf;

use acrt_client::DataType;
use clap::{Args, ValueEnum};

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// IPv4 address of the machine running Assetto Corsa
    #[arg(short, long, env = "ACRT_ADDRESS")]
    pub address: Option<String>,

    /// Remote telemetry UDP port
    #[arg(short, long, env = "ACRT_PORT")]
    pub port: Option<u16>,

    /// Stream to subscribe to: car (per physics step) or lap (per completed lap)
    #[arg(short, long)]
    pub mode: Option<DataType>,

    /// JSON configuration file; flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Stop after this many seconds instead of waiting for Ctrl+C
    #[arg(long)]
    pub duration: Option<u64>,
}

/// Captured datagram layouts understood by `decode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RecordKind {
    HandshakeRequest,
    HandshakeResponse,
    Lap,
    CarInfo,
}
