//! acrtctl - Assetto Corsa Remote Telemetry CLI
//!
//! Connects to a running simulator, prints session, car or lap updates as
//! they arrive and signs off on Ctrl+C. Also decodes captured datagrams.

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

mod commands;
mod error;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{RecordKind, WatchArgs};
use crate::error::CliError;

#[derive(Parser)]
#[command(name = "acrtctl")]
#[command(about = "Assetto Corsa Remote Telemetry client")]
#[command(version)]
struct Cli {
    /// Output in JSON format for machine parsing
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the simulator and stream updates until interrupted
    Watch(WatchArgs),

    /// Decode a captured datagram
    Decode {
        /// Record layout of the capture
        #[arg(short, long, value_enum)]
        kind: RecordKind,

        /// File holding the raw datagram bytes
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("acrtctl={log_level},acrt_client={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    match execute_command(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.json {
                output::print_error_json(&e);
            } else {
                output::print_error_human(&e);
            }

            let code = e.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
            ExitCode::from(code)
        }
    }
}

async fn execute_command(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Watch(args) => commands::watch::execute(args, cli.json).await,
        Commands::Decode { kind, file } => commands::decode::execute(*kind, file, cli.json).await,
    }
}
