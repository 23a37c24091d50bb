//! Live session watcher.

use std::time::Duration;

use acrt_client::{AcUdpConnection, ClientConfig, ConnectionState, DataType};
use anyhow::{Context, Result};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::commands::WatchArgs;
use crate::error::CliError;
use crate::output;

/// Resolve the effective configuration: file first, then flag overrides.
pub async fn build_config(args: &WatchArgs) -> Result<ClientConfig, CliError> {
    let mut config = match &args.config {
        Some(path) => ClientConfig::load_from_path(path).await?,
        None => ClientConfig::default(),
    };

    if let Some(address) = &args.address {
        config.server_address = address.clone();
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(mode) = args.mode {
        config.data_type = mode;
    }

    config.validate()?;
    Ok(config)
}

/// Execute the watch command.
pub async fn execute(args: &WatchArgs, json: bool) -> Result<()> {
    let config = build_config(args).await?;
    let client = AcUdpConnection::new(config).map_err(CliError::from)?;

    match client.data_type() {
        DataType::CarInfo => {
            client.on_car_update(move |car| {
                output::print_car(car, json);
                Ok(())
            });
        }
        DataType::LapTime => {
            client.on_lap_update(move |lap| {
                output::print_lap(lap, json);
                Ok(())
            });
        }
    }

    let mut states = client.subscribe_state();
    client
        .connect()
        .await
        .map_err(CliError::from)
        .context("failed to start telemetry session")?;
    info!(endpoint = %client.server_endpoint(), "Waiting for handshake reply");

    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);
    let limit = args.duration.map(Duration::from_secs);
    let deadline = async move {
        match limit {
            Some(limit) => sleep(limit).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    let outcome = loop {
        tokio::select! {
            result = &mut interrupt => {
                if let Err(e) = result {
                    warn!(error = %e, "Failed to listen for Ctrl+C");
                }
                info!("Interrupted; signing off");
                break Ok(());
            }
            () = &mut deadline => {
                info!("Watch duration elapsed; signing off");
                break Ok(());
            }
            changed = states.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let state = *states.borrow_and_update();
                match state {
                    ConnectionState::Connected => {
                        output::print_session(&client.session(), client.data_type(), json);
                    }
                    ConnectionState::Disconnected => {
                        break match client.last_error() {
                            Some(error) => Err(CliError::ServerUnreachable(error.to_string())),
                            None => Ok(()),
                        };
                    }
                    _ => {}
                }
            }
        }
    };

    client.disconnect().await;
    output::print_stats(&client.stats(), json);
    outcome.map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn args() -> WatchArgs {
        WatchArgs {
            address: None,
            port: None,
            mode: None,
            config: None,
            duration: None,
        }
    }

    #[tokio::test]
    async fn test_flags_override_config_file() -> TestResult {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(
            file,
            r#"{{ "server_address": "10.0.0.5", "port": 9000, "data_type": "lap_time" }}"#
        )?;

        let config = build_config(&WatchArgs {
            config: Some(file.path().to_path_buf()),
            port: Some(9100),
            ..args()
        })
        .await?;

        assert_eq!(config.server_address, "10.0.0.5");
        assert_eq!(config.port, 9100);
        assert_eq!(config.data_type, DataType::LapTime);
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_address_is_a_configuration_error() {
        let result = build_config(&WatchArgs {
            address: Some("localhost".to_string()),
            ..args()
        })
        .await;
        assert!(matches!(result, Err(CliError::InvalidConfiguration(_))));
    }
}
