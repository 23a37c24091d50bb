//! Decode a captured datagram.

use std::path::Path;

use acrt_protocol::{CarInfoRecord, HandshakeRequest, HandshakeResponse, LapRecord};
use anyhow::{Context, Result};
use serde_json::Value;

use crate::commands::RecordKind;
use crate::error::CliError;
use crate::output;

/// Execute the decode command.
pub async fn execute(kind: RecordKind, path: &Path, json: bool) -> Result<()> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read capture {}", path.display()))?;

    let decoded = decode(kind, &data)?;
    output::print_decoded(kind, data.len(), &decoded, json);
    Ok(())
}

pub fn decode(kind: RecordKind, data: &[u8]) -> Result<Value, CliError> {
    let value = match kind {
        RecordKind::HandshakeRequest => serde_json::to_value(HandshakeRequest::decode(data)?)?,
        RecordKind::HandshakeResponse => serde_json::to_value(HandshakeResponse::decode(data)?)?,
        RecordKind::Lap => serde_json::to_value(LapRecord::decode(data)?)?,
        RecordKind::CarInfo => {
            let record = CarInfoRecord::decode(data)?;
            let mut value = serde_json::to_value(record)?;
            if let Some(fields) = value.as_object_mut() {
                fields.insert("gear_label".to_string(), Value::from(record.gear_label()));
                fields.insert("wheel_averages".to_string(), wheel_averages(&record));
            }
            value
        }
    };
    Ok(value)
}

/// Four-wheel means of the quantities most often read at a glance.
fn wheel_averages(record: &CarInfoRecord) -> Value {
    let groups = [
        ("wheel_angular_speed", &record.wheel_angular_speed),
        ("slip_ratio", &record.slip_ratio),
        ("tyre_slip", &record.tyre_slip),
        ("load", &record.load),
        ("camber_rad", &record.camber_rad),
        ("suspension_height", &record.suspension_height),
    ];
    groups
        .into_iter()
        .map(|(name, wheel)| (name.to_string(), Value::from(wheel.average())))
        .collect::<serde_json::Map<_, _>>()
        .into()
}
