//! Output formatting for CLI responses

use acrt_client::{CarSnapshot, ConnectionStats, DataType, LapSnapshot, SessionSnapshot};
use anyhow::Error;
use colored::*;
use serde::Serialize;
use serde_json::{Value, json};

use crate::commands::RecordKind;

/// Print error in JSON format
pub fn print_error_json(error: &Error) {
    print_json(&json!({
        "success": false,
        "error": {
            "message": format!("{error:#}"),
        }
    }));
}

/// Print error in human-readable format
pub fn print_error_human(error: &Error) {
    eprintln!("{} {}", "Error:".red().bold(), error);

    let mut source = error.source();
    while let Some(err) = source {
        eprintln!("  {} {}", "Caused by:".yellow(), err);
        source = err.source();
    }
}

pub fn print_session(session: &SessionSnapshot, data_type: DataType, json: bool) {
    if json {
        print_event("session", session);
        return;
    }

    println!(
        "{} {} in {} at {} {}",
        "Connected:".green().bold(),
        session.driver_name.bold(),
        session.car_name,
        session.track_name,
        session.track_layout.dimmed()
    );
    println!("Streaming {data_type} updates; press Ctrl+C to stop");
}

pub fn print_car(car: &CarSnapshot, json: bool) {
    if json {
        print_event("car", car);
        return;
    }

    println!(
        "{:>6.1} km/h  gear {:>2}  {:>6.0} rpm (max {:>6.0})  lap {:>3}  {:>9.3}s",
        car.speed_kph,
        car.gear_label(),
        car.engine_rpm(),
        car.max_engine_rpm(),
        car.lap_number,
        car.current_lap_time.as_secs_f64()
    );
}

pub fn print_lap(lap: &LapSnapshot, json: bool) {
    if json {
        print_event("lap", lap);
        return;
    }

    println!(
        "{} {:>3}  {:>9.3}s  {} ({} #{})",
        "Lap".cyan().bold(),
        lap.lap_number,
        lap.lap_time.as_secs_f64(),
        lap.driver_name,
        lap.car_name,
        lap.car_number
    );
}

pub fn print_stats(stats: &ConnectionStats, json: bool) {
    if json {
        print_event("stats", stats);
        return;
    }

    eprintln!(
        "{} {} received, {} decoded, {} malformed, {} ignored, {} events, {} subscriber failures",
        "Session:".bold(),
        stats.datagrams_received,
        stats.datagrams_decoded,
        stats.malformed_datagrams,
        stats.ignored_datagrams,
        stats.events_dispatched,
        stats.subscriber_failures
    );
}

pub fn print_decoded(kind: RecordKind, len: usize, decoded: &Value, json: bool) {
    if json {
        print_json(&json!({
            "success": true,
            "bytes": len,
            "record": decoded,
        }));
        return;
    }

    println!("{} {kind:?} ({len} bytes)", "Decoded".green().bold());
    if let Some(fields) = decoded.as_object() {
        for (name, value) in fields {
            println!("  {name:<32} {value}");
        }
    }
}

/// One JSON object per line, tagged with the event name.
fn print_event<T: Serialize>(event: &str, payload: &T) {
    match serde_json::to_string(&json!({ "event": event, "data": payload })) {
        Ok(line) => println!("{line}"),
        Err(e) => eprintln!("Failed to format {event} as JSON: {e}"),
    }
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("Failed to format output as JSON: {e}"),
    }
}
