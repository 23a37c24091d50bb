//! Assetto Corsa Remote Telemetry client.
//!
//! Connects to the simulator's UDP telemetry endpoint (port 9996 by default),
//! performs the handshake, subscribes to either per-step car state or
//! per-lap records, and keeps the latest values in snapshots that can be
//! read at any time or pushed to subscribers.
//!
//! ```no_run
//! use acrt_client::{AcUdpConnection, DataType};
//!
//! # async fn run() -> Result<(), acrt_client::ClientError> {
//! let client = AcUdpConnection::with_address("192.168.1.20", DataType::CarInfo)?;
//! client.on_car_update(|car| {
//!     println!("{:.1} km/h in gear {}", car.speed_kph, car.gear);
//!     Ok(())
//! });
//! client.connect().await?;
//! // ...
//! client.disconnect().await;
//! # Ok(())
//! # }
//! ```

#![deny(static_mut_refs)]

pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod session;
pub mod state;

pub use config::{ClientConfig, DEFAULT_RECV_BUFFER_SIZE, DataType};
pub use connection::AcUdpConnection;
pub use dispatch::{DispatchReport, EventDispatcher, SubscriptionId, UpdateKind};
pub use error::{ClientError, Result};
pub use session::{CarSnapshot, LapSnapshot, SessionSnapshot, millis_to_duration};
pub use state::{ConnectionState, ConnectionStats};
