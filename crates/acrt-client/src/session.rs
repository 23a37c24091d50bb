//! Latest-known session, lap and car state.
//!
//! Snapshots are plain data overwritten by each matching datagram. The only
//! derived value is [`CarSnapshot::max_engine_rpm`], maintained by
//! [`CarSnapshot::record_engine_rpm`].

use std::time::Duration;

use acrt_protocol::{CarInfoRecord, HandshakeResponse, LapRecord, sanitize_text};
use serde::Serialize;

/// Convert a wire millisecond count to a duration; negative values clamp to zero.
pub fn millis_to_duration(ms: i32) -> Duration {
    u64::try_from(ms).map_or(Duration::ZERO, Duration::from_millis)
}

/// Session identity reported by the handshake response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub driver_name: String,
    pub car_name: String,
    pub track_name: String,
    pub track_layout: String,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            driver_name: "drivername".to_string(),
            car_name: "carname".to_string(),
            track_name: "trackname".to_string(),
            track_layout: "tracklayout".to_string(),
        }
    }
}

impl SessionSnapshot {
    pub fn apply(&mut self, response: &HandshakeResponse) {
        self.driver_name = sanitize_text(&response.driver_name).to_string();
        self.car_name = sanitize_text(&response.car_name).to_string();
        self.track_name = sanitize_text(&response.track_name).to_string();
        self.track_layout = sanitize_text(&response.track_config).to_string();
    }
}

/// The most recently completed lap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LapSnapshot {
    pub driver_name: String,
    pub car_name: String,
    pub car_number: i32,
    pub lap_number: i32,
    pub lap_time: Duration,
}

impl Default for LapSnapshot {
    fn default() -> Self {
        Self {
            driver_name: "drivername".to_string(),
            car_name: "carname".to_string(),
            car_number: 0,
            lap_number: 0,
            lap_time: Duration::ZERO,
        }
    }
}

impl LapSnapshot {
    pub fn apply(&mut self, lap: &LapRecord) {
        self.driver_name = sanitize_text(&lap.driver_name).to_string();
        self.car_name = sanitize_text(&lap.car_name).to_string();
        self.car_number = lap.car_identifier_number;
        self.lap_number = lap.lap;
        self.lap_time = millis_to_duration(lap.time_ms);
    }
}

/// Player car state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CarSnapshot {
    pub last_lap_time: Duration,
    pub best_lap_time: Duration,
    pub current_lap_time: Duration,
    pub lap_number: i32,
    pub speed_kph: f32,
    /// Raw gear: 0 = reverse, 1 = neutral, 2 = first gear, ...
    pub gear: i32,
    engine_rpm: f32,
    max_engine_rpm: f32,
}

impl CarSnapshot {
    /// Dashboard label for [`Self::gear`]: `"R"`, `"N"`, `"1"`, ...
    pub fn gear_label(&self) -> String {
        acrt_protocol::gear_label(self.gear)
    }

    pub fn engine_rpm(&self) -> f32 {
        self.engine_rpm
    }

    /// Highest engine RPM written this session. Never decreases.
    pub fn max_engine_rpm(&self) -> f32 {
        self.max_engine_rpm
    }

    /// Set the current engine RPM and raise the session maximum if exceeded.
    pub fn record_engine_rpm(&mut self, rpm: f32) {
        if rpm > self.max_engine_rpm {
            self.max_engine_rpm = rpm;
        }
        self.engine_rpm = rpm;
    }

    pub fn apply(&mut self, car: &CarInfoRecord) {
        self.speed_kph = car.speed_kmh;
        self.record_engine_rpm(car.engine_rpm);
        self.gear = car.gear;
        self.lap_number = car.lap_count;
        self.current_lap_time = millis_to_duration(car.lap_time);
        self.last_lap_time = millis_to_duration(car.last_lap);
        self.best_lap_time = millis_to_duration(car.best_lap);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_before_handshake() {
        let session = SessionSnapshot::default();
        assert_eq!(session.driver_name, "drivername");
        assert_eq!(session.track_layout, "tracklayout");

        let lap = LapSnapshot::default();
        assert_eq!(lap.car_name, "carname");
        assert_eq!(lap.lap_time, Duration::ZERO);
    }

    #[test]
    fn test_session_apply_sanitizes() {
        let mut session = SessionSnapshot::default();
        session.apply(&HandshakeResponse {
            car_name: "Ferrari488%\0\0".to_string(),
            driver_name: "Player%ab".to_string(),
            identifier: 4242,
            version: 1,
            track_name: "monza".to_string(),
            track_config: "%".to_string(),
        });
        assert_eq!(session.car_name, "Ferrari488");
        assert_eq!(session.driver_name, "Player");
        assert_eq!(session.track_name, "monza");
        assert_eq!(session.track_layout, "");
    }

    #[test]
    fn test_lap_apply() {
        let mut lap = LapSnapshot::default();
        lap.apply(&LapRecord {
            car_identifier_number: 4,
            lap: 9,
            driver_name: "Ana%".to_string(),
            car_name: "bmw_m3_e30%zz".to_string(),
            time_ms: 101_250,
        });
        assert_eq!(lap.driver_name, "Ana");
        assert_eq!(lap.car_name, "bmw_m3_e30");
        assert_eq!(lap.car_number, 4);
        assert_eq!(lap.lap_number, 9);
        assert_eq!(lap.lap_time, Duration::from_millis(101_250));
    }

    #[test]
    fn test_car_apply_and_running_max() {
        let mut car = CarSnapshot::default();
        car.apply(&CarInfoRecord {
            speed_kmh: 123.4,
            engine_rpm: 8000.0,
            gear: 3,
            lap_count: 2,
            lap_time: 12_000,
            last_lap: 90_500,
            best_lap: -1,
            ..CarInfoRecord::default()
        });
        assert!((car.speed_kph - 123.4).abs() < 1e-4);
        assert_eq!(car.gear, 3);
        assert_eq!(car.gear_label(), "2");
        assert_eq!(car.lap_number, 2);
        assert_eq!(car.current_lap_time, Duration::from_millis(12_000));
        assert_eq!(car.last_lap_time, Duration::from_millis(90_500));
        assert_eq!(car.best_lap_time, Duration::ZERO);

        car.record_engine_rpm(4000.0);
        assert!((car.engine_rpm() - 4000.0).abs() < f32::EPSILON);
        assert!((car.max_engine_rpm() - 8000.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_nan_rpm_does_not_poison_max() {
        let mut car = CarSnapshot::default();
        car.record_engine_rpm(5000.0);
        car.record_engine_rpm(f32::NAN);
        assert!(car.engine_rpm().is_nan());
        assert!((car.max_engine_rpm() - 5000.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_millis_conversion() {
        assert_eq!(millis_to_duration(0), Duration::ZERO);
        assert_eq!(millis_to_duration(-5), Duration::ZERO);
        assert_eq!(millis_to_duration(1_500), Duration::from_millis(1_500));
    }
}
