//! Car state record (`RTCarInfo`), streamed after
//! [`crate::HandshakeOperation::RequestCarInfo`].
//!
//! The record is 328 bytes with an explicit, non-sequential layout: the six
//! boolean flags are packed into sub-word offsets and bytes 24–25 are
//! padding. The codec reads and writes through [`offsets`], which is the
//! authoritative layout; [`FIELD_LAYOUT`] mirrors it as named spans for
//! tooling and must stay in step with it.

use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::reader::{PacketReader, PacketWriter};

/// Wire size of [`CarInfoRecord`].
pub const CAR_INFO_SIZE: usize = 328;

/// Byte offsets of [`CarInfoRecord`] fields.
pub mod offsets {
    pub const IDENTIFIER: usize = 0;
    pub const SIZE: usize = 4;

    pub const SPEED_KMH: usize = 8;
    pub const SPEED_MPH: usize = 12;
    pub const SPEED_MS: usize = 16;

    pub const IS_ABS_ENABLED: usize = 20;
    pub const IS_ABS_IN_ACTION: usize = 21;
    pub const IS_TC_IN_ACTION: usize = 22;
    pub const IS_TC_ENABLED: usize = 23;
    pub const IS_IN_PIT: usize = 26;
    pub const IS_ENGINE_LIMITER_ON: usize = 27;

    pub const ACC_G_VERTICAL: usize = 28;
    pub const ACC_G_HORIZONTAL: usize = 32;
    pub const ACC_G_FRONTAL: usize = 36;

    pub const LAP_TIME: usize = 40;
    pub const LAST_LAP: usize = 44;
    pub const BEST_LAP: usize = 48;
    pub const LAP_COUNT: usize = 52;

    pub const GAS: usize = 56;
    pub const BRAKE: usize = 60;
    pub const CLUTCH: usize = 64;
    pub const ENGINE_RPM: usize = 68;
    pub const STEER: usize = 72;
    pub const GEAR: usize = 76;
    pub const CG_HEIGHT: usize = 80;

    pub const WHEEL_ANGULAR_SPEED: usize = 84;
    pub const SLIP_ANGLE: usize = 100;
    pub const SLIP_ANGLE_CONTACT_PATCH: usize = 116;
    pub const SLIP_RATIO: usize = 132;
    pub const TYRE_SLIP: usize = 148;
    pub const ND_SLIP: usize = 164;
    pub const LOAD: usize = 180;
    pub const DY: usize = 196;
    pub const MZ: usize = 212;
    pub const TYRE_DIRTY_LEVEL: usize = 228;

    pub const CAMBER_RAD: usize = 244;
    pub const TYRE_RADIUS: usize = 260;
    pub const TYRE_LOADED_RADIUS: usize = 276;
    pub const SUSPENSION_HEIGHT: usize = 292;

    pub const CAR_POSITION_NORMALIZED: usize = 308;
    pub const CAR_SLOPE: usize = 312;
    pub const CAR_COORDINATES: usize = 316;
}

/// Wire size of a [`PerWheel`] group.
pub const PER_WHEEL_SIZE: usize = 16;

/// Wire size of [`Coordinates`].
pub const COORDINATES_SIZE: usize = 12;

/// One field of the explicit layout: `len` bytes starting at `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpan {
    pub name: &'static str,
    pub offset: usize,
    pub len: usize,
}

impl FieldSpan {
    const fn new(name: &'static str, offset: usize, len: usize) -> Self {
        Self { name, offset, len }
    }

    pub const fn end(&self) -> usize {
        self.offset + self.len
    }

    pub const fn contains(&self, byte: usize) -> bool {
        byte >= self.offset && byte < self.end()
    }
}

/// The complete explicit layout of [`CarInfoRecord`], in offset order.
///
/// Each span's `name` is the serialized field name and its offset is the
/// matching [`offsets`] constant.
pub const FIELD_LAYOUT: &[FieldSpan] = &[
    FieldSpan::new("identifier", offsets::IDENTIFIER, 2),
    FieldSpan::new("size", offsets::SIZE, 4),
    FieldSpan::new("speed_kmh", offsets::SPEED_KMH, 4),
    FieldSpan::new("speed_mph", offsets::SPEED_MPH, 4),
    FieldSpan::new("speed_ms", offsets::SPEED_MS, 4),
    FieldSpan::new("is_abs_enabled", offsets::IS_ABS_ENABLED, 1),
    FieldSpan::new("is_abs_in_action", offsets::IS_ABS_IN_ACTION, 1),
    FieldSpan::new("is_tc_in_action", offsets::IS_TC_IN_ACTION, 1),
    FieldSpan::new("is_tc_enabled", offsets::IS_TC_ENABLED, 1),
    FieldSpan::new("is_in_pit", offsets::IS_IN_PIT, 1),
    FieldSpan::new("is_engine_limiter_on", offsets::IS_ENGINE_LIMITER_ON, 1),
    FieldSpan::new("acc_g_vertical", offsets::ACC_G_VERTICAL, 4),
    FieldSpan::new("acc_g_horizontal", offsets::ACC_G_HORIZONTAL, 4),
    FieldSpan::new("acc_g_frontal", offsets::ACC_G_FRONTAL, 4),
    FieldSpan::new("lap_time", offsets::LAP_TIME, 4),
    FieldSpan::new("last_lap", offsets::LAST_LAP, 4),
    FieldSpan::new("best_lap", offsets::BEST_LAP, 4),
    FieldSpan::new("lap_count", offsets::LAP_COUNT, 4),
    FieldSpan::new("gas", offsets::GAS, 4),
    FieldSpan::new("brake", offsets::BRAKE, 4),
    FieldSpan::new("clutch", offsets::CLUTCH, 4),
    FieldSpan::new("engine_rpm", offsets::ENGINE_RPM, 4),
    FieldSpan::new("steer", offsets::STEER, 4),
    FieldSpan::new("gear", offsets::GEAR, 4),
    FieldSpan::new("cg_height", offsets::CG_HEIGHT, 4),
    FieldSpan::new("wheel_angular_speed", offsets::WHEEL_ANGULAR_SPEED, PER_WHEEL_SIZE),
    FieldSpan::new("slip_angle", offsets::SLIP_ANGLE, PER_WHEEL_SIZE),
    FieldSpan::new("slip_angle_contact_patch", offsets::SLIP_ANGLE_CONTACT_PATCH, PER_WHEEL_SIZE),
    FieldSpan::new("slip_ratio", offsets::SLIP_RATIO, PER_WHEEL_SIZE),
    FieldSpan::new("tyre_slip", offsets::TYRE_SLIP, PER_WHEEL_SIZE),
    FieldSpan::new("nd_slip", offsets::ND_SLIP, PER_WHEEL_SIZE),
    FieldSpan::new("load", offsets::LOAD, PER_WHEEL_SIZE),
    FieldSpan::new("dy", offsets::DY, PER_WHEEL_SIZE),
    FieldSpan::new("mz", offsets::MZ, PER_WHEEL_SIZE),
    FieldSpan::new("tyre_dirty_level", offsets::TYRE_DIRTY_LEVEL, PER_WHEEL_SIZE),
    FieldSpan::new("camber_rad", offsets::CAMBER_RAD, PER_WHEEL_SIZE),
    FieldSpan::new("tyre_radius", offsets::TYRE_RADIUS, PER_WHEEL_SIZE),
    FieldSpan::new("tyre_loaded_radius", offsets::TYRE_LOADED_RADIUS, PER_WHEEL_SIZE),
    FieldSpan::new("suspension_height", offsets::SUSPENSION_HEIGHT, PER_WHEEL_SIZE),
    FieldSpan::new("car_position_normalized", offsets::CAR_POSITION_NORMALIZED, 4),
    FieldSpan::new("car_slope", offsets::CAR_SLOPE, 4),
    FieldSpan::new("car_coordinates", offsets::CAR_COORDINATES, COORDINATES_SIZE),
];

/// Look up a field of [`FIELD_LAYOUT`] by name.
pub fn field_span(name: &str) -> Option<FieldSpan> {
    FIELD_LAYOUT.iter().copied().find(|span| span.name == name)
}

/// One physical quantity across all four wheels.
///
/// Wire order is always left-front, right-front, left-rear, right-rear.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerWheel {
    pub lf: f32,
    pub rf: f32,
    pub lr: f32,
    pub rr: f32,
}

impl PerWheel {
    pub const fn new(lf: f32, rf: f32, lr: f32, rr: f32) -> Self {
        Self { lf, rf, lr, rr }
    }

    /// Values in wire order `[LF, RF, LR, RR]`.
    pub const fn as_array(&self) -> [f32; 4] {
        [self.lf, self.rf, self.lr, self.rr]
    }

    pub fn average(&self) -> f32 {
        (self.lf + self.rf + self.lr + self.rr) / 4.0
    }
}

/// World-space car position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Decoded `RTCarInfo` record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CarInfoRecord {
    /// Record tag, a single UTF-16 code unit (`'a'` on current servers).
    pub identifier: u16,
    pub size: i32,

    pub speed_kmh: f32,
    pub speed_mph: f32,
    pub speed_ms: f32,

    pub is_abs_enabled: bool,
    pub is_abs_in_action: bool,
    pub is_tc_in_action: bool,
    pub is_tc_enabled: bool,
    pub is_in_pit: bool,
    pub is_engine_limiter_on: bool,

    pub acc_g_vertical: f32,
    pub acc_g_horizontal: f32,
    pub acc_g_frontal: f32,

    /// Current lap time in milliseconds.
    pub lap_time: i32,
    /// Last lap time in milliseconds.
    pub last_lap: i32,
    /// Best lap time in milliseconds.
    pub best_lap: i32,
    pub lap_count: i32,

    pub gas: f32,
    pub brake: f32,
    pub clutch: f32,
    pub engine_rpm: f32,
    pub steer: f32,
    /// Raw gear: 0 = reverse, 1 = neutral, 2 = first gear, ...
    pub gear: i32,
    pub cg_height: f32,

    pub wheel_angular_speed: PerWheel,
    pub slip_angle: PerWheel,
    pub slip_angle_contact_patch: PerWheel,
    pub slip_ratio: PerWheel,
    pub tyre_slip: PerWheel,
    pub nd_slip: PerWheel,
    pub load: PerWheel,
    /// Lateral tyre force.
    pub dy: PerWheel,
    /// Self-aligning torque.
    pub mz: PerWheel,
    pub tyre_dirty_level: PerWheel,

    pub camber_rad: PerWheel,
    pub tyre_radius: PerWheel,
    pub tyre_loaded_radius: PerWheel,
    pub suspension_height: PerWheel,

    pub car_position_normalized: f32,
    pub car_slope: f32,
    pub car_coordinates: Coordinates,
}

impl CarInfoRecord {
    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
        let r = PacketReader::new("car info", data, CAR_INFO_SIZE)?;
        Ok(Self {
            identifier: r.u16_at(offsets::IDENTIFIER)?,
            size: r.i32_at(offsets::SIZE)?,

            speed_kmh: r.f32_at(offsets::SPEED_KMH)?,
            speed_mph: r.f32_at(offsets::SPEED_MPH)?,
            speed_ms: r.f32_at(offsets::SPEED_MS)?,

            is_abs_enabled: r.bool_at(offsets::IS_ABS_ENABLED)?,
            is_abs_in_action: r.bool_at(offsets::IS_ABS_IN_ACTION)?,
            is_tc_in_action: r.bool_at(offsets::IS_TC_IN_ACTION)?,
            is_tc_enabled: r.bool_at(offsets::IS_TC_ENABLED)?,
            is_in_pit: r.bool_at(offsets::IS_IN_PIT)?,
            is_engine_limiter_on: r.bool_at(offsets::IS_ENGINE_LIMITER_ON)?,

            acc_g_vertical: r.f32_at(offsets::ACC_G_VERTICAL)?,
            acc_g_horizontal: r.f32_at(offsets::ACC_G_HORIZONTAL)?,
            acc_g_frontal: r.f32_at(offsets::ACC_G_FRONTAL)?,

            lap_time: r.i32_at(offsets::LAP_TIME)?,
            last_lap: r.i32_at(offsets::LAST_LAP)?,
            best_lap: r.i32_at(offsets::BEST_LAP)?,
            lap_count: r.i32_at(offsets::LAP_COUNT)?,

            gas: r.f32_at(offsets::GAS)?,
            brake: r.f32_at(offsets::BRAKE)?,
            clutch: r.f32_at(offsets::CLUTCH)?,
            engine_rpm: r.f32_at(offsets::ENGINE_RPM)?,
            steer: r.f32_at(offsets::STEER)?,
            gear: r.i32_at(offsets::GEAR)?,
            cg_height: r.f32_at(offsets::CG_HEIGHT)?,

            wheel_angular_speed: read_wheel(&r, offsets::WHEEL_ANGULAR_SPEED)?,
            slip_angle: read_wheel(&r, offsets::SLIP_ANGLE)?,
            slip_angle_contact_patch: read_wheel(&r, offsets::SLIP_ANGLE_CONTACT_PATCH)?,
            slip_ratio: read_wheel(&r, offsets::SLIP_RATIO)?,
            tyre_slip: read_wheel(&r, offsets::TYRE_SLIP)?,
            nd_slip: read_wheel(&r, offsets::ND_SLIP)?,
            load: read_wheel(&r, offsets::LOAD)?,
            dy: read_wheel(&r, offsets::DY)?,
            mz: read_wheel(&r, offsets::MZ)?,
            tyre_dirty_level: read_wheel(&r, offsets::TYRE_DIRTY_LEVEL)?,

            camber_rad: read_wheel(&r, offsets::CAMBER_RAD)?,
            tyre_radius: read_wheel(&r, offsets::TYRE_RADIUS)?,
            tyre_loaded_radius: read_wheel(&r, offsets::TYRE_LOADED_RADIUS)?,
            suspension_height: read_wheel(&r, offsets::SUSPENSION_HEIGHT)?,

            car_position_normalized: r.f32_at(offsets::CAR_POSITION_NORMALIZED)?,
            car_slope: r.f32_at(offsets::CAR_SLOPE)?,
            car_coordinates: Coordinates {
                x: r.f32_at(offsets::CAR_COORDINATES)?,
                y: r.f32_at(offsets::CAR_COORDINATES + AXIS_STRIDE)?,
                z: r.f32_at(offsets::CAR_COORDINATES + 2 * AXIS_STRIDE)?,
            },
        })
    }

    /// Encode into a zeroed 328-byte record; padding bytes stay zero.
    pub fn encode(&self) -> [u8; CAR_INFO_SIZE] {
        let mut out = [0u8; CAR_INFO_SIZE];
        let mut w = PacketWriter::new(&mut out);

        w.put_u16(offsets::IDENTIFIER, self.identifier);
        w.put_i32(offsets::SIZE, self.size);

        w.put_f32(offsets::SPEED_KMH, self.speed_kmh);
        w.put_f32(offsets::SPEED_MPH, self.speed_mph);
        w.put_f32(offsets::SPEED_MS, self.speed_ms);

        w.put_bool(offsets::IS_ABS_ENABLED, self.is_abs_enabled);
        w.put_bool(offsets::IS_ABS_IN_ACTION, self.is_abs_in_action);
        w.put_bool(offsets::IS_TC_IN_ACTION, self.is_tc_in_action);
        w.put_bool(offsets::IS_TC_ENABLED, self.is_tc_enabled);
        w.put_bool(offsets::IS_IN_PIT, self.is_in_pit);
        w.put_bool(offsets::IS_ENGINE_LIMITER_ON, self.is_engine_limiter_on);

        w.put_f32(offsets::ACC_G_VERTICAL, self.acc_g_vertical);
        w.put_f32(offsets::ACC_G_HORIZONTAL, self.acc_g_horizontal);
        w.put_f32(offsets::ACC_G_FRONTAL, self.acc_g_frontal);

        w.put_i32(offsets::LAP_TIME, self.lap_time);
        w.put_i32(offsets::LAST_LAP, self.last_lap);
        w.put_i32(offsets::BEST_LAP, self.best_lap);
        w.put_i32(offsets::LAP_COUNT, self.lap_count);

        w.put_f32(offsets::GAS, self.gas);
        w.put_f32(offsets::BRAKE, self.brake);
        w.put_f32(offsets::CLUTCH, self.clutch);
        w.put_f32(offsets::ENGINE_RPM, self.engine_rpm);
        w.put_f32(offsets::STEER, self.steer);
        w.put_i32(offsets::GEAR, self.gear);
        w.put_f32(offsets::CG_HEIGHT, self.cg_height);

        write_wheel(&mut w, offsets::WHEEL_ANGULAR_SPEED, &self.wheel_angular_speed);
        write_wheel(&mut w, offsets::SLIP_ANGLE, &self.slip_angle);
        write_wheel(&mut w, offsets::SLIP_ANGLE_CONTACT_PATCH, &self.slip_angle_contact_patch);
        write_wheel(&mut w, offsets::SLIP_RATIO, &self.slip_ratio);
        write_wheel(&mut w, offsets::TYRE_SLIP, &self.tyre_slip);
        write_wheel(&mut w, offsets::ND_SLIP, &self.nd_slip);
        write_wheel(&mut w, offsets::LOAD, &self.load);
        write_wheel(&mut w, offsets::DY, &self.dy);
        write_wheel(&mut w, offsets::MZ, &self.mz);
        write_wheel(&mut w, offsets::TYRE_DIRTY_LEVEL, &self.tyre_dirty_level);

        write_wheel(&mut w, offsets::CAMBER_RAD, &self.camber_rad);
        write_wheel(&mut w, offsets::TYRE_RADIUS, &self.tyre_radius);
        write_wheel(&mut w, offsets::TYRE_LOADED_RADIUS, &self.tyre_loaded_radius);
        write_wheel(&mut w, offsets::SUSPENSION_HEIGHT, &self.suspension_height);

        w.put_f32(offsets::CAR_POSITION_NORMALIZED, self.car_position_normalized);
        w.put_f32(offsets::CAR_SLOPE, self.car_slope);
        w.put_f32(offsets::CAR_COORDINATES, self.car_coordinates.x);
        w.put_f32(offsets::CAR_COORDINATES + AXIS_STRIDE, self.car_coordinates.y);
        w.put_f32(offsets::CAR_COORDINATES + 2 * AXIS_STRIDE, self.car_coordinates.z);

        out
    }

    /// Record tag as a character, if it is a valid scalar value.
    pub fn identifier_char(&self) -> Option<char> {
        char::from_u32(u32::from(self.identifier))
    }

    /// Dashboard label for [`Self::gear`]: `"R"`, `"N"`, `"1"`, `"2"`, ...
    pub fn gear_label(&self) -> String {
        gear_label(self.gear)
    }
}

/// Dashboard label for a raw wire gear value (0 = reverse, 1 = neutral).
pub fn gear_label(gear: i32) -> String {
    match gear {
        0 => "R".to_string(),
        1 => "N".to_string(),
        g if g > 1 => (g - 1).to_string(),
        g => format!("?{g}"),
    }
}

const WHEEL_STRIDE: usize = PER_WHEEL_SIZE / 4;
const AXIS_STRIDE: usize = COORDINATES_SIZE / 3;

fn read_wheel(r: &PacketReader<'_>, offset: usize) -> Result<PerWheel, CodecError> {
    Ok(PerWheel {
        lf: r.f32_at(offset)?,
        rf: r.f32_at(offset + WHEEL_STRIDE)?,
        lr: r.f32_at(offset + 2 * WHEEL_STRIDE)?,
        rr: r.f32_at(offset + 3 * WHEEL_STRIDE)?,
    })
}

fn write_wheel(w: &mut PacketWriter<'_>, offset: usize, wheel: &PerWheel) {
    for (i, value) in wheel.as_array().into_iter().enumerate() {
        w.put_f32(offset + i * WHEEL_STRIDE, value);
    }
}
