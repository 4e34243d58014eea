//! Per-car sub-records and the session record
//!
//! Each sub-record is produced by exactly one packet kind and replaced
//! wholesale when the next packet of that kind arrives.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::lookups::{
    DriverStatus, ErsMode, FlagState, PitStatus, SessionType, TyreCompound, Weather, track_name,
};

/// Number of car slots every car-array packet carries.
pub const MAX_CARS: usize = 22;

/// Selected gear. Wire value −1 is reverse, 0 neutral.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gear {
    Reverse,
    #[default]
    Neutral,
    Forward(u8),
}

impl Gear {
    pub fn from_wire(raw: i8) -> Self {
        match raw {
            0 => Gear::Neutral,
            n if n < 0 => Gear::Reverse,
            n => Gear::Forward(n.unsigned_abs()),
        }
    }

    pub fn to_wire(self) -> i8 {
        match self {
            Gear::Reverse => -1,
            Gear::Neutral => 0,
            Gear::Forward(n) => i8::try_from(n).unwrap_or(i8::MAX),
        }
    }
}

impl fmt::Display for Gear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gear::Reverse => f.write_str("R"),
            Gear::Neutral => f.write_str("N"),
            Gear::Forward(n) => write!(f, "{n}"),
        }
    }
}

impl PartialEq<u8> for Gear {
    fn eq(&self, other: &u8) -> bool {
        matches!(self, Gear::Forward(n) if n == other)
    }
}

/// Who is driving a slot (Participants packet).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub race_number: u8,
    pub team_id: u8,
    pub driver_id: u8,
    pub platform: u8,
    pub is_player: bool,
    pub is_ai: bool,
}

/// Car Telemetry sub-record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    /// km/h
    pub speed: u16,
    /// 0–100
    pub throttle_pct: f32,
    /// 0–100
    pub brake_pct: f32,
    /// −1.0 (full left) to 1.0 (full right)
    pub steer: f32,
    pub clutch: u8,
    pub gear: Gear,
    pub engine_rpm: u16,
    pub drs: bool,
    /// °C
    pub engine_temp: u16,
    /// Mean of the four tyre surface temperatures, °C
    pub mean_tyre_temp: f32,
    /// Mean of the four brake temperatures, °C
    pub mean_brake_temp: f32,
}

/// Lap Data sub-record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LapStatus {
    pub position: u8,
    pub current_lap: u8,
    pub last_lap_time_ms: u32,
    pub current_lap_time_ms: u32,
    pub pit_status: PitStatus,
    /// Accumulated time penalties, seconds
    pub penalties: u8,
    pub warnings: u8,
    pub driver_status: DriverStatus,
}

/// Car Status sub-record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarStatus {
    /// kg
    pub fuel_in_tank: f32,
    /// kg
    pub fuel_capacity: f32,
    pub fuel_remaining_laps: f32,
    pub tyre_compound: TyreCompound,
    pub tyre_age_laps: u8,
    /// 0–100 of the 4 MJ store
    pub ers_energy_pct: f32,
    pub ers_mode: ErsMode,
    pub flag_state: FlagState,
}

/// Session-wide conditions, replaced by every Session packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub weather: Weather,
    pub track_temp_c: i8,
    pub air_temp_c: i8,
    pub total_laps: u8,
    pub track_length_m: u16,
    pub session_type: SessionType,
    pub track_id: i8,
}

impl SessionInfo {
    pub fn track_name(&self) -> &'static str {
        track_name(self.track_id)
    }
}
