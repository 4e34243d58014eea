//! Packet builders for tests and benchmarks
//!
//! Each builder produces a datagram laid out exactly as the game sends it,
//! with only the fields the decoders read populated. Unset slots are zeroed.

#![cfg(any(test, feature = "benchmark"))]

use crate::decode::{car_status, car_telemetry, lap_data, participants};
use crate::types::{PacketHeader, PacketKind};

/// `sessionUID` stamped into every builder's header.
pub const TEST_SESSION_UID: u64 = 0x5EED_F00D_0000_0001;

/// Length of a real Session datagram; the decoder only reads the first 37 bytes.
pub const SESSION_PACKET_LEN: usize = 753;

/// A 2025-format header for `kind`.
pub fn test_header(kind: PacketKind, player_car_index: u8) -> PacketHeader {
    PacketHeader {
        packet_format: 2025,
        game_year: 25,
        game_major_version: 1,
        game_minor_version: 7,
        packet_version: 1,
        packet_id: kind.id(),
        session_uid: TEST_SESSION_UID,
        session_time: 12.5,
        frame_identifier: 100,
        overall_frame_identifier: 100,
        player_car_index,
        secondary_player_car_index: 255,
    }
}

/// The 29 header bytes for a raw packet id, player in slot 0.
pub fn header_bytes(packet_id: u8) -> Vec<u8> {
    header_bytes_for(PacketKind::from_id(packet_id), 0)
}

pub fn header_bytes_for(kind: PacketKind, player_car_index: u8) -> Vec<u8> {
    test_header(kind, player_car_index).encode().to_vec()
}

/// Overwrite the `sessionUID` of an encoded datagram.
pub fn set_session_uid(raw: &mut [u8], session_uid: u64) {
    raw[7..15].copy_from_slice(&session_uid.to_le_bytes());
}

/// Overwrite the `packetFormat` of an encoded datagram.
pub fn set_packet_format(raw: &mut [u8], format: u16) {
    raw[0..2].copy_from_slice(&format.to_le_bytes());
}

fn put(raw: &mut [u8], at: usize, bytes: &[u8]) {
    raw[at..at + bytes.len()].copy_from_slice(bytes);
}

#[derive(Debug, Clone, Default)]
pub struct TelemetryEntry {
    pub speed: u16,
    pub throttle: f32,
    pub brake: f32,
    pub gear: i8,
    pub engine_rpm: u16,
    pub drs: bool,
    pub brakes_temperature: [u16; 4],
    pub tyres_surface_temperature: [u8; 4],
    pub engine_temp: u16,
}

/// A full-size Car Telemetry datagram.
pub fn car_telemetry_packet(entries: &[(usize, TelemetryEntry)]) -> Vec<u8> {
    let mut raw = header_bytes_for(PacketKind::CarTelemetry, 0);
    raw.resize(car_telemetry::MIN_PACKET_SIZE, 0);
    for (slot, e) in entries {
        let base = PacketHeader::SIZE + slot * car_telemetry::ENTRY_SIZE;
        put(&mut raw, base, &e.speed.to_le_bytes());
        put(&mut raw, base + 2, &e.throttle.to_le_bytes());
        put(&mut raw, base + 10, &e.brake.to_le_bytes());
        put(&mut raw, base + 15, &e.gear.to_le_bytes());
        put(&mut raw, base + 16, &e.engine_rpm.to_le_bytes());
        raw[base + 18] = u8::from(e.drs);
        for (i, temp) in e.brakes_temperature.iter().enumerate() {
            put(&mut raw, base + 22 + i * 2, &temp.to_le_bytes());
        }
        put(&mut raw, base + 30, &e.tyres_surface_temperature);
        put(&mut raw, base + 38, &e.engine_temp.to_le_bytes());
    }
    raw
}

#[derive(Debug, Clone, Default)]
pub struct LapEntry {
    pub last_lap_time_ms: u32,
    pub current_lap_time_ms: u32,
    pub position: u8,
    pub current_lap: u8,
    pub pit_status: u8,
    pub penalties: u8,
    pub warnings: u8,
    pub driver_status: u8,
}

/// A full-size Lap Data datagram.
pub fn lap_data_packet(entries: &[(usize, LapEntry)]) -> Vec<u8> {
    let mut raw = header_bytes_for(PacketKind::LapData, 0);
    raw.resize(lap_data::MIN_PACKET_SIZE, 0);
    for (slot, e) in entries {
        let base = PacketHeader::SIZE + slot * lap_data::ENTRY_SIZE;
        put(&mut raw, base, &e.last_lap_time_ms.to_le_bytes());
        put(&mut raw, base + 4, &e.current_lap_time_ms.to_le_bytes());
        raw[base + 32] = e.position;
        raw[base + 33] = e.current_lap;
        raw[base + 34] = e.pit_status;
        raw[base + 38] = e.penalties;
        raw[base + 39] = e.warnings;
        raw[base + 44] = e.driver_status;
    }
    raw
}

#[derive(Debug, Clone, Default)]
pub struct StatusEntry {
    pub fuel_in_tank: f32,
    pub fuel_capacity: f32,
    pub fuel_remaining_laps: f32,
    pub actual_tyre_compound: u8,
    pub tyre_age_laps: u8,
    pub fia_flags: i8,
    pub ers_store_energy: f32,
    pub ers_deploy_mode: u8,
}

/// A full-size Car Status datagram.
pub fn car_status_packet(entries: &[(usize, StatusEntry)]) -> Vec<u8> {
    let mut raw = header_bytes_for(PacketKind::CarStatus, 0);
    raw.resize(car_status::MIN_PACKET_SIZE, 0);
    for (slot, e) in entries {
        let base = PacketHeader::SIZE + slot * car_status::ENTRY_SIZE;
        put(&mut raw, base + 5, &e.fuel_in_tank.to_le_bytes());
        put(&mut raw, base + 9, &e.fuel_capacity.to_le_bytes());
        put(&mut raw, base + 13, &e.fuel_remaining_laps.to_le_bytes());
        raw[base + 25] = e.actual_tyre_compound;
        raw[base + 27] = e.tyre_age_laps;
        put(&mut raw, base + 28, &e.fia_flags.to_le_bytes());
        put(&mut raw, base + 37, &e.ers_store_energy.to_le_bytes());
        raw[base + 41] = e.ers_deploy_mode;
    }
    raw
}

#[derive(Debug, Clone, Default)]
pub struct SessionEntry {
    pub weather: u8,
    pub track_temp_c: i8,
    pub air_temp_c: i8,
    pub total_laps: u8,
    pub track_length_m: u16,
    pub session_type: u8,
    pub track_id: i8,
}

/// A Session datagram of realistic length.
pub fn session_packet(e: &SessionEntry) -> Vec<u8> {
    let mut raw = header_bytes_for(PacketKind::Session, 0);
    raw.resize(SESSION_PACKET_LEN, 0);
    let base = PacketHeader::SIZE;
    raw[base] = e.weather;
    put(&mut raw, base + 1, &e.track_temp_c.to_le_bytes());
    put(&mut raw, base + 2, &e.air_temp_c.to_le_bytes());
    raw[base + 3] = e.total_laps;
    put(&mut raw, base + 4, &e.track_length_m.to_le_bytes());
    raw[base + 6] = e.session_type;
    put(&mut raw, base + 7, &e.track_id.to_le_bytes());
    raw
}

#[derive(Debug, Clone, Default)]
pub struct ParticipantEntry {
    pub name: String,
    pub race_number: u8,
    pub team_id: u8,
    pub ai: bool,
}

/// A Participants datagram with `entries.len()` active cars.
pub fn participants_packet(player_car_index: u8, entries: &[ParticipantEntry]) -> Vec<u8> {
    let mut raw = header_bytes_for(PacketKind::Participants, player_car_index);
    raw.push(u8::try_from(entries.len()).unwrap_or(u8::MAX));
    raw.resize(participants::RECORDS_OFFSET + entries.len() * participants::ENTRY_SIZE, 0);
    for (slot, e) in entries.iter().enumerate() {
        let base = participants::RECORDS_OFFSET + slot * participants::ENTRY_SIZE;
        raw[base] = u8::from(e.ai);
        raw[base + 3] = e.team_id;
        raw[base + 5] = e.race_number;
        let name = e.name.as_bytes();
        let len = name.len().min(47);
        put(&mut raw, base + 7, &name[..len]);
    }
    raw
}
