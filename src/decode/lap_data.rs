//! Lap Data (packet id 2)

use super::{DecodedBody, PacketBody, decode_records, ensure_min_size};
use crate::Result;
use crate::types::{
    ByteCursor, DriverStatus, LapStatus, MAX_CARS, PacketHeader, PacketKind, PitStatus,
};

/// Size of one LapData entry.
pub const ENTRY_SIZE: usize = 50;

/// Header, 22 entries, and the two time-trial car index bytes.
pub const MIN_PACKET_SIZE: usize = PacketHeader::SIZE + MAX_CARS * ENTRY_SIZE + 2;

pub fn decode(raw: &[u8]) -> Result<DecodedBody> {
    ensure_min_size(PacketKind::LapData, raw, MIN_PACKET_SIZE)?;

    let (cars, truncated_fields) =
        decode_records(raw, PacketHeader::SIZE, ENTRY_SIZE, MAX_CARS, |_, r| read_entry(r));

    Ok(DecodedBody { body: PacketBody::LapData(cars), truncated_fields })
}

fn read_entry(r: &mut ByteCursor<'_>) -> LapStatus {
    let last_lap_time_ms = r.u32_le().value(); // 0-3
    let current_lap_time_ms = r.u32_le().value(); // 4-7
    r.seek(32);
    let position = r.u8().value(); // 32
    let current_lap = r.u8().value(); // 33
    let pit_status = r.u8().value(); // 34
    r.skip(3); // numPitStops, sector, currentLapInvalid (35-37)
    let penalties = r.u8().value(); // 38
    let warnings = r.u8().value(); // 39
    r.seek(44);
    let driver_status = r.u8().value(); // 44

    LapStatus {
        position,
        current_lap,
        last_lap_time_ms,
        current_lap_time_ms,
        pit_status: PitStatus::from_code(pit_status),
        penalties,
        warnings,
        driver_status: DriverStatus::from_code(driver_status),
    }
}
