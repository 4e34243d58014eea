//! Car Status (packet id 7)

use super::{DecodedBody, PacketBody, decode_records, ensure_min_size};
use crate::Result;
use crate::types::{
    ByteCursor, CarStatus, ErsMode, FlagState, MAX_CARS, PacketHeader, PacketKind, TyreCompound,
};

/// Size of one CarStatusData entry.
pub const ENTRY_SIZE: usize = 55;

pub const MIN_PACKET_SIZE: usize = PacketHeader::SIZE + MAX_CARS * ENTRY_SIZE;

/// Battery capacity; `ersStoreEnergy` is reported in joules against this.
pub const ERS_MAX_STORE_ENERGY_J: f32 = 4_000_000.0;

pub fn decode(raw: &[u8]) -> Result<DecodedBody> {
    ensure_min_size(PacketKind::CarStatus, raw, MIN_PACKET_SIZE)?;

    let (cars, truncated_fields) =
        decode_records(raw, PacketHeader::SIZE, ENTRY_SIZE, MAX_CARS, |_, r| read_entry(r));

    Ok(DecodedBody { body: PacketBody::CarStatus(cars), truncated_fields })
}

fn read_entry(r: &mut ByteCursor<'_>) -> CarStatus {
    r.seek(5); // tractionControl, antiLockBrakes, fuelMix, frontBrakeBias, pitLimiterStatus
    let fuel_in_tank = r.f32_le().value(); // 5-8
    let fuel_capacity = r.f32_le().value(); // 9-12
    let fuel_remaining_laps = r.f32_le().value(); // 13-16
    r.seek(25);
    let actual_tyre_compound = r.u8().value(); // 25
    r.skip(1); // visualTyreCompound (26)
    let tyre_age_laps = r.u8().value(); // 27
    let fia_flags = r.i8().value(); // 28
    r.seek(37);
    let ers_store_energy = r.f32_le().value(); // 37-40
    let ers_deploy_mode = r.u8().value(); // 41

    CarStatus {
        fuel_in_tank,
        fuel_capacity,
        fuel_remaining_laps,
        tyre_compound: TyreCompound::from_code(actual_tyre_compound),
        tyre_age_laps,
        ers_energy_pct: ers_store_energy / ERS_MAX_STORE_ENERGY_J * 100.0,
        ers_mode: ErsMode::from_code(ers_deploy_mode),
        flag_state: FlagState::from_code(fia_flags),
    }
}
