//! Car Telemetry (packet id 6)

use super::{DecodedBody, PacketBody, decode_records, ensure_min_size, mean_u8, mean_u16};
use crate::Result;
use crate::types::{ByteCursor, Gear, MAX_CARS, PacketHeader, PacketKind, Telemetry};

/// Size of one CarTelemetryData entry.
pub const ENTRY_SIZE: usize = 60;

/// Header, 22 entries, and the three trailing MFD/suggested-gear bytes.
pub const MIN_PACKET_SIZE: usize = PacketHeader::SIZE + MAX_CARS * ENTRY_SIZE + 3;

pub fn decode(raw: &[u8]) -> Result<DecodedBody> {
    ensure_min_size(PacketKind::CarTelemetry, raw, MIN_PACKET_SIZE)?;

    let (cars, truncated_fields) =
        decode_records(raw, PacketHeader::SIZE, ENTRY_SIZE, MAX_CARS, |_, r| read_entry(r));

    Ok(DecodedBody { body: PacketBody::CarTelemetry(cars), truncated_fields })
}

fn read_entry(r: &mut ByteCursor<'_>) -> Telemetry {
    let speed = r.u16_le().value(); // 0-1
    let throttle = r.f32_le().value(); // 2-5
    let steer = r.f32_le().value(); // 6-9
    let brake = r.f32_le().value(); // 10-13
    let clutch = r.u8().value(); // 14
    let gear = r.i8().value(); // 15
    let engine_rpm = r.u16_le().value(); // 16-17
    let drs = r.bool().value(); // 18
    r.skip(3); // revLightsPercent (19), revLightsBitValue (20-21)
    let brakes_temperature = r.u16_le_array::<4>().value(); // 22-29
    let tyres_surface_temperature = r.u8_array::<4>().value(); // 30-33
    r.skip(4); // tyresInnerTemperature (34-37)
    let engine_temp = r.u16_le().value(); // 38-39
    // tyresPressure, surfaceType (40-59) unused

    Telemetry {
        speed,
        throttle_pct: throttle * 100.0,
        brake_pct: brake * 100.0,
        steer,
        clutch,
        gear: Gear::from_wire(gear),
        engine_rpm,
        drs,
        engine_temp,
        mean_tyre_temp: mean_u8(tyres_surface_temperature),
        mean_brake_temp: mean_u16(brakes_temperature),
    }
}
