//! Participants (packet id 4)
//!
//! Unlike the other car arrays, this packet leads with a `numActiveCars`
//! byte and only that many records are meaningful.

use super::{DecodedBody, PacketBody, decode_records, ensure_min_size};
use crate::Result;
use crate::types::{ByteCursor, Identity, MAX_CARS, PacketHeader, PacketKind};

/// Size of one ParticipantData entry.
pub const ENTRY_SIZE: usize = 58;

/// Offset of the first entry, after the active-car count.
pub const RECORDS_OFFSET: usize = PacketHeader::SIZE + 1;

/// Header plus the active-car count.
pub const MIN_PACKET_SIZE: usize = RECORDS_OFFSET;

const NAME_LEN: usize = 48;

pub fn decode(header: &PacketHeader, raw: &[u8]) -> Result<DecodedBody> {
    ensure_min_size(PacketKind::Participants, raw, MIN_PACKET_SIZE)?;

    let mut count = ByteCursor::at(raw, PacketHeader::SIZE);
    let active = usize::from(count.u8().value()).min(MAX_CARS);
    let player = usize::from(header.player_car_index);

    let (cars, truncated_fields) =
        decode_records(raw, RECORDS_OFFSET, ENTRY_SIZE, active, |slot, r| {
            read_entry(r, slot == player)
        });

    Ok(DecodedBody { body: PacketBody::Participants(cars), truncated_fields })
}

fn read_entry(r: &mut ByteCursor<'_>, is_player: bool) -> Identity {
    let ai_controlled = r.u8().value(); // 0
    let driver_id = r.u8().value(); // 1
    r.skip(1); // networkId (2)
    let team_id = r.u8().value(); // 3
    r.skip(1); // myTeam (4)
    let race_number = r.u8().value(); // 5
    r.skip(1); // nationality (6)
    let name = r.fixed_str(NAME_LEN).value(); // 7-54
    r.seek(57);
    let platform = r.u8().value(); // 57

    Identity { name, race_number, team_id, driver_id, platform, is_player, is_ai: ai_controlled == 1 }
}
