//! Session (packet id 1)

use super::{DecodedBody, PacketBody, ensure_min_size};
use crate::Result;
use crate::types::{ByteCursor, PacketHeader, PacketKind, SessionInfo, SessionType, Weather};

/// Header plus the eight leading session bytes this decoder reads.
pub const MIN_PACKET_SIZE: usize = PacketHeader::SIZE + 8;

pub fn decode(raw: &[u8]) -> Result<DecodedBody> {
    ensure_min_size(PacketKind::Session, raw, MIN_PACKET_SIZE)?;

    let mut r = ByteCursor::at(raw, PacketHeader::SIZE);
    let weather = r.u8().value(); // 0
    let track_temp_c = r.i8().value(); // 1
    let air_temp_c = r.i8().value(); // 2
    let total_laps = r.u8().value(); // 3
    let track_length_m = r.u16_le().value(); // 4-5
    let session_type = r.u8().value(); // 6
    let track_id = r.i8().value(); // 7

    let info = SessionInfo {
        weather: Weather::from_code(weather),
        track_temp_c,
        air_temp_c,
        total_laps,
        track_length_m,
        session_type: SessionType::from_code(session_type),
        track_id,
    };

    Ok(DecodedBody { body: PacketBody::Session(info), truncated_fields: r.truncated_reads() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TelemetryError;
    use crate::test_utils::{SessionEntry, session_packet};

    #[test]
    fn weather_three_is_light_rain() {
        let mut raw = session_packet(&SessionEntry::default());
        raw[29] = 3;
        let PacketBody::Session(info) = decode(&raw).expect("decode").body else {
            panic!("expected session body");
        };
        assert_eq!(info.weather, "Light Rain");
    }

    #[test]
    fn decodes_session_fields() {
        let entry = SessionEntry {
            weather: 1,
            track_temp_c: 34,
            air_temp_c: -2,
            total_laps: 57,
            track_length_m: 5_891,
            session_type: 15,
            track_id: 7,
        };
        let PacketBody::Session(info) = decode(&session_packet(&entry)).expect("decode").body
        else {
            panic!("expected session body");
        };
        assert_eq!(info.weather, Weather::LightCloud);
        assert_eq!(info.track_temp_c, 34);
        assert_eq!(info.air_temp_c, -2);
        assert_eq!(info.total_laps, 57);
        assert_eq!(info.track_length_m, 5_891);
        assert_eq!(info.session_type, "Race");
        assert_eq!(info.track_name(), "Silverstone");
    }

    #[test]
    fn unknown_weather_code_is_sentinel() {
        let entry = SessionEntry { weather: 12, ..SessionEntry::default() };
        let PacketBody::Session(info) = decode(&session_packet(&entry)).expect("decode").body
        else {
            panic!("expected session body");
        };
        assert_eq!(info.weather, Weather::Unknown(12));
    }

    #[test]
    fn header_only_packet_is_malformed() {
        let raw = session_packet(&SessionEntry::default());
        assert!(matches!(
            decode(&raw[..PacketHeader::SIZE]),
            Err(TelemetryError::MalformedPacket { kind: PacketKind::Session, min: 37, .. })
        ));
    }
}
