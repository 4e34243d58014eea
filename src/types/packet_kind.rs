//! Packet kind classification by header `packetId`

use serde::{Deserialize, Serialize};
use std::fmt;

/// Every packet kind the 2024/2025 protocol defines, plus a catch-all.
///
/// `from_id`/`id` are the only place the numeric ids appear; decoding and
/// display both go through this mapping. Serialized as the bare wire id, so
/// deserializing always lands on the canonical variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum PacketKind {
    Motion,
    Session,
    LapData,
    Event,
    Participants,
    CarSetups,
    CarTelemetry,
    CarStatus,
    FinalClassification,
    LobbyInfo,
    CarDamage,
    SessionHistory,
    TyreSets,
    MotionEx,
    TimeTrial,
    LapPositions,
    /// An id with no named variant (16 and up). Build it through
    /// [`PacketKind::from_id`]; `Unknown(6)` would compare unequal to
    /// `CarTelemetry` while sharing its id.
    Unknown(u8),
}

impl PacketKind {
    /// Classify a header `packetId`.
    pub fn from_id(id: u8) -> Self {
        match id {
            0 => PacketKind::Motion,
            1 => PacketKind::Session,
            2 => PacketKind::LapData,
            3 => PacketKind::Event,
            4 => PacketKind::Participants,
            5 => PacketKind::CarSetups,
            6 => PacketKind::CarTelemetry,
            7 => PacketKind::CarStatus,
            8 => PacketKind::FinalClassification,
            9 => PacketKind::LobbyInfo,
            10 => PacketKind::CarDamage,
            11 => PacketKind::SessionHistory,
            12 => PacketKind::TyreSets,
            13 => PacketKind::MotionEx,
            14 => PacketKind::TimeTrial,
            15 => PacketKind::LapPositions,
            other => PacketKind::Unknown(other),
        }
    }

    /// The wire id for this kind.
    pub fn id(self) -> u8 {
        match self {
            PacketKind::Motion => 0,
            PacketKind::Session => 1,
            PacketKind::LapData => 2,
            PacketKind::Event => 3,
            PacketKind::Participants => 4,
            PacketKind::CarSetups => 5,
            PacketKind::CarTelemetry => 6,
            PacketKind::CarStatus => 7,
            PacketKind::FinalClassification => 8,
            PacketKind::LobbyInfo => 9,
            PacketKind::CarDamage => 10,
            PacketKind::SessionHistory => 11,
            PacketKind::TyreSets => 12,
            PacketKind::MotionEx => 13,
            PacketKind::TimeTrial => 14,
            PacketKind::LapPositions => 15,
            PacketKind::Unknown(id) => id,
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            PacketKind::Motion => "Motion",
            PacketKind::Session => "Session",
            PacketKind::LapData => "Lap Data",
            PacketKind::Event => "Event",
            PacketKind::Participants => "Participants",
            PacketKind::CarSetups => "Car Setups",
            PacketKind::CarTelemetry => "Car Telemetry",
            PacketKind::CarStatus => "Car Status",
            PacketKind::FinalClassification => "Final Classification",
            PacketKind::LobbyInfo => "Lobby Info",
            PacketKind::CarDamage => "Car Damage",
            PacketKind::SessionHistory => "Session History",
            PacketKind::TyreSets => "Tyre Sets",
            PacketKind::MotionEx => "Motion Ex",
            PacketKind::TimeTrial => "Time Trial",
            PacketKind::LapPositions => "Lap Positions",
            PacketKind::Unknown(_) => "Unknown",
        }
    }

    /// Whether this crate decodes the body of this kind.
    pub fn is_decoded(self) -> bool {
        matches!(
            self,
            PacketKind::Session
                | PacketKind::LapData
                | PacketKind::Participants
                | PacketKind::CarTelemetry
                | PacketKind::CarStatus
        )
    }
}

impl From<u8> for PacketKind {
    fn from(id: u8) -> Self {
        PacketKind::from_id(id)
    }
}

impl From<PacketKind> for u8 {
    fn from(kind: PacketKind) -> Self {
        kind.id()
    }
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketKind::Unknown(id) => write!(f, "Unknown({id})"),
            known => f.write_str(known.label()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_mapping_is_bijective() {
        for id in 0..=u8::MAX {
            assert_eq!(PacketKind::from_id(id).id(), id);
        }
    }

    #[test]
    fn unknown_ids_keep_their_value() {
        assert_eq!(PacketKind::from_id(42), PacketKind::Unknown(42));
        assert_eq!(PacketKind::from_id(42).to_string(), "Unknown(42)");
        assert!(!PacketKind::Unknown(42).is_decoded());
    }

    #[test]
    fn unknown_is_only_produced_for_unnamed_ids() {
        for id in 0..=u8::MAX {
            let kind = PacketKind::from_id(id);
            assert_eq!(matches!(kind, PacketKind::Unknown(_)), id >= 16, "id {id}");
            assert_eq!(PacketKind::from_id(kind.id()), kind);
        }
    }

    #[test]
    fn serializes_as_wire_id_and_normalises_on_read() {
        assert_eq!(serde_yaml_ng::to_string(&PacketKind::CarTelemetry).expect("serialize").trim(), "6");
        assert_eq!(serde_yaml_ng::to_string(&PacketKind::Unknown(6)).expect("serialize").trim(), "6");

        let read: PacketKind = serde_yaml_ng::from_str("6").expect("deserialize");
        assert_eq!(read, PacketKind::CarTelemetry);
        let read: PacketKind = serde_yaml_ng::from_str("200").expect("deserialize");
        assert_eq!(read, PacketKind::Unknown(200));
    }

    #[test]
    fn decoded_kinds() {
        let decoded: Vec<_> = (0..16).map(PacketKind::from_id).filter(|k| k.is_decoded()).collect();
        assert_eq!(
            decoded,
            vec![
                PacketKind::Session,
                PacketKind::LapData,
                PacketKind::Participants,
                PacketKind::CarTelemetry,
                PacketKind::CarStatus,
            ]
        );
    }
}
