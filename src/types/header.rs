//! The 29-byte envelope common to every packet

use serde::{Deserialize, Serialize};

use super::{ByteCursor, PacketKind};
use crate::{Result, TelemetryError};

/// Packet formats whose field layout this crate decodes.
pub const SUPPORTED_PACKET_FORMATS: [u16; 2] = [2024, 2025];

/// Packet header, little-endian on the wire.
///
/// ```text
/// offset  size  field
///  0      2     packetFormat
///  2      1     gameYear
///  3      1     gameMajorVersion
///  4      1     gameMinorVersion
///  5      1     packetVersion
///  6      1     packetId
///  7      8     sessionUID
/// 15      4     sessionTime
/// 19      4     frameIdentifier
/// 23      4     overallFrameIdentifier
/// 27      1     playerCarIndex
/// 28      1     secondaryPlayerCarIndex
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PacketHeader {
    pub packet_format: u16,
    pub game_year: u8,
    pub game_major_version: u8,
    pub game_minor_version: u8,
    pub packet_version: u8,
    pub packet_id: u8,
    pub session_uid: u64,
    pub session_time: f32,
    pub frame_identifier: u32,
    pub overall_frame_identifier: u32,
    pub player_car_index: u8,
    pub secondary_player_car_index: u8,
}

impl PacketHeader {
    /// Size of the header in bytes; also the base offset of every body.
    pub const SIZE: usize = 29;

    /// Decode the header from the front of a datagram.
    ///
    /// Only a short buffer is an error. An unsupported `packet_format`
    /// decodes normally; check [`PacketHeader::is_supported_format`].
    pub fn decode(raw: &[u8]) -> Result<Self> {
        if raw.len() < Self::SIZE {
            return Err(TelemetryError::InvalidHeader { len: raw.len(), min: Self::SIZE });
        }

        let mut r = ByteCursor::new(raw);
        let context = "packet header";
        Ok(Self {
            packet_format: r.u16_le().require(context)?,
            game_year: r.u8().require(context)?,
            game_major_version: r.u8().require(context)?,
            game_minor_version: r.u8().require(context)?,
            packet_version: r.u8().require(context)?,
            packet_id: r.u8().require(context)?,
            session_uid: r.u64_le().require(context)?,
            session_time: f32::from_bits(r.u32_le().require(context)?),
            frame_identifier: r.u32_le().require(context)?,
            overall_frame_identifier: r.u32_le().require(context)?,
            player_car_index: r.u8().require(context)?,
            secondary_player_car_index: r.u8().require(context)?,
        })
    }

    /// Encode back into the 29-byte wire form.
    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0..2].copy_from_slice(&self.packet_format.to_le_bytes());
        out[2] = self.game_year;
        out[3] = self.game_major_version;
        out[4] = self.game_minor_version;
        out[5] = self.packet_version;
        out[6] = self.packet_id;
        out[7..15].copy_from_slice(&self.session_uid.to_le_bytes());
        out[15..19].copy_from_slice(&self.session_time.to_bits().to_le_bytes());
        out[19..23].copy_from_slice(&self.frame_identifier.to_le_bytes());
        out[23..27].copy_from_slice(&self.overall_frame_identifier.to_le_bytes());
        out[27] = self.player_car_index;
        out[28] = self.secondary_player_car_index;
        out
    }

    pub fn kind(&self) -> PacketKind {
        PacketKind::from_id(self.packet_id)
    }

    pub fn is_supported_format(&self) -> bool {
        SUPPORTED_PACKET_FORMATS.contains(&self.packet_format)
    }
}
