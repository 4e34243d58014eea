//! Body decoders for the packet kinds this crate understands.
//!
//! Every decoder follows the same contract:
//!
//! 1. A buffer shorter than the kind's minimum size is rejected with
//!    [`TelemetryError::MalformedPacket`] before anything is decoded, so a
//!    rejected datagram never touches the state table.
//! 2. Per-car records are read at a fixed stride from a fixed base offset;
//!    iteration stops quietly at the first record that does not fit.
//! 3. Individual fields are read through [`ByteCursor`], which substitutes a
//!    default rather than failing. Substitutions are counted in
//!    [`DecodedBody::truncated_fields`].
//!
//! Decoding is pure: the result is a [`PacketBody`] that the caller applies
//! to its [`crate::state::StateTable`].

pub mod car_status;
pub mod car_telemetry;
pub mod lap_data;
pub mod participants;
pub mod session;

use crate::types::{
    ByteCursor, CarStatus, Identity, LapStatus, PacketHeader, PacketKind, SessionInfo, Telemetry,
};
use crate::{Result, TelemetryError};

/// Typed body of one datagram, one variant per decoded kind.
///
/// Car-array variants are indexed by car slot.
#[derive(Debug, Clone, PartialEq)]
pub enum PacketBody {
    Session(SessionInfo),
    Participants(Vec<Identity>),
    CarTelemetry(Vec<Telemetry>),
    LapData(Vec<LapStatus>),
    CarStatus(Vec<CarStatus>),
    /// Known kinds without a decoder, and unknown ids.
    Ignored(PacketKind),
}

impl PacketBody {
    pub fn kind(&self) -> PacketKind {
        match self {
            PacketBody::Session(_) => PacketKind::Session,
            PacketBody::Participants(_) => PacketKind::Participants,
            PacketBody::CarTelemetry(_) => PacketKind::CarTelemetry,
            PacketBody::LapData(_) => PacketKind::LapData,
            PacketBody::CarStatus(_) => PacketKind::CarStatus,
            PacketBody::Ignored(kind) => *kind,
        }
    }
}

/// A decoded body plus its field-level diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBody {
    pub body: PacketBody,
    pub truncated_fields: u32,
}

/// Decode the body of `raw`, whose header has already been decoded.
pub fn decode_body(header: &PacketHeader, raw: &[u8]) -> Result<DecodedBody> {
    match header.kind() {
        PacketKind::Session => session::decode(raw),
        PacketKind::Participants => participants::decode(header, raw),
        PacketKind::CarTelemetry => car_telemetry::decode(raw),
        PacketKind::LapData => lap_data::decode(raw),
        PacketKind::CarStatus => car_status::decode(raw),
        other => Ok(DecodedBody { body: PacketBody::Ignored(other), truncated_fields: 0 }),
    }
}

/// Minimum datagram size for a decoded kind, `None` for kinds without a decoder.
pub fn min_packet_size(kind: PacketKind) -> Option<usize> {
    match kind {
        PacketKind::Session => Some(session::MIN_PACKET_SIZE),
        PacketKind::Participants => Some(participants::MIN_PACKET_SIZE),
        PacketKind::CarTelemetry => Some(car_telemetry::MIN_PACKET_SIZE),
        PacketKind::LapData => Some(lap_data::MIN_PACKET_SIZE),
        PacketKind::CarStatus => Some(car_status::MIN_PACKET_SIZE),
        _ => None,
    }
}

fn ensure_min_size(kind: PacketKind, raw: &[u8], min: usize) -> Result<()> {
    if raw.len() < min {
        return Err(TelemetryError::MalformedPacket { kind, len: raw.len(), min });
    }
    Ok(())
}

/// Fixed-stride record slices starting at `base`, at most `count` of them,
/// ending early at the first record that would run past the buffer.
fn records(raw: &[u8], base: usize, stride: usize, count: usize) -> impl Iterator<Item = &[u8]> {
    (0..count).map_while(move |slot| {
        let start = base.checked_add(slot.checked_mul(stride)?)?;
        raw.get(start..start.checked_add(stride)?)
    })
}

/// Decode each record with `read`, tallying substituted fields.
fn decode_records<T>(
    raw: &[u8],
    base: usize,
    stride: usize,
    count: usize,
    mut read: impl FnMut(usize, &mut ByteCursor<'_>) -> T,
) -> (Vec<T>, u32) {
    let mut truncated = 0;
    let decoded = records(raw, base, stride, count)
        .enumerate()
        .map(|(slot, record)| {
            let mut cursor = ByteCursor::new(record);
            let value = read(slot, &mut cursor);
            truncated += cursor.truncated_reads();
            value
        })
        .collect();
    (decoded, truncated)
}

fn mean_u16(values: [u16; 4]) -> f32 {
    values.iter().map(|&v| f32::from(v)).sum::<f32>() / 4.0
}

fn mean_u8(values: [u8; 4]) -> f32 {
    values.iter().map(|&v| f32::from(v)).sum::<f32>() / 4.0
}
