//! Core wire and record types.
//!
//! ## Architecture
//!
//! - [`PacketHeader`] is the 29-byte envelope at the front of every datagram
//! - [`PacketKind`] classifies a header's `packetId` (closed set plus `Unknown`)
//! - [`ByteCursor`] reads little-endian fields without ever panicking
//! - [`Identity`], [`Telemetry`], [`LapStatus`] and [`CarStatus`] are the four
//!   per-car sub-records; [`SessionInfo`] is the session-wide record
//! - [`lookups`] turns enumerated codes into display labels
//!
//! ## Usage Example
//!
//! ```rust
//! use gridwatch::types::{PacketHeader, PacketKind};
//!
//! let mut raw = [0u8; 29];
//! raw[0..2].copy_from_slice(&2025u16.to_le_bytes());
//! raw[6] = 6;
//!
//! let header = PacketHeader::decode(&raw).unwrap();
//! assert_eq!(header.kind(), PacketKind::CarTelemetry);
//! assert!(header.is_supported_format());
//! assert_eq!(header.encode(), raw);
//! ```

mod car;
mod cursor;
mod header;
pub mod lookups;
mod packet_kind;
mod update_rate;

pub use car::{CarStatus, Gear, Identity, LapStatus, MAX_CARS, SessionInfo, Telemetry};
pub use cursor::{ByteCursor, Field};
pub use header::{PacketHeader, SUPPORTED_PACKET_FORMATS};
pub use lookups::{
    DriverStatus, ErsMode, FlagState, PitStatus, SessionType, TyreCompound, Weather, track_name,
};
pub use packet_kind::PacketKind;
pub use update_rate::UpdateRate;
