//! Packet rate and health monitor
//!
//! A tumbling window: every [`RateMonitor::roll`] reports what arrived since
//! the previous roll and starts a fresh window. The ingress service rolls it
//! once per statistics interval (one second by default).

use serde::Serialize;
use std::collections::BTreeMap;
use tokio::time::Instant;

use crate::types::PacketKind;

/// One statistics window.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RateSnapshot {
    /// Packets in this window.
    pub packets_received: u64,
    /// Bytes in this window.
    pub bytes_received: u64,
    pub packets_per_second: f64,
    /// Mean rate since the monitor was created.
    pub average_packets_per_second: f64,
    /// Per-kind packets in this window.
    pub per_kind: BTreeMap<PacketKind, u64>,
    /// Arrival time of the most recent packet, Unix epoch milliseconds.
    pub last_packet_timestamp_ms: Option<u64>,
    pub total_packets: u64,
    pub total_bytes: u64,
}

#[derive(Debug)]
pub struct RateMonitor {
    started: Instant,
    window_started: Instant,
    window_packets: u64,
    window_bytes: u64,
    window_per_kind: BTreeMap<PacketKind, u64>,
    total_packets: u64,
    total_bytes: u64,
    last_packet_ms: Option<u64>,
}

impl RateMonitor {
    pub fn new(now: Instant) -> Self {
        Self {
            started: now,
            window_started: now,
            window_packets: 0,
            window_bytes: 0,
            window_per_kind: BTreeMap::new(),
            total_packets: 0,
            total_bytes: 0,
            last_packet_ms: None,
        }
    }

    /// Count one packet.
    pub fn observe(&mut self, kind: PacketKind, bytes: usize, arrived_ms: u64) {
        let bytes = bytes as u64;
        self.window_packets += 1;
        self.window_bytes += bytes;
        *self.window_per_kind.entry(kind).or_default() += 1;
        self.total_packets += 1;
        self.total_bytes += bytes;
        self.last_packet_ms = Some(arrived_ms);
    }

    /// Close the current window and open the next one at `now`.
    pub fn roll(&mut self, now: Instant) -> RateSnapshot {
        let window_secs = now.saturating_duration_since(self.window_started).as_secs_f64();
        let total_secs = now.saturating_duration_since(self.started).as_secs_f64();

        let snapshot = RateSnapshot {
            packets_received: self.window_packets,
            bytes_received: self.window_bytes,
            packets_per_second: rate(self.window_packets, window_secs),
            average_packets_per_second: rate(self.total_packets, total_secs),
            per_kind: std::mem::take(&mut self.window_per_kind),
            last_packet_timestamp_ms: self.last_packet_ms,
            total_packets: self.total_packets,
            total_bytes: self.total_bytes,
        };

        self.window_started = now;
        self.window_packets = 0;
        self.window_bytes = 0;
        snapshot
    }
}

fn rate(count: u64, secs: f64) -> f64 {
    if secs > 0.0 { count as f64 / secs } else { 0.0 }
}
