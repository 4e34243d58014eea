//! Owned aggregation state for one ingress pipeline

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

use super::table::{CarSlot, StateTable};
use crate::decode::PacketBody;
use crate::types::{MAX_CARS, PacketHeader, PacketKind, SessionInfo};

/// Running totals kept by the dispatcher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DecodeCounters {
    /// Datagrams with a valid header.
    pub packets: u64,
    pub bytes: u64,
    /// Datagrams shorter than a header.
    pub invalid_headers: u64,
    /// Bodies rejected for being shorter than their kind's minimum.
    pub malformed: u64,
    pub unknown_ids: u64,
    pub unsupported_format: u64,
    /// Field reads that fell back to a default.
    pub truncated_fields: u64,
    pub per_kind: BTreeMap<PacketKind, u64>,
}

/// Immutable copy of the aggregated state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateSnapshot {
    pub session_uid: Option<u64>,
    pub player_car_index: Option<u8>,
    pub session: Option<SessionInfo>,
    pub cars: [CarSlot; MAX_CARS],
    pub counters: DecodeCounters,
}

impl StateSnapshot {
    /// Active slots with their indices.
    pub fn active_cars(&self) -> impl Iterator<Item = (usize, &CarSlot)> {
        self.cars.iter().enumerate().filter(|(_, car)| car.is_active())
    }
}

/// Everything one ingress pipeline aggregates: the car table, the session
/// record and the counters.
///
/// A change of `sessionUID` clears the table and the session record; the
/// counters span sessions.
#[derive(Debug, Default)]
pub struct SessionContext {
    table: StateTable,
    session: Option<SessionInfo>,
    session_uid: Option<u64>,
    player_car_index: Option<u8>,
    counters: DecodeCounters,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track the session a header belongs to. Returns `true` when the
    /// header started a new session and the state was reset.
    pub fn observe_header(&mut self, header: &PacketHeader) -> bool {
        let changed = self.session_uid.is_some_and(|uid| uid != header.session_uid);
        if changed {
            info!(
                old = ?self.session_uid,
                new = header.session_uid,
                "Session UID changed, resetting car state"
            );
            self.table.reset();
            self.session = None;
        }
        self.session_uid = Some(header.session_uid);
        self.player_car_index = Some(header.player_car_index);
        changed
    }

    /// Apply a decoded body. Returns the number of car slots written.
    pub fn apply(&mut self, body: &PacketBody) -> usize {
        if let PacketBody::Session(info) = body {
            self.session = Some(info.clone());
        }
        self.table.apply(body)
    }

    pub fn table(&self) -> &StateTable {
        &self.table
    }

    pub fn session(&self) -> Option<&SessionInfo> {
        self.session.as_ref()
    }

    pub fn session_uid(&self) -> Option<u64> {
        self.session_uid
    }

    pub fn counters(&self) -> &DecodeCounters {
        &self.counters
    }

    pub fn counters_mut(&mut self) -> &mut DecodeCounters {
        &mut self.counters
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            session_uid: self.session_uid,
            player_car_index: self.player_car_index,
            session: self.session.clone(),
            cars: self.table.slots().clone(),
            counters: self.counters.clone(),
        }
    }
}
