//! Fixed 22-slot table of per-car sub-records

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::decode::PacketBody;
use crate::types::{CarStatus, Identity, LapStatus, MAX_CARS, Telemetry};

/// Latest known state of one car slot.
///
/// A sub-record stays `None` until its packet kind has been seen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CarSlot {
    pub identity: Option<Identity>,
    pub telemetry: Option<Telemetry>,
    pub lap: Option<LapStatus>,
    pub status: Option<CarStatus>,
}

impl CarSlot {
    /// A slot is active once any sub-record has arrived.
    pub fn is_active(&self) -> bool {
        self.identity.is_some()
            || self.telemetry.is_some()
            || self.lap.is_some()
            || self.status.is_some()
    }
}

/// One sub-record bound for a slot.
#[derive(Debug, Clone, PartialEq)]
pub enum SubRecord {
    Identity(Identity),
    Telemetry(Telemetry),
    Lap(LapStatus),
    Status(CarStatus),
}

#[derive(Debug, Clone, Default)]
pub struct StateTable {
    slots: [CarSlot; MAX_CARS],
    writes: u64,
}

impl StateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite one sub-record of `slot`. Out-of-range slots are ignored
    /// and return `false`.
    pub fn upsert(&mut self, slot: usize, record: SubRecord) -> bool {
        let Some(car) = self.slots.get_mut(slot) else {
            debug!(slot, "Ignoring sub-record for out-of-range slot");
            return false;
        };
        match record {
            SubRecord::Identity(identity) => car.identity = Some(identity),
            SubRecord::Telemetry(telemetry) => car.telemetry = Some(telemetry),
            SubRecord::Lap(lap) => car.lap = Some(lap),
            SubRecord::Status(status) => car.status = Some(status),
        }
        self.writes += 1;
        true
    }

    /// Write every per-car record carried by `body`, indexed by position.
    /// Returns the number of slots written.
    pub fn apply(&mut self, body: &PacketBody) -> usize {
        match body {
            PacketBody::Participants(cars) => self.upsert_all(cars, SubRecord::Identity),
            PacketBody::CarTelemetry(cars) => self.upsert_all(cars, SubRecord::Telemetry),
            PacketBody::LapData(cars) => self.upsert_all(cars, SubRecord::Lap),
            PacketBody::CarStatus(cars) => self.upsert_all(cars, SubRecord::Status),
            PacketBody::Session(_) | PacketBody::Ignored(_) => 0,
        }
    }

    fn upsert_all<T: Clone>(&mut self, records: &[T], wrap: fn(T) -> SubRecord) -> usize {
        let mut written = 0;
        for (slot, record) in records.iter().enumerate() {
            if self.upsert(slot, wrap(record.clone())) {
                written += 1;
            }
        }
        written
    }

    pub fn slot(&self, slot: usize) -> Option<&CarSlot> {
        self.slots.get(slot)
    }

    pub fn slots(&self) -> &[CarSlot; MAX_CARS] {
        &self.slots
    }

    /// Active slots with their indices.
    pub fn active_slots(&self) -> impl Iterator<Item = (usize, &CarSlot)> {
        self.slots.iter().enumerate().filter(|(_, car)| car.is_active())
    }

    /// Total sub-record writes since construction or the last reset.
    pub fn write_count(&self) -> u64 {
        self.writes
    }

    /// Clear every slot.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DriverStatus, Gear, PitStatus};

    fn lap(position: u8) -> LapStatus {
        LapStatus {
            position,
            current_lap: 1,
            last_lap_time_ms: 0,
            current_lap_time_ms: 0,
            pit_status: PitStatus::None,
            penalties: 0,
            warnings: 0,
            driver_status: DriverStatus::OnTrack,
        }
    }

    #[test]
    fn slots_start_inactive() {
        let table = StateTable::new();
        assert_eq!(table.active_slots().count(), 0);
        assert_eq!(table.write_count(), 0);
    }

    #[test]
    fn upsert_replaces_one_sub_record() {
        let mut table = StateTable::new();
        assert!(table.upsert(4, SubRecord::Lap(lap(3))));
        assert!(table.upsert(4, SubRecord::Lap(lap(2))));

        let car = table.slot(4).expect("slot 4 exists");
        assert_eq!(car.lap.as_ref().map(|l| l.position), Some(2));
        assert!(car.telemetry.is_none());
        assert!(car.is_active());
        assert_eq!(table.active_slots().map(|(i, _)| i).collect::<Vec<_>>(), vec![4]);
        assert_eq!(table.write_count(), 2);
    }

    #[test]
    fn out_of_range_slot_is_ignored() {
        let mut table = StateTable::new();
        assert!(!table.upsert(MAX_CARS, SubRecord::Lap(lap(1))));
        assert_eq!(table.write_count(), 0);
    }

    #[test]
    fn apply_writes_each_record_by_index() {
        let mut table = StateTable::new();
        let cars = vec![
            Telemetry { speed: 100, gear: Gear::Forward(3), ..Telemetry::default() },
            Telemetry { speed: 200, ..Telemetry::default() },
        ];
        assert_eq!(table.apply(&PacketBody::CarTelemetry(cars)), 2);
        assert_eq!(table.slot(1).and_then(|c| c.telemetry.as_ref()).map(|t| t.speed), Some(200));
        assert!(table.slot(2).is_some_and(|c| !c.is_active()));
    }

    #[test]
    fn reset_clears_everything() {
        let mut table = StateTable::new();
        table.upsert(0, SubRecord::Identity(Identity::default()));
        table.reset();
        assert_eq!(table.active_slots().count(), 0);
        assert_eq!(table.write_count(), 0);
    }
}
