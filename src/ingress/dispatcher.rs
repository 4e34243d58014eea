//! Per-datagram pipeline: header, body, state, recorder, events
//!
//! The dispatcher is synchronous and owns everything it touches except the
//! recorder handle, so the ingress task can drive it without locks and
//! tests can drive it without a socket.

use std::collections::HashSet;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::capture::CaptureRecorder;
use crate::decode::{self, PacketBody};
use crate::events::{EventBus, TelemetryEvent};
use crate::monitor::{RateMonitor, RateSnapshot};
use crate::state::{SessionContext, StateSnapshot};
use crate::TelemetryError;
use crate::types::{PacketHeader, PacketKind, SUPPORTED_PACKET_FORMATS};

/// What happened to one datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Shorter than a header; nothing else was done.
    InvalidHeader,
    /// Valid header but the body was too short; no state was written.
    Malformed(PacketKind),
    /// A kind this crate does not decode, or an unknown id.
    Ignored(PacketKind),
    /// Decoded and applied.
    Decoded { kind: PacketKind, slots_written: usize },
}

impl DispatchOutcome {
    /// Whether the datagram carried a valid header. Those are recorded and
    /// forwarded.
    pub fn is_accepted(&self) -> bool {
        !matches!(self, DispatchOutcome::InvalidHeader)
    }
}

pub struct Dispatcher {
    context: SessionContext,
    monitor: RateMonitor,
    events: EventBus,
    recorder: Option<CaptureRecorder>,
    warned_formats: HashSet<u16>,
}

impl Dispatcher {
    pub fn new(events: EventBus, recorder: Option<CaptureRecorder>, now: Instant) -> Self {
        Self {
            context: SessionContext::new(),
            monitor: RateMonitor::new(now),
            events,
            recorder,
            warned_formats: HashSet::new(),
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.context.snapshot()
    }

    /// Run one datagram through the pipeline. `arrival_ms` is its receive
    /// time in Unix epoch milliseconds.
    pub fn dispatch(&mut self, raw: &[u8], arrival_ms: u64) -> DispatchOutcome {
        let header = match PacketHeader::decode(raw) {
            Ok(header) => header,
            Err(e) => {
                debug!(len = raw.len(), error = %e, "Dropping datagram with invalid header");
                self.context.counters_mut().invalid_headers += 1;
                self.events.publish(TelemetryEvent::InvalidPacket {
                    len: raw.len(),
                    kind: None,
                    reason: e.to_string(),
                });
                return DispatchOutcome::InvalidHeader;
            }
        };

        let kind = header.kind();
        trace!(%kind, len = raw.len(), frame = header.frame_identifier, "Datagram received");

        if !header.is_supported_format() {
            self.flag_unsupported_format(header.packet_format);
        }
        self.context.observe_header(&header);

        let counters = self.context.counters_mut();
        counters.packets += 1;
        counters.bytes += raw.len() as u64;
        *counters.per_kind.entry(kind).or_default() += 1;
        if matches!(kind, PacketKind::Unknown(_)) {
            counters.unknown_ids += 1;
        }
        self.monitor.observe(kind, raw.len(), arrival_ms);

        if let Some(recorder) = &self.recorder {
            recorder.record(kind, raw, arrival_ms);
        }

        let decoded = match decode::decode_body(&header, raw) {
            Ok(decoded) => decoded,
            Err(e) => {
                debug!(%kind, len = raw.len(), error = %e, "Dropping malformed packet");
                self.context.counters_mut().malformed += 1;
                let reason = match &e {
                    TelemetryError::MalformedPacket { .. } => e.to_string(),
                    other => format!("{kind} body could not be decoded: {other}"),
                };
                self.events.publish(TelemetryEvent::InvalidPacket {
                    len: raw.len(),
                    kind: Some(kind),
                    reason,
                });
                return DispatchOutcome::Malformed(kind);
            }
        };

        self.context.counters_mut().truncated_fields += u64::from(decoded.truncated_fields);
        if decoded.truncated_fields > 0 {
            debug!(%kind, fields = decoded.truncated_fields, "Substituted defaults for truncated fields");
        }

        let slots_written = self.context.apply(&decoded.body);

        self.events.publish(TelemetryEvent::PacketDecoded { header, kind, bytes: raw.len() });
        match decoded.body {
            PacketBody::Ignored(kind) => DispatchOutcome::Ignored(kind),
            body => {
                self.events
                    .publish(TelemetryEvent::KindDecoded { header, body: Arc::new(body) });
                DispatchOutcome::Decoded { kind, slots_written }
            }
        }
    }

    fn flag_unsupported_format(&mut self, format: u16) {
        self.context.counters_mut().unsupported_format += 1;
        if self.warned_formats.insert(format) {
            let message = format!(
                "packet format {format} is not one of {SUPPORTED_PACKET_FORMATS:?}; decoding with the 2025 layout"
            );
            warn!(format, "Unsupported packet format");
            self.events.publish(TelemetryEvent::Warning { message });
        }
    }

    /// Close the statistics window and publish it.
    pub fn roll_statistics(&mut self, now: Instant) -> RateSnapshot {
        let snapshot = self.monitor.roll(now);
        trace!(pps = snapshot.packets_per_second, "Statistics window closed");
        self.events.publish(TelemetryEvent::Statistics(snapshot.clone()));
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::car_telemetry;
    use crate::test_utils::{
        ParticipantEntry, SessionEntry, car_telemetry_packet, header_bytes, participants_packet,
        session_packet, set_packet_format, set_session_uid,
    };
    use tokio::sync::broadcast;

    fn dispatcher() -> (Dispatcher, broadcast::Receiver<TelemetryEvent>) {
        let _ = tracing_subscriber::fmt::try_init();
        let events = EventBus::new(256);
        let rx = events.subscribe();
        (Dispatcher::new(events, None, Instant::now()), rx)
    }

    fn drain(rx: &mut broadcast::Receiver<TelemetryEvent>) -> Vec<TelemetryEvent> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    #[test]
    fn decodes_telemetry_into_slot_zero() {
        let (mut d, mut rx) = dispatcher();
        let mut raw = car_telemetry_packet(&[]);
        raw[29..31].copy_from_slice(&287u16.to_le_bytes());
        raw[44] = 7;

        let outcome = d.dispatch(&raw, 1_000);
        assert_eq!(
            outcome,
            DispatchOutcome::Decoded { kind: PacketKind::CarTelemetry, slots_written: 22 }
        );

        let car = d.context().table().slot(0).and_then(|c| c.telemetry.clone()).expect("slot 0");
        assert_eq!(car.speed, 287);
        assert_eq!(car.gear, 7u8);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], TelemetryEvent::PacketDecoded { kind: PacketKind::CarTelemetry, .. }));
        assert!(matches!(&events[1], TelemetryEvent::KindDecoded { body, .. } if body.kind() == PacketKind::CarTelemetry));
    }

    #[test]
    fn short_telemetry_never_touches_state() {
        let full = car_telemetry_packet(&[]);
        for len in PacketHeader::SIZE..car_telemetry::MIN_PACKET_SIZE {
            let (mut d, mut rx) = dispatcher();
            let outcome = d.dispatch(&full[..len], 1_000);

            assert_eq!(outcome, DispatchOutcome::Malformed(PacketKind::CarTelemetry));
            assert_eq!(d.context().table().write_count(), 0, "len {len}");
            assert_eq!(d.context().counters().malformed, 1, "len {len}");

            let events = drain(&mut rx);
            assert_eq!(events.len(), 1);
            assert!(matches!(
                events[0],
                TelemetryEvent::InvalidPacket { kind: Some(PacketKind::CarTelemetry), .. }
            ));
        }
    }

    #[test]
    fn short_datagram_is_an_invalid_header() {
        let (mut d, mut rx) = dispatcher();
        assert_eq!(d.dispatch(&[0u8; 12], 1), DispatchOutcome::InvalidHeader);
        assert!(!DispatchOutcome::InvalidHeader.is_accepted());
        assert_eq!(d.context().counters().invalid_headers, 1);
        assert_eq!(d.context().counters().packets, 0);
        assert!(matches!(drain(&mut rx)[..], [TelemetryEvent::InvalidPacket { kind: None, len: 12, .. }]));
    }

    #[test]
    fn unknown_ids_are_counted_and_ignored() {
        let (mut d, mut rx) = dispatcher();
        let outcome = d.dispatch(&header_bytes(42), 1);
        assert_eq!(outcome, DispatchOutcome::Ignored(PacketKind::Unknown(42)));
        assert_eq!(d.context().counters().unknown_ids, 1);
        assert_eq!(d.context().counters().per_kind.get(&PacketKind::Unknown(42)), Some(&1));

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], TelemetryEvent::PacketDecoded { .. }));
    }

    #[test]
    fn unsupported_format_warns_once_and_still_decodes() {
        let (mut d, mut rx) = dispatcher();
        let mut raw = session_packet(&SessionEntry { weather: 3, ..SessionEntry::default() });
        set_packet_format(&mut raw, 2023);

        for _ in 0..3 {
            assert!(matches!(d.dispatch(&raw, 1), DispatchOutcome::Decoded { .. }));
        }
        assert_eq!(d.context().counters().unsupported_format, 3);
        assert_eq!(d.context().session().map(|s| s.weather.label()), Some("Light Rain"));

        let warnings = drain(&mut rx)
            .into_iter()
            .filter(|e| matches!(e, TelemetryEvent::Warning { .. }))
            .count();
        assert_eq!(warnings, 1);
    }

    #[test]
    fn session_change_resets_cars() {
        let (mut d, _rx) = dispatcher();
        let entries = vec![ParticipantEntry { name: "HAMILTON".into(), ..Default::default() }];
        d.dispatch(&participants_packet(0, &entries), 1);
        assert_eq!(d.snapshot().active_cars().count(), 1);

        let mut session = session_packet(&SessionEntry::default());
        set_session_uid(&mut session, 99);
        d.dispatch(&session, 2);
        assert_eq!(d.snapshot().active_cars().count(), 0);
        assert_eq!(d.snapshot().session_uid, Some(99));
    }

    #[test]
    fn statistics_roll_publishes_event() {
        let (mut d, mut rx) = dispatcher();
        d.dispatch(&header_bytes(0), 500);
        let _ = drain(&mut rx);

        let snapshot = d.roll_statistics(Instant::now());
        assert_eq!(snapshot.packets_received, 1);
        assert_eq!(snapshot.last_packet_timestamp_ms, Some(500));
        assert!(matches!(drain(&mut rx)[..], [TelemetryEvent::Statistics(_)]));
    }
}
