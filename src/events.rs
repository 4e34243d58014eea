//! Typed notifications published by the ingress pipeline
//!
//! Every datagram with a valid header produces a [`TelemetryEvent::PacketDecoded`]
//! followed, for the decoded kinds, by a [`TelemetryEvent::KindDecoded`]
//! carrying the typed body. Subscribers that fall behind lose the oldest
//! events rather than slowing ingress down.

use futures::{Stream, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::debug;

use crate::capture::RecordingState;
use crate::decode::PacketBody;
use crate::monitor::RateSnapshot;
use crate::types::{PacketHeader, PacketKind};

#[derive(Debug, Clone)]
pub enum TelemetryEvent {
    /// A datagram with a valid header was accepted.
    PacketDecoded { header: PacketHeader, kind: PacketKind, bytes: usize },

    /// A body of one of the decoded kinds; always follows its `PacketDecoded`.
    KindDecoded { header: PacketHeader, body: Arc<PacketBody> },

    /// A datagram was dropped before reaching the state table.
    InvalidPacket { len: usize, kind: Option<PacketKind>, reason: String },

    Statistics(RateSnapshot),

    RecordingStateChanged { from: RecordingState, to: RecordingState },

    Warning { message: String },

    Error { message: String },
}

impl TelemetryEvent {
    /// Kind of the packet this event is about, if any.
    pub fn packet_kind(&self) -> Option<PacketKind> {
        match self {
            TelemetryEvent::PacketDecoded { kind, .. } => Some(*kind),
            TelemetryEvent::KindDecoded { body, .. } => Some(body.kind()),
            TelemetryEvent::InvalidPacket { kind, .. } => *kind,
            _ => None,
        }
    }
}

/// Broadcast fan-out of [`TelemetryEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<TelemetryEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish to current subscribers. Publishing with none is not an error.
    pub fn publish(&self, event: TelemetryEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TelemetryEvent> {
        self.tx.subscribe()
    }

    /// Subscribe as a stream; lag is logged and skipped.
    pub fn stream(&self) -> impl Stream<Item = TelemetryEvent> + Send + 'static {
        BroadcastStream::new(self.tx.subscribe()).filter_map(|item| async move {
            match item {
                Ok(event) => Some(event),
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    debug!(skipped, "Event subscriber lagged");
                    None
                }
            }
        })
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_header;

    #[tokio::test]
    async fn subscribers_see_events_in_order() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let header = test_header(PacketKind::Session, 0);

        bus.publish(TelemetryEvent::PacketDecoded { header, kind: PacketKind::Session, bytes: 37 });
        bus.publish(TelemetryEvent::Warning { message: "w".into() });

        let first = rx.recv().await.expect("first event");
        assert_eq!(first.packet_kind(), Some(PacketKind::Session));
        assert!(matches!(rx.recv().await, Ok(TelemetryEvent::Warning { .. })));
    }

    #[tokio::test]
    async fn lagging_stream_skips_ahead() {
        let bus = EventBus::new(2);
        let mut stream = Box::pin(bus.stream());
        for i in 0..5 {
            bus.publish(TelemetryEvent::Warning { message: i.to_string() });
        }
        match stream.next().await {
            Some(TelemetryEvent::Warning { message }) => assert_eq!(message, "3"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn publish_without_subscribers_is_fine() {
        let bus = EventBus::new(4);
        bus.publish(TelemetryEvent::Error { message: "nobody listening".into() });
        assert_eq!(bus.subscriber_count(), 0);
    }
}
