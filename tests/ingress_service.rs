//! End-to-end ingress over loopback UDP

use anyhow::Result;
use futures::StreamExt;
use gridwatch::{
    Gridwatch, GridwatchConfig, IngressHandle, PacketKind, StateSnapshot, TelemetryEvent,
    UpdateRate,
};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;

const SESSION_UID: u64 = 0x0BAD_CAFE_0000_0042;
const TELEMETRY_LEN: usize = 29 + 22 * 60 + 3;
const TELEMETRY_ENTRY: usize = 60;

fn header(packet_id: u8, session_uid: u64) -> Vec<u8> {
    let mut raw = vec![0u8; 29];
    raw[0..2].copy_from_slice(&2025u16.to_le_bytes());
    raw[2] = 25;
    raw[5] = 1;
    raw[6] = packet_id;
    raw[7..15].copy_from_slice(&session_uid.to_le_bytes());
    raw
}

fn telemetry_packet(slot: usize, speed: u16, gear: i8) -> Vec<u8> {
    let mut raw = header(6, SESSION_UID);
    raw.resize(TELEMETRY_LEN, 0);
    let base = 29 + slot * TELEMETRY_ENTRY;
    raw[base..base + 2].copy_from_slice(&speed.to_le_bytes());
    raw[base + 15] = gear as u8;
    raw
}

fn loopback_config() -> GridwatchConfig {
    let mut config = GridwatchConfig::default();
    config.ingress.bind_addr = Ipv4Addr::LOCALHOST.into();
    config.ingress.port = 0;
    config.ingress.statistics_interval_ms = 100;
    config
}

async fn sender() -> Result<UdpSocket> {
    Ok(UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await?)
}

async fn wait_until(
    ingress: &IngressHandle,
    ready: impl Fn(&StateSnapshot) -> bool,
) -> Result<Arc<StateSnapshot>> {
    let snapshot = timeout(Duration::from_secs(5), async {
        loop {
            let snapshot = ingress.snapshot();
            if ready(&snapshot) {
                break snapshot;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await?;
    Ok(snapshot)
}

async fn wait_for_packets(ingress: &IngressHandle, packets: u64) -> Result<Arc<StateSnapshot>> {
    wait_until(ingress, |s| s.counters.packets >= packets).await
}

#[tokio::test]
async fn telemetry_datagram_reaches_the_snapshot() -> Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let ingress = Gridwatch::listen(loopback_config()).await?;
    let socket = sender().await?;
    socket.send_to(&telemetry_packet(3, 287, 7), ingress.local_addr()).await?;

    let snapshot = wait_for_packets(&ingress, 1).await?;
    assert_eq!(snapshot.session_uid, Some(SESSION_UID));

    let car = &snapshot.cars[3];
    let telemetry = car.telemetry.as_ref().expect("slot 3 has telemetry");
    assert_eq!(telemetry.speed, 287);
    assert!(snapshot.cars[0].telemetry.is_some());
    assert_eq!(snapshot.counters.malformed, 0);
    Ok(())
}

#[tokio::test]
async fn short_and_truncated_datagrams_are_counted_not_applied() -> Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let ingress = Gridwatch::listen(loopback_config()).await?;
    let mut events = ingress.subscribe_events();
    let socket = sender().await?;

    socket.send_to(&[0u8; 12], ingress.local_addr()).await?;
    let mut truncated = telemetry_packet(0, 300, 8);
    truncated.truncate(TELEMETRY_LEN - 1);
    socket.send_to(&truncated, ingress.local_addr()).await?;

    let mut invalid = 0;
    while invalid < 2 {
        let event = timeout(Duration::from_secs(5), events.recv()).await??;
        if let TelemetryEvent::InvalidPacket { kind, .. } = event {
            invalid += 1;
            if invalid == 2 {
                assert_eq!(kind, Some(PacketKind::CarTelemetry));
            }
        }
    }

    let snapshot =
        wait_until(&ingress, |s| s.counters.invalid_headers == 1 && s.counters.malformed == 1)
            .await?;
    assert_eq!(snapshot.active_cars().count(), 0);
    Ok(())
}

#[tokio::test]
async fn accepted_datagrams_are_forwarded_verbatim() -> Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let downstream = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await?;
    let mut config = loopback_config();
    config.ingress.forward_to = Some(downstream.local_addr()?);
    let ingress = Gridwatch::listen(config).await?;

    let socket = sender().await?;
    let packet = telemetry_packet(0, 120, 3);
    socket.send_to(&[1u8; 5], ingress.local_addr()).await?;
    socket.send_to(&packet, ingress.local_addr()).await?;

    let mut buf = vec![0u8; 2048];
    let (len, from) = timeout(Duration::from_secs(5), downstream.recv_from(&mut buf)).await??;
    assert_eq!(&buf[..len], packet.as_slice());
    assert_eq!(from, ingress.local_addr());
    Ok(())
}

#[tokio::test]
async fn session_change_resets_the_table() -> Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let ingress = Gridwatch::listen(loopback_config()).await?;
    let socket = sender().await?;
    socket.send_to(&telemetry_packet(5, 200, 4), ingress.local_addr()).await?;
    let before = wait_for_packets(&ingress, 1).await?;
    assert!(before.cars[5].is_active());

    // Unknown packet id from a new session: header accepted, nothing decoded.
    socket.send_to(&header(99, SESSION_UID + 1), ingress.local_addr()).await?;
    let after = wait_for_packets(&ingress, 2).await?;

    assert_eq!(after.session_uid, Some(SESSION_UID + 1));
    assert_eq!(after.active_cars().count(), 0);
    assert_eq!(after.counters.unknown_ids, 1);
    assert_eq!(after.counters.packets, 2);
    Ok(())
}

#[tokio::test]
async fn statistics_are_published_periodically() -> Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let ingress = Gridwatch::listen(loopback_config()).await?;
    let mut events = Box::pin(ingress.events());
    let socket = sender().await?;
    for _ in 0..3 {
        socket.send_to(&telemetry_packet(0, 100, 2), ingress.local_addr()).await?;
    }
    let snapshot = wait_for_packets(&ingress, 3).await?;
    assert_eq!(snapshot.counters.per_kind.get(&PacketKind::CarTelemetry).copied(), Some(3));

    let stats = timeout(Duration::from_secs(5), async {
        loop {
            match events.next().await {
                Some(TelemetryEvent::Statistics(stats)) if stats.total_packets == 3 => {
                    break Some(stats);
                }
                Some(_) => continue,
                None => break None,
            }
        }
    })
    .await?
    .expect("statistics event");

    assert_eq!(stats.total_bytes, 3 * TELEMETRY_LEN as u64);
    assert!(stats.average_packets_per_second > 0.0);
    Ok(())
}

#[tokio::test]
async fn snapshot_stream_follows_decoded_packets() -> Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let ingress = Gridwatch::listen(loopback_config()).await?;
    let mut snapshots = Box::pin(ingress.snapshots(UpdateRate::Native));
    let initial = snapshots.next().await.expect("initial snapshot");
    assert_eq!(initial.counters.packets, 0);

    let socket = sender().await?;
    socket.send_to(&telemetry_packet(1, 250, 6), ingress.local_addr()).await?;

    let updated = timeout(Duration::from_secs(5), snapshots.next()).await?.expect("update");
    assert_eq!(updated.cars[1].telemetry.as_ref().map(|t| t.speed), Some(250));
    Ok(())
}

#[tokio::test]
async fn stop_ends_the_ingress_task() -> Result<()> {
    let mut ingress = Gridwatch::listen(loopback_config()).await?;
    let addr: SocketAddr = ingress.local_addr();
    assert!(ingress.is_running());
    assert_ne!(addr.port(), 0);

    ingress.stop().await;
    assert!(!ingress.is_running());
    Ok(())
}
