//! Where replayed datagrams go

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::net::UdpSocket;
use tracing::debug;

use crate::{Result, TelemetryError};

/// Destination for replayed datagrams.
///
/// The engine owns its sink and sends strictly in file order.
#[async_trait::async_trait]
pub trait DatagramSink: Send + 'static {
    async fn send(&mut self, payload: &[u8]) -> Result<()>;
}

/// Sends each datagram to a fixed UDP endpoint from an ephemeral port.
#[derive(Debug)]
pub struct UdpSink {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpSink {
    pub async fn connect(target: SocketAddr) -> Result<Self> {
        let local: SocketAddr = match target.ip() {
            IpAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            IpAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = UdpSocket::bind(local).await.map_err(|e| {
            TelemetryError::connection_failed_with_source("failed to bind replay socket", Box::new(e))
        })?;
        debug!(%target, "Replay sink ready");
        Ok(Self { socket, target })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

#[async_trait::async_trait]
impl DatagramSink for UdpSink {
    async fn send(&mut self, payload: &[u8]) -> Result<()> {
        let sent = self.socket.send_to(payload, self.target).await.map_err(|e| {
            TelemetryError::connection_failed_with_source(
                format!("send to {} failed", self.target),
                Box::new(e),
            )
        })?;
        if sent != payload.len() {
            return Err(TelemetryError::connection_failed(format!(
                "short send to {}: {sent} of {} bytes",
                self.target,
                payload.len()
            )));
        }
        Ok(())
    }
}
