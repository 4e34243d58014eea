//! Type-safe Rust library for F1 UDP telemetry.
//!
//! Gridwatch listens for the game's 2024/2025 UDP packet stream, decodes the
//! packets it understands into a per-car state table, records sessions to
//! disk, and replays recordings back onto the network with their original
//! timing.
//!
//! # Features
//!
//! - **Decoding**: header, Session, Participants, Car Telemetry, Lap Data and
//!   Car Status packets, never panicking on short or hostile input
//! - **State**: a 22-slot table of per-car sub-records, reset on session change
//! - **Capture**: a pausable recorder writing a simple framed format
//! - **Replay**: timing-faithful playback at any speed from 0.1×
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use gridwatch::{Gridwatch, GridwatchConfig, TelemetryEvent};
//!
//! #[tokio::main]
//! async fn main() -> gridwatch::Result<()> {
//!     let config = GridwatchConfig::default().with_env_overrides();
//!     let ingress = Gridwatch::listen(config).await?;
//!
//!     ingress.recorder().start().await?;
//!     let mut events = Box::pin(ingress.events());
//!     while let Some(event) = events.next().await {
//!         if let TelemetryEvent::Statistics(stats) = event {
//!             println!("{:.0} packets/s", stats.packets_per_second);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod capture;
pub mod config;
pub mod decode;
mod error;
pub mod events;
pub mod ingress;
pub mod monitor;
pub mod replay;
pub mod state;
pub mod stream;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

pub use capture::{CaptureReader, CaptureRecorder, RecordingState, RecordingStats};
pub use config::{GridwatchConfig, IngressConfig, RecorderConfig};
pub use decode::PacketBody;
pub use error::*;
pub use events::{EventBus, TelemetryEvent};
pub use ingress::{IngressHandle, IngressService};
pub use monitor::RateSnapshot;
pub use replay::{ReplayHandle, ReplaySummary};
pub use state::StateSnapshot;
pub use types::*;

use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Unified entry point for live ingest and replay.
///
/// # Examples
///
/// ## Replay a saved session into a local listener at double speed
/// ```rust,no_run
/// use gridwatch::Gridwatch;
///
/// #[tokio::main]
/// async fn main() -> gridwatch::Result<()> {
///     let replay = Gridwatch::replay("captures/spa.f1cap", 20777, 2.0).await?;
///     let summary = replay.wait().await?;
///     println!("{} frames", summary.frames_sent);
///     Ok(())
/// }
/// ```
pub struct Gridwatch;

impl Gridwatch {
    /// Bind the telemetry port and start decoding.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the socket
    /// cannot be bound.
    pub async fn listen(config: GridwatchConfig) -> Result<IngressHandle> {
        IngressService::bind(config).await
    }

    /// Replay a capture file to `127.0.0.1:<target_port>`.
    ///
    /// The file is read and validated before anything is sent; a corrupt
    /// file fails here. The returned handle cancels the replay when dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if `speed` is below [`replay::MIN_REPLAY_SPEED`] or
    /// not finite, the file cannot be read or is corrupt, or the sending
    /// socket cannot be bound.
    pub async fn replay<P: AsRef<Path>>(
        path: P,
        target_port: u16,
        speed: f64,
    ) -> Result<ReplayHandle> {
        replay::validate_speed(speed)?;
        let reader = CaptureReader::load(path).await?;
        let target = SocketAddr::from((Ipv4Addr::LOCALHOST, target_port));
        let sink = replay::UdpSink::connect(target).await?;
        Ok(replay::ReplayEngine::new(reader, sink, speed)?.spawn())
    }
}

/// Wall-clock time in Unix epoch milliseconds, the unit capture frames use.
pub(crate) fn unix_time_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
