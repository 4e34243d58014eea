//! Capture replay
//!
//! [`ReplayEngine`] reads a [`crate::capture::CaptureReader`] and re-emits
//! each payload through a [`DatagramSink`], normally a [`UdpSink`] pointed at
//! an ingress port.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use gridwatch::capture::CaptureReader;
//! use gridwatch::replay::{ReplayEngine, UdpSink};
//!
//! #[tokio::main]
//! async fn main() -> gridwatch::Result<()> {
//!     let reader = CaptureReader::open("captures/monza.f1cap")?;
//!     let sink = UdpSink::connect("127.0.0.1:20777".parse().unwrap()).await?;
//!     let summary = ReplayEngine::new(reader, sink, 2.0)?.spawn().wait().await?;
//!     println!("sent {} frames in {:?}", summary.frames_sent, summary.elapsed);
//!     Ok(())
//! }
//! ```

mod engine;
mod sink;

pub use engine::{
    MIN_REPLAY_SPEED, ReplayEngine, ReplayHandle, ReplaySummary, target_delay, validate_speed,
};
pub use sink::{DatagramSink, UdpSink};
