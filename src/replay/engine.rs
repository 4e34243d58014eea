//! Timing-faithful capture playback
//!
//! The first frame is the epoch and goes out immediately. Every later frame
//! is due `(timestamp - epoch) / speed` after that first send, measured on
//! one monotonic clock from the start of the run, so scheduling error never
//! accumulates. Frames whose due time has already passed go out at once.

use serde::Serialize;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::sink::DatagramSink;
use crate::capture::CaptureReader;
use crate::{Result, TelemetryError};

/// Slowest playback accepted.
pub const MIN_REPLAY_SPEED: f64 = 0.1;

/// Check a speed multiplier: finite and at least [`MIN_REPLAY_SPEED`].
pub fn validate_speed(speed: f64) -> Result<f64> {
    if speed.is_finite() && speed >= MIN_REPLAY_SPEED {
        Ok(speed)
    } else {
        Err(TelemetryError::invalid_config(format!(
            "replay speed {speed} must be a finite value of at least {MIN_REPLAY_SPEED}"
        )))
    }
}

/// Offset from the first send at which a frame stamped `timestamp_ms` is due.
/// Frames stamped before the epoch are due immediately.
pub fn target_delay(epoch_ms: u64, timestamp_ms: u64, speed: f64) -> Duration {
    let offset_ms = timestamp_ms.saturating_sub(epoch_ms);
    Duration::from_nanos((offset_ms as f64 * 1_000_000.0 / speed).round() as u64)
}

/// Outcome of one replay run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReplaySummary {
    pub total_frames: usize,
    pub frames_sent: u64,
    pub send_failures: u64,
    pub elapsed: Duration,
    pub cancelled: bool,
}

pub struct ReplayEngine<S: DatagramSink> {
    reader: CaptureReader,
    sink: S,
    speed: f64,
}

impl<S: DatagramSink> ReplayEngine<S> {
    pub fn new(reader: CaptureReader, sink: S, speed: f64) -> Result<Self> {
        let speed = validate_speed(speed)?;
        Ok(Self { reader, sink, speed })
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Play every frame in order. Send failures are counted and skipped;
    /// cancellation stops before the next frame.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<ReplaySummary> {
        let mut summary =
            ReplaySummary { total_frames: self.reader.total_frames(), ..ReplaySummary::default() };
        let Some(epoch_ms) = self.reader.first_timestamp_ms() else {
            info!("Capture is empty, nothing to replay");
            return Ok(summary);
        };

        info!(
            path = %self.reader.path().display(),
            frames = summary.total_frames,
            duration = ?self.reader.duration(),
            speed = self.speed,
            "Replay started"
        );

        let start = Instant::now();
        while let Some(frame) = self.reader.read_next_frame() {
            let due = start + target_delay(epoch_ms, frame.timestamp_ms, self.speed);

            if cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }
            if due > Instant::now() {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        summary.cancelled = true;
                        break;
                    }
                    _ = sleep_until(due) => {}
                }
            }

            match self.sink.send(&frame.payload).await {
                Ok(()) => {
                    summary.frames_sent += 1;
                    trace!(frame = self.reader.current_frame(), len = frame.payload.len(), "Replayed frame");
                }
                Err(e) => {
                    summary.send_failures += 1;
                    warn!(frame = self.reader.current_frame(), error = %e, "Replay send failed");
                }
            }
        }

        summary.elapsed = start.elapsed();
        if summary.cancelled {
            debug!(sent = summary.frames_sent, "Replay cancelled");
        }
        info!(
            sent = summary.frames_sent,
            failures = summary.send_failures,
            elapsed = ?summary.elapsed,
            "Replay finished"
        );
        Ok(summary)
    }

    /// Run on a background task.
    pub fn spawn(self) -> ReplayHandle {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(self.run(cancel.clone()));
        ReplayHandle { cancel, task: Some(task) }
    }
}

/// A replay running in the background. Dropping the handle cancels it.
pub struct ReplayHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<Result<ReplaySummary>>>,
}

impl ReplayHandle {
    /// Ask the replay to stop before its next frame.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(|task| task.is_finished())
    }

    /// Wait for the run to end.
    pub async fn wait(mut self) -> Result<ReplaySummary> {
        let Some(task) = self.task.take() else {
            return Ok(ReplaySummary { cancelled: true, ..ReplaySummary::default() });
        };
        task.await.map_err(|e| {
            TelemetryError::connection_failed_with_source("replay task failed", Box::new(e))
        })?
    }
}

impl Drop for ReplayHandle {
    fn drop(&mut self) {
        if self.task.is_some() {
            debug!("Dropping replay handle, cancelling replay");
            self.cancel.cancel();
        }
    }
}
