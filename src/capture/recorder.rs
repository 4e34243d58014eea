//! Recording state machine
//!
//! ```text
//!            start            pause
//!   Idle ───────────▶ Recording ─────▶ Paused
//!    ▲                  │  ▲   resume    │
//!    │                  │  └─────────────┘
//!    │ save / discard   │ finish         │ finish
//!    └────────────── Finished ◀──────────┘
//! ```
//!
//! `discard` is also legal from Recording and Paused. Anything else returns
//! [`TelemetryError::InvalidTransition`] and leaves the state as it was.
//!
//! The ingress task calls [`CaptureRecorder::record`] for every datagram; it
//! never blocks and never fails. Frames go through a bounded queue to a
//! writer task; a full queue drops the frame and counts it.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::format::{CAPTURE_EXTENSION, CaptureFrame};
use super::writer::{self, WriteSummary, WriterShared};
use crate::config::RecorderConfig;
use crate::events::{EventBus, TelemetryEvent};
use crate::types::PacketKind;
use crate::{Result, TelemetryError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordingState {
    #[default]
    Idle,
    Recording,
    Paused,
    Finished,
}

impl fmt::Display for RecordingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RecordingState::Idle => "idle",
            RecordingState::Recording => "recording",
            RecordingState::Paused => "paused",
            RecordingState::Finished => "finished",
        };
        f.write_str(label)
    }
}

/// Counters for the current (or last) recording.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecordingStats {
    /// Frames accepted for recording.
    pub packet_count: u64,
    pub byte_count: u64,
    /// Frames lost to a full queue or a failed write.
    pub dropped_frames: u64,
    /// Packets the game probably sent but we never saw, estimated from
    /// inter-arrival gaps. Diagnostic only.
    pub estimated_missed_packets: u64,
    pub max_inter_arrival_gap_ms: u64,
    pub per_kind: BTreeMap<PacketKind, u64>,
    /// Frames and bytes the writer has persisted.
    pub written_frames: u64,
    pub written_bytes: u64,
    pub started_at_ms: Option<u64>,
    /// Partial file while recording, final file once saved.
    pub path: Option<PathBuf>,
}

struct ActiveRecording {
    id: u64,
    path: PathBuf,
    tx: Option<mpsc::Sender<CaptureFrame>>,
    writer: Option<JoinHandle<Result<WriteSummary>>>,
    shared: Arc<WriterShared>,
    last_arrival_ms: Option<u64>,
}

#[derive(Default)]
struct Inner {
    state: RecordingState,
    active: Option<ActiveRecording>,
    stats: RecordingStats,
    next_id: u64,
}

impl Inner {
    fn refresh_writer_counters(&mut self) {
        if let Some(active) = &self.active {
            self.stats.dropped_frames = active.shared.dropped_frames.load(Ordering::Relaxed);
            self.stats.written_frames = active.shared.written_frames.load(Ordering::Relaxed);
            self.stats.written_bytes = active.shared.written_bytes.load(Ordering::Relaxed);
        }
    }
}

/// Shared handle to the single recording session.
///
/// Cheap to clone; all clones drive the same state machine.
#[derive(Clone)]
pub struct CaptureRecorder {
    inner: Arc<Mutex<Inner>>,
    config: Arc<RecorderConfig>,
    events: EventBus,
}

impl fmt::Debug for CaptureRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureRecorder")
            .field("state", &self.state())
            .field("capture_dir", &self.config.capture_dir)
            .finish()
    }
}

fn invalid(state: RecordingState, action: &'static str) -> TelemetryError {
    TelemetryError::InvalidTransition { state: state.to_string(), action }
}

fn transition(events: &EventBus, inner: &mut Inner, to: RecordingState) {
    let from = std::mem::replace(&mut inner.state, to);
    debug!(%from, %to, "Recording state changed");
    events.publish(TelemetryEvent::RecordingStateChanged { from, to });
}

/// Storage gave out under recording `id`: finish it and report.
fn writer_failed(inner: &Mutex<Inner>, events: &EventBus, id: u64, err: &TelemetryError) {
    let mut inner = inner.lock();
    if inner.active.as_ref().map(|a| a.id) != Some(id) {
        return;
    }
    error!(error = %err, "Capture storage failed, finishing recording");
    if let Some(active) = inner.active.as_mut() {
        active.tx = None;
        active.writer = None;
    }
    if matches!(inner.state, RecordingState::Recording | RecordingState::Paused) {
        transition(events, &mut inner, RecordingState::Finished);
    }
    events.publish(TelemetryEvent::Error { message: err.to_string() });
}

impl CaptureRecorder {
    pub fn new(config: RecorderConfig, events: EventBus) -> Self {
        Self { inner: Arc::new(Mutex::new(Inner::default())), config: Arc::new(config), events }
    }

    pub fn state(&self) -> RecordingState {
        self.inner.lock().state
    }

    pub fn is_recording(&self) -> bool {
        self.state() == RecordingState::Recording
    }

    pub fn stats(&self) -> RecordingStats {
        let mut inner = self.inner.lock();
        inner.refresh_writer_counters();
        inner.stats.clone()
    }

    pub fn capture_dir(&self) -> &Path {
        &self.config.capture_dir
    }

    fn transition(&self, inner: &mut Inner, to: RecordingState) {
        transition(&self.events, inner, to);
    }

    /// Idle → Recording. Creates the partial capture file and starts the
    /// writer. Returns the partial file's path.
    pub async fn start(&self) -> Result<PathBuf> {
        {
            let inner = self.inner.lock();
            if inner.state != RecordingState::Idle {
                return Err(invalid(inner.state, "start"));
            }
        }

        let dir = self.config.capture_dir.clone();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| TelemetryError::file_error(dir.clone(), e))?;

        let started_ms = crate::unix_time_ms();
        let path = dir.join(format!(".gridwatch-{started_ms}.partial"));
        let file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| TelemetryError::file_error(path.clone(), e))?;

        let mut inner = self.inner.lock();
        if inner.state != RecordingState::Idle {
            let state = inner.state;
            drop(inner);
            if let Err(e) = std::fs::remove_file(&path) {
                warn!(path = %path.display(), error = %e, "Could not remove orphaned partial file");
            }
            return Err(invalid(state, "start"));
        }

        let (tx, rx) = mpsc::channel(self.config.queue_capacity.max(1));
        let shared = Arc::new(WriterShared::default());
        inner.next_id += 1;
        let id = inner.next_id;

        let weak = Arc::downgrade(&self.inner);
        let events = self.events.clone();
        let writer_path = path.clone();
        let writer_shared = Arc::clone(&shared);
        let batch = self.config.flush_batch;
        let writer = tokio::spawn(async move {
            let result = writer::drain(file, writer_path, rx, batch, writer_shared).await;
            if let (Err(e), Some(inner)) = (&result, weak.upgrade()) {
                writer_failed(&inner, &events, id, e);
            }
            result
        });

        inner.active = Some(ActiveRecording {
            id,
            path: path.clone(),
            tx: Some(tx),
            writer: Some(writer),
            shared,
            last_arrival_ms: None,
        });
        inner.stats = RecordingStats {
            started_at_ms: Some(started_ms),
            path: Some(path.clone()),
            ..RecordingStats::default()
        };
        self.transition(&mut inner, RecordingState::Recording);
        info!(path = %path.display(), "Recording started");
        Ok(path)
    }

    /// Recording → Paused.
    pub fn pause(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.state != RecordingState::Recording {
            return Err(invalid(inner.state, "pause"));
        }
        self.transition(&mut inner, RecordingState::Paused);
        info!("Recording paused");
        Ok(())
    }

    /// Paused → Recording. The pause itself is not counted as a gap.
    pub fn resume(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.state != RecordingState::Paused {
            return Err(invalid(inner.state, "resume"));
        }
        if let Some(active) = inner.active.as_mut() {
            active.last_arrival_ms = None;
        }
        self.transition(&mut inner, RecordingState::Recording);
        info!("Recording resumed");
        Ok(())
    }

    /// Recording | Paused → Finished. Waits for the writer to drain the
    /// queue and returns the final counters.
    pub async fn finish(&self) -> Result<RecordingStats> {
        let writer = {
            let mut inner = self.inner.lock();
            if !matches!(inner.state, RecordingState::Recording | RecordingState::Paused) {
                return Err(invalid(inner.state, "finish"));
            }
            let writer = inner.active.as_mut().and_then(|active| {
                active.tx = None;
                active.writer.take()
            });
            self.transition(&mut inner, RecordingState::Finished);
            writer
        };

        self.join_writer(writer).await;

        let stats = self.stats();
        info!(
            packets = stats.packet_count,
            written = stats.written_frames,
            dropped = stats.dropped_frames,
            "Recording finished"
        );
        Ok(stats)
    }

    /// Finished → Idle. Moves the partial file to `<capture_dir>/<name>.f1cap`
    /// and returns the final path. On a failed rename the recording stays
    /// Finished so the save can be retried.
    pub async fn save(&self, name: &str) -> Result<PathBuf> {
        let name = name.trim();
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(TelemetryError::Parse {
                context: "capture name".to_string(),
                details: format!("{name:?} is not a plain file name"),
            });
        }

        let (id, partial) = {
            let inner = self.inner.lock();
            match (&inner.state, &inner.active) {
                (RecordingState::Finished, Some(active)) => (active.id, active.path.clone()),
                (state, _) => return Err(invalid(*state, "save")),
            }
        };

        let file_name = if Path::new(name).extension().is_some_and(|ext| ext == CAPTURE_EXTENSION)
        {
            name.to_string()
        } else {
            format!("{name}.{CAPTURE_EXTENSION}")
        };
        let target = self.config.capture_dir.join(file_name);
        tokio::fs::rename(&partial, &target)
            .await
            .map_err(|e| TelemetryError::file_error(target.clone(), e))?;

        let mut inner = self.inner.lock();
        if inner.state != RecordingState::Finished || inner.active.as_ref().map(|a| a.id) != Some(id)
        {
            return Err(invalid(inner.state, "save"));
        }
        inner.refresh_writer_counters();
        inner.active = None;
        inner.stats.path = Some(target.clone());
        self.transition(&mut inner, RecordingState::Idle);
        info!(path = %target.display(), "Recording saved");
        Ok(target)
    }

    /// Recording | Paused | Finished → Idle, deleting the partial file.
    pub async fn discard(&self) -> Result<()> {
        let active = {
            let mut inner = self.inner.lock();
            if inner.state == RecordingState::Idle {
                return Err(invalid(inner.state, "discard"));
            }
            inner.refresh_writer_counters();
            let active = inner.active.take();
            inner.stats.path = None;
            self.transition(&mut inner, RecordingState::Idle);
            active
        };

        if let Some(mut active) = active {
            active.tx = None;
            self.join_writer(active.writer.take()).await;
            match tokio::fs::remove_file(&active.path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(TelemetryError::file_error(active.path, e)),
            }
        }
        info!("Recording discarded");
        Ok(())
    }

    async fn join_writer(&self, writer: Option<JoinHandle<Result<WriteSummary>>>) {
        let Some(writer) = writer else { return };
        match writer.await {
            Ok(Ok(summary)) => debug!(frames = summary.frames, "Capture writer joined"),
            Ok(Err(e)) => debug!(error = %e, "Capture writer had already failed"),
            Err(e) => warn!(error = %e, "Capture writer task panicked"),
        }
    }

    /// Queue one datagram if recording. Never blocks.
    pub fn record(&self, kind: PacketKind, raw: &[u8], arrival_ms: u64) {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        if inner.state != RecordingState::Recording {
            return;
        }
        let Some(active) = inner.active.as_mut() else { return };
        let Some(tx) = active.tx.as_ref() else { return };

        let stats = &mut inner.stats;
        if let Some(last) = active.last_arrival_ms {
            let gap = arrival_ms.saturating_sub(last);
            stats.max_inter_arrival_gap_ms = stats.max_inter_arrival_gap_ms.max(gap);
            let nominal = self.config.nominal_interval_ms.max(1);
            if gap > nominal.saturating_mul(u64::from(self.config.gap_multiplier)) {
                stats.estimated_missed_packets += (gap / nominal).saturating_sub(1);
            }
        }
        active.last_arrival_ms = Some(arrival_ms);

        stats.packet_count += 1;
        stats.byte_count += raw.len() as u64;
        *stats.per_kind.entry(kind).or_default() += 1;

        if tx.try_send(CaptureFrame::new(arrival_ms, raw)).is_err() {
            active.shared.dropped(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureReader;
    use tempfile::TempDir;

    fn recorder(dir: &TempDir) -> (CaptureRecorder, EventBus) {
        let _ = tracing_subscriber::fmt::try_init();
        let config = RecorderConfig {
            capture_dir: dir.path().join("captures"),
            queue_capacity: 64,
            flush_batch: 8,
            nominal_interval_ms: 50,
            gap_multiplier: 3,
        };
        let events = EventBus::new(64);
        (CaptureRecorder::new(config, events.clone()), events)
    }

    fn assert_invalid<T: fmt::Debug>(result: Result<T>, action: &str) {
        match result {
            Err(TelemetryError::InvalidTransition { action: got, .. }) => assert_eq!(got, action),
            other => panic!("expected InvalidTransition for {action}, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn save_only_from_finished() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (rec, _) = recorder(&dir);

        assert_invalid(rec.save("lap").await, "save");
        assert_eq!(rec.state(), RecordingState::Idle);

        rec.start().await.expect("start");
        assert_invalid(rec.save("lap").await, "save");
        assert_eq!(rec.state(), RecordingState::Recording);

        rec.pause().expect("pause");
        assert_invalid(rec.save("lap").await, "save");
        assert_eq!(rec.state(), RecordingState::Paused);

        rec.finish().await.expect("finish");
        let saved = rec.save("lap").await.expect("save from finished");
        assert_eq!(saved.file_name().and_then(|n| n.to_str()), Some("lap.f1cap"));
        assert_eq!(rec.state(), RecordingState::Idle);
    }

    #[tokio::test]
    async fn start_only_from_idle() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (rec, _) = recorder(&dir);

        rec.start().await.expect("start");
        assert_invalid(rec.start().await, "start");
        assert_eq!(rec.state(), RecordingState::Recording);

        rec.pause().expect("pause");
        assert_invalid(rec.start().await, "start");
        assert_eq!(rec.state(), RecordingState::Paused);

        rec.finish().await.expect("finish");
        assert_invalid(rec.start().await, "start");
        assert_eq!(rec.state(), RecordingState::Finished);

        rec.discard().await.expect("discard");
        rec.start().await.expect("start again from idle");
    }

    #[tokio::test]
    async fn illegal_transitions_leave_state_unchanged() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (rec, _) = recorder(&dir);

        assert_invalid(rec.pause(), "pause");
        assert_invalid(rec.resume(), "resume");
        assert_invalid(rec.finish().await, "finish");
        assert_invalid(rec.discard().await, "discard");
        assert_eq!(rec.state(), RecordingState::Idle);

        rec.start().await.expect("start");
        assert_invalid(rec.resume(), "resume");
        assert_eq!(rec.state(), RecordingState::Recording);

        rec.finish().await.expect("finish");
        assert_invalid(rec.pause(), "pause");
        assert_invalid(rec.finish().await, "finish");
        assert_eq!(rec.state(), RecordingState::Finished);
    }

    #[tokio::test]
    async fn records_only_while_recording() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (rec, _) = recorder(&dir);

        rec.record(PacketKind::Session, &[0; 40], 1_000);
        rec.start().await.expect("start");
        rec.record(PacketKind::Session, &[1; 40], 1_000);
        rec.record(PacketKind::LapData, &[2; 60], 1_050);
        rec.pause().expect("pause");
        rec.record(PacketKind::LapData, &[3; 60], 1_100);
        rec.resume().expect("resume");
        rec.record(PacketKind::LapData, &[4; 60], 9_000);

        let stats = rec.finish().await.expect("finish");
        assert_eq!(stats.packet_count, 3);
        assert_eq!(stats.byte_count, 160);
        assert_eq!(stats.written_frames, 3);
        assert_eq!(stats.dropped_frames, 0);
        assert_eq!(stats.per_kind.get(&PacketKind::LapData), Some(&2));
        assert_eq!(stats.estimated_missed_packets, 0);

        let path = rec.save("session").await.expect("save");
        let mut reader = CaptureReader::open(&path).expect("open saved capture");
        let payloads: Vec<_> =
            std::iter::from_fn(|| reader.read_next_frame()).map(|f| f.payload[0]).collect();
        assert_eq!(payloads, vec![1, 2, 4]);
    }

    #[tokio::test]
    async fn gaps_feed_the_missed_packet_estimate() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (rec, _) = recorder(&dir);
        rec.start().await.expect("start");

        rec.record(PacketKind::CarTelemetry, &[0; 10], 1_000);
        rec.record(PacketKind::CarTelemetry, &[0; 10], 1_050);
        rec.record(PacketKind::CarTelemetry, &[0; 10], 1_200);
        rec.record(PacketKind::CarTelemetry, &[0; 10], 1_500);

        let stats = rec.stats();
        assert_eq!(stats.max_inter_arrival_gap_ms, 300);
        assert_eq!(stats.estimated_missed_packets, 5);
        assert_eq!(stats.dropped_frames, 0);
        rec.discard().await.expect("discard");
    }

    #[tokio::test]
    async fn discard_removes_partial_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (rec, _) = recorder(&dir);
        let partial = rec.start().await.expect("start");
        assert!(partial.exists());
        rec.record(PacketKind::Event, &[0; 45], 1);

        rec.discard().await.expect("discard from recording");
        assert!(!partial.exists());
        assert_eq!(rec.state(), RecordingState::Idle);
    }

    #[tokio::test]
    async fn state_changes_are_published() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (rec, events) = recorder(&dir);
        let mut rx = events.subscribe();

        rec.start().await.expect("start");
        rec.finish().await.expect("finish");

        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let TelemetryEvent::RecordingStateChanged { from, to } = event {
                seen.push((from, to));
            }
        }
        assert_eq!(
            seen,
            vec![
                (RecordingState::Idle, RecordingState::Recording),
                (RecordingState::Recording, RecordingState::Finished),
            ]
        );
    }

    #[tokio::test]
    async fn storage_failure_finishes_and_reports() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (rec, events) = recorder(&dir);
        let mut rx = events.subscribe();
        rec.start().await.expect("start");

        let id = rec.inner.lock().active.as_ref().map(|a| a.id).expect("active recording");
        let err = TelemetryError::Storage { reason: "No space left on device".into() };
        writer_failed(&rec.inner, &events, id, &err);
        assert_eq!(rec.state(), RecordingState::Finished);

        // A stale recording id is ignored.
        writer_failed(&rec.inner, &events, id + 1, &err);

        let mut transitions = Vec::new();
        let mut errors = Vec::new();
        while let Ok(event) = rx.try_recv() {
            match event {
                TelemetryEvent::RecordingStateChanged { from, to } => transitions.push((from, to)),
                TelemetryEvent::Error { message } => errors.push(message),
                _ => {}
            }
        }
        assert_eq!(transitions.last(), Some(&(RecordingState::Recording, RecordingState::Finished)));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("No space left on device"));

        // Whatever reached disk can still be kept.
        let saved = rec.save("partial-session").await.expect("save after storage failure");
        assert!(saved.exists());
        assert_eq!(rec.state(), RecordingState::Idle);
    }

    #[tokio::test]
    async fn full_queue_counts_dropped_frames() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = RecorderConfig {
            capture_dir: dir.path().to_path_buf(),
            queue_capacity: 1,
            flush_batch: 1,
            nominal_interval_ms: 50,
            gap_multiplier: 3,
        };
        let rec = CaptureRecorder::new(config, EventBus::new(8));
        rec.start().await.expect("start");

        // The current-thread runtime cannot run the writer until we yield.
        for i in 0..5 {
            rec.record(PacketKind::Motion, &[0; 20], 1_000 + i);
        }
        let stats = rec.finish().await.expect("finish");
        assert_eq!(stats.packet_count, 5);
        assert_eq!(stats.dropped_frames, 4);
        assert_eq!(stats.written_frames, 1);
    }

    #[tokio::test]
    async fn invalid_save_names_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (rec, _) = recorder(&dir);
        rec.start().await.expect("start");
        rec.finish().await.expect("finish");

        for name in ["", "  ", "../escape", ".hidden"] {
            assert!(matches!(rec.save(name).await, Err(TelemetryError::Parse { .. })));
        }
        assert_eq!(rec.state(), RecordingState::Finished);
        let path = rec.save("race.f1cap").await.expect("save");
        assert!(path.ends_with("race.f1cap"));
    }
}
