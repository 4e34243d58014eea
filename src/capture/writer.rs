//! Drain task that moves queued frames to disk

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use super::format::CaptureFrame;
use crate::{Result, TelemetryError};

/// Counters shared between the recorder and its writer.
#[derive(Debug, Default)]
pub(crate) struct WriterShared {
    pub written_frames: AtomicU64,
    pub written_bytes: AtomicU64,
    pub dropped_frames: AtomicU64,
}

impl WriterShared {
    pub fn dropped(&self, frames: u64) {
        self.dropped_frames.fetch_add(frames, Ordering::Relaxed);
    }
}

/// What the writer managed to persist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub frames: u64,
    pub bytes: u64,
}

/// Storage conditions that will not clear up by retrying the next batch.
fn is_storage_exhausted(kind: ErrorKind) -> bool {
    matches!(kind, ErrorKind::StorageFull | ErrorKind::QuotaExceeded | ErrorKind::FileTooLarge)
}

/// Drain `rx` into `file` in batches of up to `batch` frames until every
/// sender is gone.
///
/// A failed batch is counted as dropped and the writer carries on, unless
/// the failure means the volume is exhausted; then the rest of the queue is
/// dropped too and a [`TelemetryError::Storage`] is returned.
pub(crate) async fn drain(
    mut file: File,
    path: PathBuf,
    mut rx: mpsc::Receiver<CaptureFrame>,
    batch: usize,
    shared: Arc<WriterShared>,
) -> Result<WriteSummary> {
    let batch = batch.max(1);
    let mut frames = Vec::with_capacity(batch);
    let mut buf = Vec::new();
    let mut summary = WriteSummary::default();

    loop {
        frames.clear();
        if rx.recv_many(&mut frames, batch).await == 0 {
            break;
        }

        buf.clear();
        for frame in &frames {
            frame.encode_into(&mut buf);
        }
        let count = frames.len() as u64;

        let written = async {
            file.write_all(&buf).await?;
            file.flush().await
        }
        .await;

        match written {
            Ok(()) => {
                trace!(frames = count, bytes = buf.len(), "Flushed capture batch");
                summary.frames += count;
                summary.bytes += buf.len() as u64;
                shared.written_frames.fetch_add(count, Ordering::Relaxed);
                shared.written_bytes.fetch_add(buf.len() as u64, Ordering::Relaxed);
            }
            Err(e) if is_storage_exhausted(e.kind()) => {
                rx.close();
                let mut abandoned = count;
                while rx.recv().await.is_some() {
                    abandoned += 1;
                }
                shared.dropped(abandoned);
                return Err(TelemetryError::Storage {
                    reason: format!("{}: {e}", path.display()),
                });
            }
            Err(e) => {
                warn!(path = %path.display(), frames = count, error = %e, "Capture batch write failed");
                shared.dropped(count);
            }
        }
    }

    if let Err(e) = file.sync_all().await {
        warn!(path = %path.display(), error = %e, "Capture file sync failed");
    }
    debug!(frames = summary.frames, bytes = summary.bytes, "Capture writer finished");
    Ok(summary)
}
