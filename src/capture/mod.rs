//! Session capture: the on-disk frame format, a reader for it, and the
//! recorder that writes it.
//!
//! ## Architecture
//!
//! - [`CaptureFrame`] / [`CaptureReader`]: `[u32 len][u64 ms][payload]` framing
//! - [`CaptureRecorder`]: the Idle/Recording/Paused/Finished state machine
//!   fed by the ingress task
//! - a drain task per recording, flushing queued frames in batches

mod format;
mod recorder;
mod writer;

pub use format::{CAPTURE_EXTENSION, CaptureFrame, CaptureReader, FRAME_HEADER_LEN, MAX_FRAME_PAYLOAD};
pub use recorder::{CaptureRecorder, RecordingState, RecordingStats};
pub use writer::WriteSummary;
