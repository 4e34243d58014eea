//! Capture file framing
//!
//! A capture file is a flat run of frames in arrival order, with no file
//! header, trailer or index:
//!
//! ```text
//! offset  size  field
//!  0      4     payload length (u32 LE)
//!  4      8     arrival time, Unix epoch ms (u64 LE)
//! 12      n     raw datagram
//! ```
//!
//! ## Usage Example
//!
//! ```rust
//! use gridwatch::capture::{CaptureFrame, CaptureReader};
//!
//! let mut file = Vec::new();
//! CaptureFrame::new(1_000, vec![1, 2, 3]).encode_into(&mut file);
//! CaptureFrame::new(1_050, vec![4, 5]).encode_into(&mut file);
//!
//! let mut reader = CaptureReader::from_bytes(file).unwrap();
//! assert_eq!(reader.total_frames(), 2);
//! while let Some(frame) = reader.read_next_frame() {
//!     println!("{} bytes at {} ms", frame.payload.len(), frame.timestamp_ms);
//! }
//! ```

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::{Result, TelemetryError};

/// Bytes before each payload.
pub const FRAME_HEADER_LEN: usize = 12;

/// Extension given to saved captures.
pub const CAPTURE_EXTENSION: &str = "f1cap";

/// Largest payload a frame may declare; anything bigger cannot be a UDP datagram.
pub const MAX_FRAME_PAYLOAD: usize = u16::MAX as usize;

/// One recorded datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureFrame {
    pub timestamp_ms: u64,
    pub payload: Vec<u8>,
}

impl CaptureFrame {
    pub fn new(timestamp_ms: u64, payload: impl Into<Vec<u8>>) -> Self {
        Self { timestamp_ms, payload: payload.into() }
    }

    pub fn encoded_len(&self) -> usize {
        FRAME_HEADER_LEN + self.payload.len()
    }

    /// Append the framed form to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        let len = u32::try_from(self.payload.len()).unwrap_or(u32::MAX);
        out.reserve(self.encoded_len());
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&self.timestamp_ms.to_le_bytes());
        out.extend_from_slice(&self.payload);
    }
}

#[derive(Debug, Clone, Copy)]
struct FrameIndex {
    payload_start: usize,
    len: usize,
    timestamp_ms: u64,
}

/// Reads a capture file back frame by frame.
///
/// The whole file is loaded and indexed on open, so a truncated or corrupt
/// file is rejected before the first frame is handed out. Memory use is the
/// file size plus 24 bytes of index per frame: an hour of full-rate traffic
/// (roughly 60 packets of about 1 KiB per second) comes to around 250 MiB.
///
/// Use [`CaptureReader::load`] from async code; [`CaptureReader::open`]
/// blocks the calling thread on file I/O.
#[derive(Debug)]
pub struct CaptureReader {
    data: Vec<u8>,
    path: PathBuf,
    index: Vec<FrameIndex>,
    current_frame: usize,
}

impl CaptureReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path).map_err(|e| TelemetryError::file_error(path.clone(), e))?;

        let mut data = Vec::new();
        file.read_to_end(&mut data).map_err(|e| TelemetryError::file_error(path.clone(), e))?;

        Self::from_bytes_with_path(data, path)
    }

    /// Read and index a capture without blocking the runtime.
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let data = tokio::fs::read(&path)
            .await
            .map_err(|e| TelemetryError::file_error(path.clone(), e))?;
        Self::from_bytes_with_path(data, path)
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::from_bytes_with_path(data, PathBuf::from("<memory>"))
    }

    fn from_bytes_with_path(data: Vec<u8>, path: PathBuf) -> Result<Self> {
        let index = build_index(&data)?;
        debug!(path = %path.display(), frames = index.len(), "Indexed capture file");
        Ok(Self { data, path, index, current_frame: 0 })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn total_frames(&self) -> usize {
        self.index.len()
    }

    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Timestamp of the first frame, the replay epoch.
    pub fn first_timestamp_ms(&self) -> Option<u64> {
        self.index.first().map(|f| f.timestamp_ms)
    }

    /// Span between the first and last frame timestamps.
    pub fn duration(&self) -> Duration {
        match (self.index.first(), self.index.last()) {
            (Some(first), Some(last)) => {
                Duration::from_millis(last.timestamp_ms.saturating_sub(first.timestamp_ms))
            }
            _ => Duration::ZERO,
        }
    }

    /// Next frame in file order, `None` at the end.
    pub fn read_next_frame(&mut self) -> Option<CaptureFrame> {
        let entry = *self.index.get(self.current_frame)?;
        self.current_frame += 1;
        let payload = self.data.get(entry.payload_start..entry.payload_start + entry.len)?;
        Some(CaptureFrame::new(entry.timestamp_ms, payload))
    }

    pub fn rewind(&mut self) {
        self.current_frame = 0;
    }
}

fn build_index(data: &[u8]) -> Result<Vec<FrameIndex>> {
    let mut index = Vec::new();
    let mut offset = 0usize;

    while offset < data.len() {
        let remaining = data.len() - offset;
        if remaining < FRAME_HEADER_LEN {
            return Err(TelemetryError::capture_corrupt(
                offset,
                format!("{remaining} trailing bytes cannot hold a frame header"),
            ));
        }

        let mut len_bytes = [0u8; 4];
        len_bytes.copy_from_slice(&data[offset..offset + 4]);
        let mut ts_bytes = [0u8; 8];
        ts_bytes.copy_from_slice(&data[offset + 4..offset + FRAME_HEADER_LEN]);

        let len = u32::from_le_bytes(len_bytes) as usize;
        if len > MAX_FRAME_PAYLOAD {
            return Err(TelemetryError::capture_corrupt(
                offset,
                format!("frame declares {len} payload bytes"),
            ));
        }

        let payload_start = offset + FRAME_HEADER_LEN;
        if len > data.len() - payload_start {
            return Err(TelemetryError::capture_corrupt(
                offset,
                format!(
                    "frame declares {len} payload bytes but only {} remain",
                    data.len() - payload_start
                ),
            ));
        }

        index.push(FrameIndex { payload_start, len, timestamp_ms: u64::from_le_bytes(ts_bytes) });
        offset = payload_start + len;
    }

    Ok(index)
}
