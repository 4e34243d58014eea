//! Error types for telemetry ingest, capture and replay.
//!
//! All errors implement `std::error::Error` and carry enough structured
//! context to decide how to recover.
//!
//! ## Error Categories
//!
//! - **Connection Errors**: socket bind or send failures
//! - **File Errors**: capture file open/read/rename/delete failures
//! - **Packet Errors**: datagrams too short for their header or body
//! - **Capture Errors**: corrupt capture files and unrecoverable storage failures
//! - **State Errors**: recording state machine transitions that are not legal
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use gridwatch::TelemetryError;
//!
//! let error = TelemetryError::connection_failed("port 20777 already in use");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

use crate::types::PacketKind;

/// Result type alias for telemetry operations.
pub type Result<T, E = TelemetryError> = std::result::Result<T, E>;

/// Main error type for telemetry operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TelemetryError {
    #[error("Network error: {reason}")]
    Connection {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Capture file error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Datagram of {len} bytes is shorter than the {min}-byte packet header")]
    InvalidHeader { len: usize, min: usize },

    #[error("{kind} packet of {len} bytes is shorter than the {min}-byte minimum")]
    MalformedPacket { kind: PacketKind, len: usize, min: usize },

    #[error("Parse error in {context}: {details}")]
    Parse { context: String, details: String },

    #[error("Capture file corrupt at byte {offset}: {details}")]
    CaptureCorrupt { offset: usize, details: String },

    #[error("Cannot {action} while recording is {state}")]
    InvalidTransition { state: String, action: &'static str },

    #[error("Capture storage failed: {reason}")]
    Storage { reason: String },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl TelemetryError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            TelemetryError::Connection { .. } => true,
            TelemetryError::InvalidTransition { .. } => true,
            TelemetryError::File { .. } => false,
            TelemetryError::InvalidHeader { .. } => false,
            TelemetryError::MalformedPacket { .. } => false,
            TelemetryError::Parse { .. } => false,
            TelemetryError::CaptureCorrupt { .. } => false,
            TelemetryError::Storage { .. } => false,
            TelemetryError::InvalidConfig { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            TelemetryError::Connection { .. } => vec![
                "Check that no other telemetry tool is bound to the UDP port",
                "Verify the bind address exists on this host",
                "Confirm UDP telemetry is enabled in the game settings",
            ],
            TelemetryError::File { .. } => vec![
                "Check the capture file exists and is readable",
                "Check permissions on the capture directory",
                "Ensure sufficient disk space",
            ],
            TelemetryError::InvalidHeader { .. } | TelemetryError::MalformedPacket { .. } => vec![
                "Confirm the game sends the 2024 or 2025 packet format",
                "Check that nothing else is sending to the telemetry port",
            ],
            TelemetryError::Parse { .. } => vec![
                "Verify source data integrity",
                "Check the configuration file syntax",
            ],
            TelemetryError::CaptureCorrupt { .. } => vec![
                "Re-record the session; capture files are not repairable",
                "Check the file was fully written before replaying it",
            ],
            TelemetryError::InvalidTransition { .. } => vec![
                "Query the recording state before issuing the command",
                "Finish the recording before saving it",
            ],
            TelemetryError::Storage { .. } => vec![
                "Free disk space on the capture volume",
                "Choose a different capture directory",
            ],
            TelemetryError::InvalidConfig { .. } => vec![
                "Review the configuration values against the documented defaults",
                "Unset GRIDWATCH_* environment overrides to isolate the problem",
            ],
        }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        TelemetryError::File { path, source }
    }

    /// Helper constructor for network errors.
    pub fn connection_failed(reason: impl Into<String>) -> Self {
        TelemetryError::Connection { reason: reason.into(), source: None }
    }

    /// Helper constructor for network errors with source.
    pub fn connection_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        TelemetryError::Connection { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for capture corruption.
    pub fn capture_corrupt(offset: usize, details: impl Into<String>) -> Self {
        TelemetryError::CaptureCorrupt { offset, details: details.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        TelemetryError::InvalidConfig { reason: reason.into() }
    }
}

impl From<std::io::Error> for TelemetryError {
    fn from(err: std::io::Error) -> Self {
        TelemetryError::File { path: PathBuf::from("<unknown>"), source: err }
    }
}
