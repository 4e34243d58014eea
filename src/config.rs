//! Runtime configuration
//!
//! Defaults match the game's out-of-the-box UDP settings. A YAML file may
//! override any subset of fields, and a few `GRIDWATCH_*` environment
//! variables override the file.
//!
//! ```rust
//! use gridwatch::GridwatchConfig;
//!
//! let config = GridwatchConfig::from_yaml_str(
//!     "ingress:\n  port: 20778\nrecorder:\n  capture_dir: /tmp/laps\n",
//! )
//! .unwrap();
//! assert_eq!(config.ingress.port, 20778);
//! assert_eq!(config.recorder.queue_capacity, 4096);
//! ```

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::{Result, TelemetryError};

pub const DEFAULT_PORT: u16 = 20777;

/// Largest datagram the 2024/2025 protocol sends (Session History). A smaller
/// receive buffer would silently truncate it.
pub const MIN_RECEIVE_BUFFER: usize = 1460;

pub const ENV_PORT: &str = "GRIDWATCH_UDP_PORT";
pub const ENV_BIND_ADDR: &str = "GRIDWATCH_BIND_ADDR";
pub const ENV_FORWARD_ADDR: &str = "GRIDWATCH_FORWARD_ADDR";
pub const ENV_CAPTURE_DIR: &str = "GRIDWATCH_CAPTURE_DIR";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridwatchConfig {
    pub ingress: IngressConfig,
    pub recorder: RecorderConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngressConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    /// Every accepted datagram is also sent here, fire-and-forget.
    pub forward_to: Option<SocketAddr>,
    pub receive_buffer_bytes: usize,
    pub event_capacity: usize,
    pub statistics_interval_ms: u64,
}

impl Default for IngressConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            forward_to: None,
            receive_buffer_bytes: 2048,
            event_capacity: 1024,
            statistics_interval_ms: 1000,
        }
    }
}

impl IngressConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }

    pub fn statistics_interval(&self) -> Duration {
        Duration::from_millis(self.statistics_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    pub capture_dir: PathBuf,
    /// Frames the write queue holds before new ones are dropped.
    pub queue_capacity: usize,
    /// Frames written per flush.
    pub flush_batch: usize,
    /// Expected spacing between datagrams.
    pub nominal_interval_ms: u64,
    /// Gaps longer than `nominal_interval_ms * gap_multiplier` count toward
    /// the missed-packet estimate.
    pub gap_multiplier: u32,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            capture_dir: PathBuf::from("captures"),
            queue_capacity: 4096,
            flush_batch: 64,
            nominal_interval_ms: 50,
            gap_multiplier: 3,
        }
    }
}

impl GridwatchConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml_ng::from_str(yaml).map_err(|e| TelemetryError::Parse {
            context: "configuration".to_string(),
            details: e.to_string(),
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| TelemetryError::file_error(path.to_path_buf(), e))?;
        Self::from_yaml_str(&yaml)
    }

    /// Apply `GRIDWATCH_*` variables from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from any variable source. Unparseable values are
    /// logged and ignored.
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(port) = parse_var(&lookup, ENV_PORT).filter(|p: &u16| *p > 0) {
            self.ingress.port = port;
        }
        if let Some(addr) = parse_var(&lookup, ENV_BIND_ADDR) {
            self.ingress.bind_addr = addr;
        }
        if let Some(addr) = parse_var(&lookup, ENV_FORWARD_ADDR) {
            self.ingress.forward_to = Some(addr);
        }
        if let Some(dir) = lookup(ENV_CAPTURE_DIR).filter(|d| !d.trim().is_empty()) {
            self.recorder.capture_dir = PathBuf::from(dir);
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.ingress.receive_buffer_bytes < MIN_RECEIVE_BUFFER {
            return Err(TelemetryError::invalid_config(format!(
                "receive_buffer_bytes must be at least {MIN_RECEIVE_BUFFER}"
            )));
        }
        if self.ingress.event_capacity == 0 {
            return Err(TelemetryError::invalid_config("event_capacity must be at least 1"));
        }
        if self.ingress.statistics_interval_ms == 0 {
            return Err(TelemetryError::invalid_config("statistics_interval_ms must be positive"));
        }
        if self.recorder.queue_capacity == 0 {
            return Err(TelemetryError::invalid_config("queue_capacity must be at least 1"));
        }
        if self.recorder.flush_batch == 0 {
            return Err(TelemetryError::invalid_config("flush_batch must be at least 1"));
        }
        if self.recorder.nominal_interval_ms == 0 {
            return Err(TelemetryError::invalid_config("nominal_interval_ms must be positive"));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = name, value = %raw, "Ignoring unparseable override");
            None
        }
    }
}
