//! Snapshot delivery rate for state subscribers

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How often a subscriber wants state snapshots.
///
/// The game broadcasts several packet kinds per frame, so `Native` can mean
/// hundreds of snapshots per second; dashboards usually want `Max(30)` or so.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateRate {
    /// Every state change.
    Native,

    /// At most this many snapshots per second, latest wins.
    Max(u32),
}

impl UpdateRate {
    /// Minimum spacing between snapshots, or `None` when unthrottled.
    ///
    /// `Max(0)` is treated as `Native`.
    pub fn interval(self) -> Option<Duration> {
        match self {
            UpdateRate::Native | UpdateRate::Max(0) => None,
            UpdateRate::Max(hz) => Some(Duration::from_secs_f64(1.0 / f64::from(hz))),
        }
    }
}
