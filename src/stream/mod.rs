//! Stream utilities for state subscribers

mod throttle;

pub use throttle::{Throttle, ThrottleExt};
