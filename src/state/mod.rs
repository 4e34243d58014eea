//! Per-car state table and the session context that owns it
//!
//! ## Architecture
//!
//! - [`StateTable`] holds 22 [`CarSlot`]s; each slot has four independently
//!   stale sub-records, replaced wholesale by [`StateTable::upsert`]
//! - [`SessionContext`] owns the table together with the session record,
//!   the current `sessionUID` and the decode counters. It is passed to the
//!   ingress dispatcher explicitly; there is no global state.
//! - [`StateSnapshot`] is an immutable copy handed to subscribers

mod context;
mod table;

pub use context::{DecodeCounters, SessionContext, StateSnapshot};
pub use table::{CarSlot, StateTable, SubRecord};
