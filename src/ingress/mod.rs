//! Live UDP ingress
//!
//! ## Architecture
//!
//! - [`Dispatcher`]: synchronous per-datagram pipeline over an owned
//!   [`crate::state::SessionContext`]
//! - [`IngressService`] / [`IngressHandle`]: the socket task, optional
//!   forwarding, periodic statistics, and the subscriber surface
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use gridwatch::{GridwatchConfig, IngressService, UpdateRate};
//!
//! #[tokio::main]
//! async fn main() -> gridwatch::Result<()> {
//!     let ingress = IngressService::bind(GridwatchConfig::default()).await?;
//!     let mut snapshots = ingress.snapshots(UpdateRate::Max(10));
//!     while let Some(snapshot) = snapshots.next().await {
//!         for (slot, car) in snapshot.active_cars() {
//!             if let Some(t) = &car.telemetry {
//!                 println!("car {slot}: {} km/h in {}", t.speed, t.gear);
//!             }
//!         }
//!     }
//!     Ok(())
//! }
//! ```

mod dispatcher;
mod service;

pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use service::{IngressHandle, IngressService};
