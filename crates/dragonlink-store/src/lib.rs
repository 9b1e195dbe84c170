//! DragonLink record stores
//!
//! Keeps the most recent state of every drone and every sensor kit, merged by
//! identity rather than appended.
//!
//! # Architecture
//!
//! ```text
//!   listener tasks ──submit()──┐
//!                              ▼
//!                   ┌──────────────────────┐
//!   apply() ──────► │   StoreCoordinator   │  one worker, FIFO queue
//!                   │   (coordinator.rs)   │
//!                   └──────┬────────┬──────┘
//!                          │        │
//!               ┌──────────▼──┐  ┌──▼──────────┐
//!               │ Telemetry   │  │ Status      │  upsert by uid / serial
//!               │ Store       │  │ Store       │
//!               └──────┬──────┘  └──────┬──────┘
//!                      │ StoreEvent     │
//!                      ▼                ▼
//!                   observers (subscribe / all)
//! ```
//!
//! # Example
//!
//! ```rust
//! use dragonlink_core::config::IngestConfig;
//! use dragonlink_cot::TelemetryRecord;
//! use dragonlink_store::{StoreCoordinator, StoreUpdate};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let coordinator = StoreCoordinator::new(&IngestConfig::default());
//! coordinator.start();
//!
//! for lat in [1.0, 2.0] {
//!     let record = TelemetryRecord::new("drone1", "a-f-G-U", lat, 0.0);
//!     coordinator.apply(StoreUpdate::Telemetry(record)).await.unwrap();
//! }
//!
//! let drones = coordinator.telemetry().all();
//! assert_eq!(drones.len(), 1);
//! assert_eq!(drones[0].lat, 2.0);
//! # }
//! ```

pub mod coordinator;
pub mod metrics;
pub mod store;

pub use coordinator::{Applied, CoordinatorError, StoreCoordinator, StoreUpdate};
pub use metrics::{StoreMetrics, StoreMetricsSnapshot};
pub use store::{Identified, StatusStore, Store, StoreEvent, TelemetryStore, Upserted};
