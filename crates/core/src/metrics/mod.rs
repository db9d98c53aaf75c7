//! Snapshot-differencing metrics domain

pub mod accumulator;
pub mod engine;
pub mod horizon;
pub mod ports;
pub mod service;

mod time;

/// Per-horizon counters, indexed by [`slotwatch_domain::Horizon::index`].
pub type HorizonCounts = [u64; 15];

pub use accumulator::MetricsAccumulator;
pub use engine::{DiffEngine, RowMetrics};
pub use horizon::HorizonClassifier;
pub use ports::SnapshotSource;
pub use service::{MetricsOptions, MetricsService};
