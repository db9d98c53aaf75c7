//! Domain types and models
//!
//! Pure data structures exchanged between the snapshot source, the engine
//! and callers.

pub mod horizon;
pub mod snapshot;
pub mod state;
pub mod stats;
pub mod table;

pub use horizon::{Horizon, MetricKey};
pub use snapshot::{location_key, IsoWeek, SnapshotBatch, SnapshotRow};
pub use state::{CarriedState, LocationState};
pub use stats::BatchStats;
pub use table::{MetricTable, MetricsReport};
