//! Per-batch summary statistics

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::types::snapshot::IsoWeek;

/// Summary of one processed snapshot batch (one source × one iso week).
///
/// Derived from the sighted rows only, independently of any carried state,
/// so the same batch always summarizes the same way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    /// Week partition of the batch.
    pub iso_week: IsoWeek,
    /// Source the batch belongs to.
    pub source_id: String,
    /// Distinct locations sighted in the batch.
    pub num_locations: usize,
    /// Distinct snapshot instants sighted in the batch.
    pub num_snapshots: usize,
    /// Rows whose slot flags differed from the location's previous row
    /// within this batch.
    pub num_changed_rows: usize,
    /// Earliest row timestamp in the batch.
    pub min_timestamp: Option<NaiveDateTime>,
    /// Latest row timestamp in the batch.
    pub max_timestamp: Option<NaiveDateTime>,
}
