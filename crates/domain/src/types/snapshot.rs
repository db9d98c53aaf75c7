//! Snapshot input types
//!
//! One batch corresponds to one source's table for one iso week: a header of
//! target-date labels plus the observed rows, already decompressed and
//! normalized upstream (empty cell means free, so flags arrive as booleans).

use serde::{Deserialize, Serialize};

use crate::constants::LOCATION_KEY_SEPARATOR;
use crate::errors::{Result, SlotwatchError};

/// An ISO calendar week, the partition unit of the snapshot archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IsoWeek {
    /// ISO year (may differ from the calendar year at year boundaries).
    pub year: i32,
    /// ISO week number, 1-53.
    pub week: u32,
}

impl IsoWeek {
    /// Create a week from its parts.
    pub fn new(year: i32, week: u32) -> Self {
        Self { year, week }
    }

    /// Parse a `"YYYY-WW"` label, e.g. `"2021-28"`. Leading zeroes in the
    /// week part are accepted (`"2021-07"`).
    pub fn parse(label: &str) -> Result<Self> {
        let invalid = || SlotwatchError::InvalidWeek(label.to_string());

        let (year, week) = label.split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let week: u32 = week.trim_start_matches('0').parse().map_err(|_| invalid())?;
        if week == 0 || week > 53 {
            return Err(invalid());
        }
        Ok(Self { year, week })
    }
}

impl std::fmt::Display for IsoWeek {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.week)
    }
}

/// One observed snapshot row: which target-dates were free at a location at
/// one instant. The slot flags are positionally aligned with the owning
/// batch's [`SnapshotBatch::dates`] header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRow {
    /// Observation instant, `YYYY-MM-DD HH:MM:SS`. Kept as the raw label so
    /// parse failures surface inside the engine, not the source.
    pub timestamp: String,
    /// Source the row was scraped from (repeated from the batch).
    pub source_id: String,
    /// Location within the source.
    pub location_id: String,
    /// One flag per header date: `true` means the slot is free.
    pub slots: Vec<bool>,
}

/// One source's snapshot table for one iso week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotBatch {
    /// Week partition this batch belongs to.
    pub iso_week: IsoWeek,
    /// Source all rows of this batch belong to.
    pub source_id: String,
    /// Target-date header labels, `YYYY-MM-DD HH:MM:SS`, zero-padded so that
    /// lexical order equals chronological order.
    pub dates: Vec<String>,
    /// Observed rows in stream order.
    pub rows: Vec<SnapshotRow>,
}

impl SnapshotBatch {
    /// The per-location state partition key for a row of this batch,
    /// `source_id/location_id`.
    pub fn location_key(&self, row: &SnapshotRow) -> String {
        location_key(&self.source_id, &row.location_id)
    }
}

/// Join a source id and location id into the partition key used for all
/// per-location state.
pub fn location_key(source_id: &str, location_id: &str) -> String {
    format!("{source_id}{LOCATION_KEY_SEPARATOR}{location_id}")
}
