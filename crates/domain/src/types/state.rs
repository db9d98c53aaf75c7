//! Per-location differencing state and the carry object for resumable runs

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Mutable state of one location, keyed by its location key.
///
/// Created lazily on first sighting and never destroyed within a run. The
/// date sets hold raw target-date labels; the upstream zero-padded format
/// makes lexical order chronological, so a [`BTreeSet`] yields the current
/// min/max directly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationState {
    /// Target-dates currently believed free.
    pub free_dates: BTreeSet<String>,
    /// Target-dates currently believed booked. Disjoint from `free_dates`;
    /// dates never seen free are in neither set.
    pub appointed_dates: BTreeSet<String>,
    /// Bucketed timestamp of the most recently processed snapshot.
    pub last_timestamp: Option<NaiveDateTime>,
    /// Raw slot flags of the most recently processed row, for the
    /// row-changed comparison.
    pub last_slots: Option<Vec<bool>>,
}

impl LocationState {
    /// Whether the free/appointed invariant holds.
    pub fn is_consistent(&self) -> bool {
        self.free_dates.is_disjoint(&self.appointed_dates)
    }
}

/// Snapshot-differencing state for every location sighted so far.
///
/// Opaque to callers: persist it between partitions and hand it back to the
/// next run to make a partitioned stream behave exactly like one
/// concatenated run. Must not be shared between engines processing
/// overlapping location keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarriedState {
    locations: BTreeMap<String, LocationState>,
}

impl CarriedState {
    /// Fresh state for a first run.
    pub fn new() -> Self {
        Self::default()
    }

    /// State for a location key, created empty on first access.
    pub fn entry(&mut self, location_key: &str) -> &mut LocationState {
        self.locations.entry(location_key.to_string()).or_default()
    }

    /// State for a location key, if the location was sighted before.
    pub fn get(&self, location_key: &str) -> Option<&LocationState> {
        self.locations.get(location_key)
    }

    /// Number of locations sighted so far.
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    /// Whether any location has been sighted.
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Iterate over `(location_key, state)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &LocationState)> {
        self.locations.iter()
    }
}
