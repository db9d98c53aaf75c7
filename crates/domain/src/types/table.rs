//! Materialized metric tables and the report returned to callers

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::types::stats::BatchStats;

/// One time-indexed metric series, materialized.
///
/// Rows are the 15-minute buckets present in the data, ascending; columns
/// are location keys, ascending. A cell is `None` when the location produced
/// no row for that bucket ("not observed"), which is distinct from an
/// explicit zero count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricTable {
    index: Vec<NaiveDateTime>,
    columns: Vec<String>,
    cells: Vec<Vec<Option<u64>>>,
}

impl MetricTable {
    /// A table with no rows and no columns.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Assemble a table from pre-sorted parts.
    ///
    /// Callers must pass `index` and `columns` ascending and `cells` in
    /// row-major `index × columns` shape; the accumulator is the only
    /// intended producer.
    pub fn from_parts(
        index: Vec<NaiveDateTime>,
        columns: Vec<String>,
        cells: Vec<Vec<Option<u64>>>,
    ) -> Self {
        debug_assert_eq!(index.len(), cells.len());
        debug_assert!(cells.iter().all(|row| row.len() == columns.len()));
        debug_assert!(index.windows(2).all(|w| w[0] < w[1]));
        debug_assert!(columns.windows(2).all(|w| w[0] < w[1]));
        Self { index, columns, cells }
    }

    /// Bucket timestamps, ascending.
    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }

    /// Location keys, ascending.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of bucket rows.
    pub fn num_rows(&self) -> usize {
        self.index.len()
    }

    /// Number of location columns.
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Whether the table holds any buckets.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Count for a bucket/location pair, `None` when either is absent or
    /// the cell was not observed.
    pub fn get(&self, bucket: NaiveDateTime, location_key: &str) -> Option<u64> {
        let row = self.index.binary_search(&bucket).ok()?;
        let col = self.columns.binary_search_by(|c| c.as_str().cmp(location_key)).ok()?;
        self.cells[row][col]
    }

    /// Cell by position.
    pub fn cell(&self, row: usize, col: usize) -> Option<u64> {
        self.cells.get(row).and_then(|r| r.get(col)).copied().flatten()
    }

    /// Lossless string encoding of a cell: the integer count, or the empty
    /// string for "not observed". This is the upstream CSV convention.
    pub fn cell_str(&self, row: usize, col: usize) -> String {
        match self.cell(row, col) {
            Some(count) => count.to_string(),
            None => String::new(),
        }
    }

    /// Iterate `(bucket, cells)` row pairs in bucket order.
    pub fn iter_rows(&self) -> impl Iterator<Item = (NaiveDateTime, &[Option<u64>])> {
        self.index.iter().copied().zip(self.cells.iter().map(Vec::as_slice))
    }
}

/// Finalized output of a metrics run: all 49 series plus per-batch summary
/// statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsReport {
    /// Metric tables keyed by series name; every name is present, empty
    /// streams yield empty tables.
    pub tables: BTreeMap<String, MetricTable>,
    /// One summary entry per processed batch, in stream order.
    pub stats: Vec<BatchStats>,
}

impl MetricsReport {
    /// Table for a series name, e.g. `"appointments_1d"`.
    pub fn table(&self, name: &str) -> Option<&MetricTable> {
        self.tables.get(name)
    }
}
