//! Accumulation of row metrics into the named output series

use std::collections::{BTreeMap, BTreeSet};

use ahash::AHashMap;
use chrono::NaiveDateTime;
use slotwatch_domain::types::{Horizon, MetricKey, MetricTable};

use super::engine::RowMetrics;

/// One series under construction: bucket → location → count.
type Series = BTreeMap<NaiveDateTime, AHashMap<String, u64>>;

/// Collects the 49 metric series and materializes them into tables.
///
/// Every row contributes an explicit value to every series (zeroes
/// included), so blank cells only appear for bucket/location pairs the
/// stream never visited together. Finalization is idempotent and leaves the
/// accumulator untouched, so accumulation can continue across partitions
/// between finalize calls.
#[derive(Debug)]
pub struct MetricsAccumulator {
    series: AHashMap<MetricKey, Series>,
}

impl Default for MetricsAccumulator {
    fn default() -> Self {
        let mut series = AHashMap::with_capacity(49);
        for key in MetricKey::all() {
            series.insert(key, Series::new());
        }
        Self { series }
    }
}

impl MetricsAccumulator {
    /// Empty accumulator with all 49 series registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one row's contributions into the series, summing when several
    /// rows of a location land in the same bucket.
    pub fn record(&mut self, metrics: &RowMetrics) {
        self.add(MetricKey::Changed, metrics, metrics.changed);
        self.add(MetricKey::Appointments, metrics, metrics.appointments);
        self.add(MetricKey::Cancellations, metrics, metrics.cancellations);
        self.add(MetricKey::FreeDates, metrics, metrics.free_dates);
        for horizon in Horizon::ALL {
            let i = horizon.index();
            self.add(MetricKey::FreeDatesWithin(horizon), metrics, metrics.free_dates_within[i]);
            self.add(
                MetricKey::AppointmentsWithin(horizon),
                metrics,
                metrics.appointments_within[i],
            );
            self.add(
                MetricKey::CancellationsWithin(horizon),
                metrics,
                metrics.cancellations_within[i],
            );
        }
    }

    fn add(&mut self, key: MetricKey, metrics: &RowMetrics, value: u64) {
        let cell = self
            .series
            .entry(key)
            .or_default()
            .entry(metrics.bucket)
            .or_default()
            .entry(metrics.location_key.clone())
            .or_insert(0);
        *cell += value;
    }

    /// Materialize every series into a sorted table, keyed by series name.
    pub fn finalize(&self) -> BTreeMap<String, MetricTable> {
        MetricKey::all()
            .into_iter()
            .map(|key| {
                let table = self.series.get(&key).map(to_table).unwrap_or_default();
                (key.name(), table)
            })
            .collect()
    }
}

fn to_table(series: &Series) -> MetricTable {
    let index: Vec<NaiveDateTime> = series.keys().copied().collect();
    let columns: Vec<String> = series
        .values()
        .flat_map(|locations| locations.keys())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .cloned()
        .collect();

    let cells = series
        .values()
        .map(|locations| columns.iter().map(|c| locations.get(c).copied()).collect())
        .collect();

    MetricTable::from_parts(index, columns, cells)
}
