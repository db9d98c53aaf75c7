//! Metrics service - drives a snapshot stream through the state machine

use ahash::{AHashMap, AHashSet};
use chrono::NaiveDateTime;
use slotwatch_domain::types::{BatchStats, CarriedState, MetricsReport, SnapshotBatch};
use slotwatch_domain::{Result, StringFilter, WeekFilter};
use tracing::debug;

use super::accumulator::MetricsAccumulator;
use super::engine::DiffEngine;
use super::horizon::HorizonClassifier;
use super::ports::SnapshotSource;

/// Selection options for a metrics run. Batches failing any configured
/// filter are skipped without touching state.
#[derive(Debug, Default)]
pub struct MetricsOptions {
    /// Only process sources matching this filter.
    pub sources: Option<StringFilter>,
    /// Skip sources matching this filter; wins over `sources`.
    pub sources_exclude: Option<StringFilter>,
    /// Week bounds for the run.
    pub weeks: WeekFilter,
}

/// Computes the 49 metric series from a stream of snapshot batches.
///
/// The service owns the differencing state, the accumulator and the
/// per-batch summary statistics. It is strictly single-writer: one service
/// instance per partition of location keys, no sharing of carried state
/// between concurrently running instances.
#[derive(Debug, Default)]
pub struct MetricsService {
    options: MetricsOptions,
    engine: DiffEngine,
    accumulator: MetricsAccumulator,
    stats: Vec<BatchStats>,
}

impl MetricsService {
    /// Service with fresh state and no filters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure batch selection.
    pub fn with_options(mut self, options: MetricsOptions) -> Self {
        self.options = options;
        self
    }

    /// Resume from carried state of a previous partition.
    pub fn with_state(mut self, state: CarriedState) -> Self {
        self.engine = DiffEngine::with_state(state);
        self
    }

    /// Process every batch of a source and return the finalized report.
    pub fn run<S: SnapshotSource>(&mut self, mut source: S) -> Result<MetricsReport> {
        while let Some(batch) = source.next_batch()? {
            self.process_batch(&batch)?;
        }
        Ok(self.finalize())
    }

    /// Process one batch: filter, validate the header, feed every row to
    /// the state machine and collect the batch summary.
    pub fn process_batch(&mut self, batch: &SnapshotBatch) -> Result<()> {
        if !self.selected(batch) {
            debug!(week = %batch.iso_week, source = %batch.source_id, "skipping filtered batch");
            return Ok(());
        }

        // Fresh classifier per batch; warming validates every header label
        // before the first row can mutate state.
        let mut classifier = HorizonClassifier::new();
        classifier.warm(&batch.dates)?;

        let mut locations: AHashSet<&str> = AHashSet::new();
        let mut instants: AHashSet<&str> = AHashSet::new();
        let mut previous_rows: AHashMap<&str, &[bool]> = AHashMap::new();
        let mut num_changed_rows = 0;
        let mut min_timestamp: Option<NaiveDateTime> = None;
        let mut max_timestamp: Option<NaiveDateTime> = None;

        for row in &batch.rows {
            let metrics =
                self.engine.process_row(&mut classifier, &batch.source_id, &batch.dates, row)?;

            locations.insert(row.location_id.as_str());
            instants.insert(row.timestamp.as_str());
            if previous_rows
                .insert(row.location_id.as_str(), &row.slots)
                .is_some_and(|previous| previous != row.slots.as_slice())
            {
                num_changed_rows += 1;
            }
            min_timestamp = Some(min_timestamp.map_or(metrics.timestamp, |m| m.min(metrics.timestamp)));
            max_timestamp = Some(max_timestamp.map_or(metrics.timestamp, |m| m.max(metrics.timestamp)));

            self.accumulator.record(&metrics);
        }

        debug!(
            week = %batch.iso_week,
            source = %batch.source_id,
            rows = batch.rows.len(),
            locations = locations.len(),
            "processed snapshot batch"
        );

        self.stats.push(BatchStats {
            iso_week: batch.iso_week,
            source_id: batch.source_id.clone(),
            num_locations: locations.len(),
            num_snapshots: instants.len(),
            num_changed_rows,
            min_timestamp,
            max_timestamp,
        });
        Ok(())
    }

    /// Finalize the current accumulation into a report. Idempotent; the
    /// service can keep processing batches afterwards.
    pub fn finalize(&self) -> MetricsReport {
        MetricsReport { tables: self.accumulator.finalize(), stats: self.stats.clone() }
    }

    /// Per-batch summaries collected so far.
    pub fn stats(&self) -> &[BatchStats] {
        &self.stats
    }

    /// The carried differencing state.
    pub fn state(&self) -> &CarriedState {
        self.engine.state()
    }

    /// Release the carried state for persistence or the next partition.
    pub fn into_state(self) -> CarriedState {
        self.engine.into_state()
    }

    fn selected(&self, batch: &SnapshotBatch) -> bool {
        if !self.options.weeks.matches(batch.iso_week) {
            return false;
        }
        if self.options.sources_exclude.as_ref().is_some_and(|f| f.matches(&batch.source_id)) {
            return false;
        }
        if let Some(filter) = &self.options.sources {
            return filter.matches(&batch.source_id);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use slotwatch_domain::types::{IsoWeek, SnapshotRow};

    use super::*;

    fn test_batch(week: u32, source_id: &str, rows: Vec<SnapshotRow>) -> SnapshotBatch {
        SnapshotBatch {
            iso_week: IsoWeek::new(2021, week),
            source_id: source_id.to_string(),
            dates: vec![
                "2021-07-12 09:00:00".to_string(),
                "2021-07-12 10:00:00".to_string(),
                "2021-07-12 11:00:00".to_string(),
            ],
            rows,
        }
    }

    fn test_row(source_id: &str, location_id: &str, timestamp: &str, slots: &[bool]) -> SnapshotRow {
        SnapshotRow {
            timestamp: timestamp.to_string(),
            source_id: source_id.to_string(),
            location_id: location_id.to_string(),
            slots: slots.to_vec(),
        }
    }

    #[test]
    fn test_empty_stream_yields_complete_empty_report() {
        // AC: zero batches is "no data", not an error
        let mut service = MetricsService::new();
        let report = service.run(Vec::<SnapshotBatch>::new().into_iter()).unwrap();
        assert_eq!(report.tables.len(), 49);
        assert!(report.tables.values().all(|t| t.is_empty()));
        assert!(report.stats.is_empty());
    }

    #[test]
    fn test_source_filters_skip_batches_without_state() {
        let options = MetricsOptions {
            sources: Some(StringFilter::glob("b*").unwrap()),
            sources_exclude: Some(StringFilter::glob("bonnbau").unwrap()),
            weeks: WeekFilter::default(),
        };
        let mut service = MetricsService::new().with_options(options);

        for source in ["bonn", "bonnbau", "jena"] {
            let batch = test_batch(
                28,
                source,
                vec![test_row(source, "meldewesen", "2021-07-12 00:03:33", &[true, true, true])],
            );
            service.process_batch(&batch).unwrap();
        }

        assert_eq!(service.stats().len(), 1);
        assert_eq!(service.stats()[0].source_id, "bonn");
        assert_eq!(service.state().len(), 1);
        assert!(service.state().get("bonn/meldewesen").is_some());
    }

    #[test]
    fn test_week_filter_bounds_the_run() {
        let options = MetricsOptions {
            weeks: WeekFilter { lte: Some(IsoWeek::new(2021, 28)), ..Default::default() },
            ..Default::default()
        };
        let mut service = MetricsService::new().with_options(options);

        for week in [28, 29] {
            let batch = test_batch(
                week,
                "bonn",
                vec![test_row("bonn", "meldewesen", "2021-07-12 00:03:33", &[true, true, true])],
            );
            service.process_batch(&batch).unwrap();
        }

        assert_eq!(service.stats().len(), 1);
        assert_eq!(service.stats()[0].iso_week, IsoWeek::new(2021, 28));
    }

    #[test]
    fn test_batch_stats_summarize_sighted_rows() {
        let mut service = MetricsService::new();
        let batch = test_batch(
            28,
            "bonn",
            vec![
                test_row("bonn", "meldewesen", "2021-07-12 00:03:33", &[true, true, true]),
                test_row("bonn", "kfz", "2021-07-12 00:03:33", &[true, true, false]),
                test_row("bonn", "meldewesen", "2021-07-12 00:18:00", &[true, false, true]),
                test_row("bonn", "kfz", "2021-07-12 00:18:00", &[true, true, false]),
            ],
        );
        service.process_batch(&batch).unwrap();

        let stats = &service.stats()[0];
        assert_eq!(stats.num_locations, 2);
        assert_eq!(stats.num_snapshots, 2);
        // Only meldewesen's second row differs from its first
        assert_eq!(stats.num_changed_rows, 1);
        assert_eq!(
            stats.min_timestamp.map(|t| t.to_string()).as_deref(),
            Some("2021-07-12 00:03:33")
        );
        assert_eq!(
            stats.max_timestamp.map(|t| t.to_string()).as_deref(),
            Some("2021-07-12 00:18:00")
        );
    }

    #[test]
    fn test_malformed_header_fails_before_any_row() {
        let mut service = MetricsService::new();
        let mut batch = test_batch(
            28,
            "bonn",
            vec![test_row("bonn", "meldewesen", "2021-07-12 00:03:33", &[true, true, true])],
        );
        batch.dates[1] = "not a date".to_string();

        assert!(service.process_batch(&batch).is_err());
        assert!(service.state().is_empty());
        assert!(service.stats().is_empty());
    }
}
