//! Snapshot-differencing state machine
//!
//! Consumes snapshot rows one at a time, in stream order, and derives the
//! booking events and exposure counts for the row's 15-minute attribution
//! bucket while updating the per-location state.
//!
//! Two rules guard against phantom events:
//!
//! - **Gap heuristic**: appointment and cancellation counts are only
//!   recorded when the previous snapshot of the location is less than 16
//!   minutes old. Across a longer monitoring gap, arbitrarily many bookings
//!   could have happened; attributing the net difference to discrete
//!   actions would be wrong.
//! - **Edge exclusion**: a date vanishing from the minimum or maximum of
//!   the tracked free set may simply have scrolled out of the bookable
//!   range, so it never counts as an appointment.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use slotwatch_domain::constants::ADJACENCY_WINDOW_SECS;
use slotwatch_domain::types::{location_key, CarriedState, SnapshotRow};
use slotwatch_domain::{Result, SlotwatchError};

use super::horizon::HorizonClassifier;
use super::{time, HorizonCounts};

/// Everything one row contributes to the metric series, keyed by the row's
/// attribution bucket and location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowMetrics {
    /// Row timestamp floored to the 15-minute bucket.
    pub bucket: NaiveDateTime,
    /// Full-resolution row timestamp.
    pub timestamp: NaiveDateTime,
    /// `source_id/location_id` partition key.
    pub location_key: String,
    /// 1 when the raw slot flags differ from the location's previous row.
    pub changed: u64,
    /// Free→booked transitions attributed to discrete bookings.
    pub appointments: u64,
    /// Booked→free transitions attributed to discrete cancellations.
    pub cancellations: u64,
    /// Free slots exposed by this row.
    pub free_dates: u64,
    /// Free-slot exposure per horizon.
    pub free_dates_within: HorizonCounts,
    /// Appointments per horizon.
    pub appointments_within: HorizonCounts,
    /// Cancellations per horizon.
    pub cancellations_within: HorizonCounts,
}

/// The differencing state machine over an owned keyed state store.
#[derive(Debug, Default)]
pub struct DiffEngine {
    state: CarriedState,
}

impl DiffEngine {
    /// Engine with fresh state (first partition of a stream).
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine resuming from carried state of a previous partition.
    pub fn with_state(state: CarriedState) -> Self {
        Self { state }
    }

    /// The current per-location state.
    pub fn state(&self) -> &CarriedState {
        &self.state
    }

    /// Release the state for persistence or the next partition.
    pub fn into_state(self) -> CarriedState {
        self.state
    }

    /// Process one row and return its metric contributions.
    ///
    /// Rows of one location must arrive in chronological order; the caller
    /// guarantees this, the engine does not sort. On error the location's
    /// state is exactly as it was before the call.
    ///
    /// # Arguments
    /// * `classifier` - horizon classifier for the current batch
    /// * `source_id` - the batch's source (location keys join it with the
    ///   row's location id)
    /// * `dates` - the batch's target-date header labels
    /// * `row` - the observed row, slot flags aligned with `dates`
    pub fn process_row(
        &mut self,
        classifier: &mut HorizonClassifier,
        source_id: &str,
        dates: &[String],
        row: &SnapshotRow,
    ) -> Result<RowMetrics> {
        let timestamp = time::parse_timestamp(&row.timestamp)?;
        let bucket = time::floor_to_bucket(timestamp);
        let location_key = location_key(source_id, &row.location_id);

        if row.slots.len() != dates.len() {
            return Err(SlotwatchError::MisalignedRow {
                location: location_key,
                expected: dates.len(),
                actual: row.slots.len(),
            });
        }

        // Pure snapshot properties first. This also quantizes every header
        // label, so a malformed one rejects the row before any mutation.
        let free_dates = row.slots.iter().filter(|free| **free).count() as u64;
        let free_dates_within = classifier.free_counts(bucket, dates, &row.slots)?;

        let state = self.state.entry(&location_key);

        let is_adjacent = state
            .last_timestamp
            .is_some_and(|prev| (bucket - prev).num_seconds() < ADJACENCY_WINDOW_SECS);
        state.last_timestamp = Some(bucket);

        let mut appointments = 0;
        let mut cancellations = 0;
        let mut appointments_within: HorizonCounts = [0; 15];
        let mut cancellations_within: HorizonCounts = [0; 15];

        for (date, is_free) in dates.iter().zip(&row.slots) {
            if *is_free {
                if state.appointed_dates.remove(date) && is_adjacent {
                    cancellations += 1;
                    for horizon in classifier.classify(bucket, date)? {
                        cancellations_within[horizon.index()] += 1;
                    }
                }
                state.free_dates.insert(date.clone());
            } else if state.free_dates.contains(date) {
                // min/max are taken over the free set as it stands right
                // now, with the date still in it: a lone free date is its
                // own min and max and can never register as a booking.
                if is_adjacent {
                    let is_edge = state.free_dates.first() == Some(date)
                        || state.free_dates.last() == Some(date);
                    if !is_edge {
                        appointments += 1;
                        for horizon in classifier.classify(bucket, date)? {
                            appointments_within[horizon.index()] += 1;
                        }
                    }
                }
                state.free_dates.remove(date);
                state.appointed_dates.insert(date.clone());
            }
            // Dates never seen free stay out of both sets until first
            // observed free.
        }

        let changed = match &state.last_slots {
            Some(previous) => u64::from(previous != &row.slots),
            None => 0,
        };
        state.last_slots = Some(row.slots.clone());

        Ok(RowMetrics {
            bucket,
            timestamp,
            location_key,
            changed,
            appointments,
            cancellations,
            free_dates,
            free_dates_within,
            appointments_within,
            cancellations_within,
        })
    }
}

#[cfg(test)]
mod tests {
    use slotwatch_domain::Horizon;

    use super::*;

    fn row(timestamp: &str, slots: &[bool]) -> SnapshotRow {
        SnapshotRow {
            timestamp: timestamp.to_string(),
            source_id: "bonn".to_string(),
            location_id: "meldewesen".to_string(),
            slots: slots.to_vec(),
        }
    }

    fn dates(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|l| (*l).to_string()).collect()
    }

    fn process(
        engine: &mut DiffEngine,
        dates: &[String],
        timestamp: &str,
        slots: &[bool],
    ) -> RowMetrics {
        let mut classifier = HorizonClassifier::new();
        engine.process_row(&mut classifier, "bonn", dates, &row(timestamp, slots)).unwrap()
    }

    const THREE_DATES: [&str; 3] =
        ["2021-07-12 09:00:00", "2021-07-12 10:00:00", "2021-07-12 11:00:00"];

    #[test]
    fn test_edge_exclusion_counts_only_interior_dates() {
        // AC: a middle date becoming unfree while adjacent is an
        // appointment; the min date becoming unfree is not
        let dates = dates(&THREE_DATES);
        let mut engine = DiffEngine::new();
        process(&mut engine, &dates, "2021-07-12 00:03:33", &[true, true, true]);

        let metrics = process(&mut engine, &dates, "2021-07-12 00:18:00", &[true, false, true]);
        assert_eq!(metrics.appointments, 1);

        let mut engine = DiffEngine::new();
        process(&mut engine, &dates, "2021-07-12 00:03:33", &[true, true, true]);
        let metrics = process(&mut engine, &dates, "2021-07-12 00:18:00", &[false, true, true]);
        assert_eq!(metrics.appointments, 0, "min date never counts");

        let mut engine = DiffEngine::new();
        process(&mut engine, &dates, "2021-07-12 00:03:33", &[true, true, true]);
        let metrics = process(&mut engine, &dates, "2021-07-12 00:18:00", &[true, true, false]);
        assert_eq!(metrics.appointments, 0, "max date never counts");
    }

    #[test]
    fn test_gap_heuristic_blocks_distant_snapshots() {
        // AC: 20 minutes apart records nothing, 10 minutes apart records one
        let dates = dates(&THREE_DATES);
        let mut engine = DiffEngine::new();
        process(&mut engine, &dates, "2021-07-12 00:00:00", &[true, true, true]);
        let metrics = process(&mut engine, &dates, "2021-07-12 00:20:00", &[true, false, true]);
        assert_eq!(metrics.appointments, 0);

        let mut engine = DiffEngine::new();
        process(&mut engine, &dates, "2021-07-12 00:00:00", &[true, true, true]);
        let metrics = process(&mut engine, &dates, "2021-07-12 00:10:00", &[true, false, true]);
        assert_eq!(metrics.appointments, 1);
    }

    #[test]
    fn test_adjacency_compares_bucketed_timestamps() {
        // 00:03 and 00:18 land in different buckets 15 minutes apart, which
        // is inside the 16-minute window
        let dates = dates(&THREE_DATES);
        let mut engine = DiffEngine::new();
        process(&mut engine, &dates, "2021-07-12 00:03:33", &[true, true, true]);
        let metrics = process(&mut engine, &dates, "2021-07-12 00:18:00", &[true, false, true]);
        assert_eq!(metrics.bucket, time::parse_timestamp("2021-07-12 00:15:00").unwrap());
        assert_eq!(metrics.appointments, 1);
    }

    #[test]
    fn test_first_sighting_never_records_events() {
        let dates = dates(&THREE_DATES);
        let mut engine = DiffEngine::new();
        let metrics = process(&mut engine, &dates, "2021-07-12 00:03:33", &[true, false, true]);
        assert_eq!(metrics.appointments, 0);
        assert_eq!(metrics.cancellations, 0);
        assert_eq!(metrics.changed, 0);
        assert_eq!(metrics.free_dates, 2);
    }

    #[test]
    fn test_cancellation_frees_an_appointed_date() {
        let dates = dates(&THREE_DATES);
        let mut engine = DiffEngine::new();
        process(&mut engine, &dates, "2021-07-12 00:00:00", &[true, true, true]);
        process(&mut engine, &dates, "2021-07-12 00:15:00", &[true, false, true]);

        let metrics = process(&mut engine, &dates, "2021-07-12 00:30:00", &[true, true, true]);
        assert_eq!(metrics.cancellations, 1);
        assert_eq!(metrics.appointments, 0);
        // 10:00 lies 10 hours ahead of the 00:30 bucket: no hour horizon,
        // same day, same week
        assert_eq!(metrics.cancellations_within[Horizon::Days(0).index()], 1);
        assert_eq!(metrics.cancellations_within[Horizon::Weeks(0).index()], 1);
        assert_eq!(metrics.cancellations_within[Horizon::Hours(1).index()], 0);
    }

    #[test]
    fn test_single_free_date_immunity() {
        // AC: a lone free date is always its own min and max
        let dates = dates(&["2021-07-12 09:00:00"]);
        let mut engine = DiffEngine::new();
        process(&mut engine, &dates, "2021-07-12 00:00:00", &[true]);
        let metrics = process(&mut engine, &dates, "2021-07-12 00:15:00", &[false]);
        assert_eq!(metrics.appointments, 0);

        let state = engine.state().get("bonn/meldewesen").unwrap();
        assert!(state.free_dates.is_empty());
        assert!(state.appointed_dates.contains("2021-07-12 09:00:00"));
    }

    #[test]
    fn test_free_and_appointed_stay_disjoint() {
        let dates = dates(&THREE_DATES);
        let mut engine = DiffEngine::new();
        let flip_sequences = [
            [true, true, true],
            [true, false, true],
            [false, false, true],
            [true, true, false],
            [false, true, true],
        ];
        for (i, slots) in flip_sequences.iter().enumerate() {
            let timestamp = format!("2021-07-12 0{i}:00:00");
            process(&mut engine, &dates, &timestamp, slots);
            let state = engine.state().get("bonn/meldewesen").unwrap();
            assert!(state.is_consistent(), "after row {i}");
        }
    }

    #[test]
    fn test_unseen_dates_are_ignored_until_first_free() {
        let dates = dates(&THREE_DATES);
        let mut engine = DiffEngine::new();
        process(&mut engine, &dates, "2021-07-12 00:00:00", &[false, false, false]);

        let state = engine.state().get("bonn/meldewesen").unwrap();
        assert!(state.free_dates.is_empty());
        assert!(state.appointed_dates.is_empty());

        // Unfree again: still no event, the dates were never tracked
        let metrics = process(&mut engine, &dates, "2021-07-12 00:15:00", &[false, false, false]);
        assert_eq!(metrics.appointments, 0);
    }

    #[test]
    fn test_changed_flag_tracks_raw_slots() {
        let dates = dates(&THREE_DATES);
        let mut engine = DiffEngine::new();
        assert_eq!(process(&mut engine, &dates, "2021-07-12 00:00:00", &[true, true, true]).changed, 0);
        assert_eq!(process(&mut engine, &dates, "2021-07-12 00:15:00", &[true, true, true]).changed, 0);
        assert_eq!(process(&mut engine, &dates, "2021-07-12 00:30:00", &[true, false, true]).changed, 1);
        // The changed flag is not gated by adjacency
        assert_eq!(process(&mut engine, &dates, "2021-07-12 02:00:00", &[true, true, true]).changed, 1);
    }

    #[test]
    fn test_free_exposure_is_not_gated_by_adjacency() {
        let dates = dates(&THREE_DATES);
        let mut engine = DiffEngine::new();
        process(&mut engine, &dates, "2021-07-12 00:00:00", &[true, true, true]);

        // 2 hours later: no events, but the exposure counts still appear
        let metrics = process(&mut engine, &dates, "2021-07-12 02:00:00", &[true, false, true]);
        assert_eq!(metrics.appointments, 0);
        assert_eq!(metrics.free_dates, 2);
        assert_eq!(metrics.free_dates_within[Horizon::Days(0).index()], 2);
    }

    #[test]
    fn test_misaligned_row_is_rejected_without_mutation() {
        let dates = dates(&THREE_DATES);
        let mut engine = DiffEngine::new();
        process(&mut engine, &dates, "2021-07-12 00:00:00", &[true, true, true]);
        let before = engine.state().clone();

        let mut classifier = HorizonClassifier::new();
        let result = engine.process_row(
            &mut classifier,
            "bonn",
            &dates,
            &row("2021-07-12 00:15:00", &[true, false]),
        );
        assert!(matches!(
            result,
            Err(SlotwatchError::MisalignedRow { expected: 3, actual: 2, .. })
        ));
        assert_eq!(engine.state(), &before);
    }

    #[test]
    fn test_malformed_timestamp_is_rejected_without_mutation() {
        let dates = dates(&THREE_DATES);
        let mut engine = DiffEngine::new();
        process(&mut engine, &dates, "2021-07-12 00:00:00", &[true, true, true]);
        let before = engine.state().clone();

        let mut classifier = HorizonClassifier::new();
        let result = engine.process_row(
            &mut classifier,
            "bonn",
            &dates,
            &row("yesterday-ish", &[true, true, true]),
        );
        assert!(matches!(result, Err(SlotwatchError::InvalidTimestamp(_))));
        assert_eq!(engine.state(), &before);
    }

    #[test]
    fn test_locations_are_independent() {
        let dates = dates(&THREE_DATES);
        let mut engine = DiffEngine::new();
        let mut classifier = HorizonClassifier::new();

        let mut other = row("2021-07-12 00:00:00", &[true, true, true]);
        other.location_id = "kfz-zulassungswesen".to_string();
        engine.process_row(&mut classifier, "bonn", &dates, &other).unwrap();

        // First sighting of meldewesen is not adjacent to anything, even
        // though the other location has history
        let metrics = process(&mut engine, &dates, "2021-07-12 00:10:00", &[true, false, true]);
        assert_eq!(metrics.appointments, 0);
        assert_eq!(engine.state().len(), 2);
    }
}
