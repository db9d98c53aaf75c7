//! Horizon classification of target-dates against a reference instant
//!
//! Decides, for every horizon in the fixed table, whether a target-date
//! lies that far ahead of a reference instant. Both instants are quantized
//! per horizon family (hour, midnight, ISO-week Monday) and the signed
//! quantized distance is compared against the horizon's count.
//!
//! Snapshot timestamps and target-date labels repeat heavily across rows,
//! so quantized values are memoized per raw label for the lifetime of the
//! classifier. The cache is unbounded; the domain of distinct labels is
//! bounded by sighted input.

use ahash::AHashMap;
use chrono::NaiveDateTime;
use slotwatch_domain::{Horizon, Result};

use super::time;
use super::HorizonCounts;

/// Quantized representations of one instant, one per horizon family.
#[derive(Debug, Clone, Copy)]
struct Quantized {
    hour: NaiveDateTime,
    day: NaiveDateTime,
    week: NaiveDateTime,
}

impl Quantized {
    fn of(ts: NaiveDateTime) -> Self {
        Self {
            hour: time::floor_to_hour(ts),
            day: time::floor_to_day(ts),
            week: time::floor_to_week(ts),
        }
    }
}

/// Table-driven horizon classifier with a per-instance label cache.
#[derive(Debug, Default)]
pub struct HorizonClassifier {
    cache: AHashMap<String, Quantized>,
}

impl HorizonClassifier {
    /// Fresh classifier with an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and cache every label. Fails on the first malformed label,
    /// before the caller has touched any per-location state.
    pub fn warm(&mut self, labels: &[String]) -> Result<()> {
        for label in labels {
            self.quantized(label)?;
        }
        Ok(())
    }

    /// All horizons the `(now, target)` pair satisfies: at most one per
    /// family, so at most three entries.
    pub fn classify(&mut self, now: NaiveDateTime, target: &str) -> Result<Vec<Horizon>> {
        let t = self.quantized(target)?;
        let n = Quantized::of(now);

        let mut matched = Vec::with_capacity(3);
        let hours = (t.hour - n.hour).num_hours();
        if (0..=4).contains(&hours) {
            matched.push(Horizon::Hours(hours as u8));
        }
        let days = (t.day - n.day).num_days();
        if (0..=4).contains(&days) {
            matched.push(Horizon::Days(days as u8));
        }
        let week_days = (t.week - n.week).num_days();
        if (0..=28).contains(&week_days) && week_days % 7 == 0 {
            matched.push(Horizon::Weeks((week_days / 7) as u8));
        }
        Ok(matched)
    }

    /// Whether one specific horizon holds for the `(now, target)` pair.
    pub fn is_within(&mut self, horizon: Horizon, now: NaiveDateTime, target: &str) -> Result<bool> {
        Ok(self.classify(now, target)?.contains(&horizon))
    }

    /// Per-horizon counts of the free slots in one row: how many of the
    /// dates flagged free fall inside each horizon, measured from `now`.
    /// A pure snapshot property; quantizes (and caches) every label so a
    /// malformed one fails the whole row up front.
    pub fn free_counts(
        &mut self,
        now: NaiveDateTime,
        dates: &[String],
        slots: &[bool],
    ) -> Result<HorizonCounts> {
        let mut counts: HorizonCounts = [0; 15];
        for (date, is_free) in dates.iter().zip(slots) {
            if *is_free {
                for horizon in self.classify(now, date)? {
                    counts[horizon.index()] += 1;
                }
            } else {
                self.quantized(date)?;
            }
        }
        Ok(counts)
    }

    fn quantized(&mut self, label: &str) -> Result<Quantized> {
        if let Some(q) = self.cache.get(label) {
            return Ok(*q);
        }
        let q = Quantized::of(time::parse_timestamp(label)?);
        self.cache.insert(label.to_string(), q);
        Ok(q)
    }
}
