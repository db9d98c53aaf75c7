//! Look-ahead horizons and the metric-name registry
//!
//! A horizon names an equivalence class over the distance between a
//! reference instant and a target-date: "the same quantized hour", "one
//! quantized day ahead", "two ISO weeks ahead", and so on. The fixed table
//! of fifteen horizons parameterizes three of the four metric families.

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SlotwatchError};

/// A named look-ahead horizon.
///
/// Hour horizons quantize both instants to the hour, day horizons to
/// midnight, week horizons to the Monday of the ISO week; a horizon holds
/// when the quantized signed distance equals its count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Horizon {
    /// `Nh`: target lies exactly N quantized hours after the reference.
    Hours(u8),
    /// `Nd`: target lies exactly N quantized days after the reference.
    Days(u8),
    /// `Nw`: target lies exactly N ISO weeks after the reference.
    Weeks(u8),
}

impl Horizon {
    /// The fixed horizon table, in metric-name order.
    pub const ALL: [Self; 15] = [
        Self::Hours(0),
        Self::Hours(1),
        Self::Hours(2),
        Self::Hours(3),
        Self::Hours(4),
        Self::Days(0),
        Self::Days(1),
        Self::Days(2),
        Self::Days(3),
        Self::Days(4),
        Self::Weeks(0),
        Self::Weeks(1),
        Self::Weeks(2),
        Self::Weeks(3),
        Self::Weeks(4),
    ];

    /// Stable position of this horizon in [`Horizon::ALL`].
    pub fn index(self) -> usize {
        match self {
            Self::Hours(n) => n as usize,
            Self::Days(n) => 5 + n as usize,
            Self::Weeks(n) => 10 + n as usize,
        }
    }

    /// Parse a horizon name such as `"1h"`, `"0d"` or `"4w"`. Only the
    /// fifteen table entries are valid; anything else is a programming
    /// error, not a data condition.
    pub fn parse(name: &str) -> Result<Self> {
        let unknown = || SlotwatchError::UnknownHorizon(name.to_string());
        let count = |digits: &str| digits.parse::<u8>().map_err(|_| unknown());

        let horizon = if let Some(digits) = name.strip_suffix('h') {
            Self::Hours(count(digits)?)
        } else if let Some(digits) = name.strip_suffix('d') {
            Self::Days(count(digits)?)
        } else if let Some(digits) = name.strip_suffix('w') {
            Self::Weeks(count(digits)?)
        } else {
            return Err(unknown());
        };
        if !Self::ALL.contains(&horizon) {
            return Err(unknown());
        }
        Ok(horizon)
    }
}

impl std::fmt::Display for Horizon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hours(n) => write!(f, "{n}h"),
            Self::Days(n) => write!(f, "{n}d"),
            Self::Weeks(n) => write!(f, "{n}w"),
        }
    }
}

/// Typed name of one output metric series.
///
/// Four families exist: the unparameterized `changed`, `appointments`,
/// `cancellations` and `free_dates` series, plus one series per horizon for
/// free-slot exposure and for each event kind — 49 metrics in total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricKey {
    /// Rows whose raw slot sequence differed from the previous row.
    Changed,
    /// Free→booked transitions attributed to discrete booking actions.
    Appointments,
    /// Booked→free transitions attributed to discrete cancellations.
    Cancellations,
    /// Free slots exposed by the snapshot.
    FreeDates,
    /// Free slots whose target-date falls inside the horizon.
    FreeDatesWithin(Horizon),
    /// Appointments whose target-date falls inside the horizon.
    AppointmentsWithin(Horizon),
    /// Cancellations whose target-date falls inside the horizon.
    CancellationsWithin(Horizon),
}

impl MetricKey {
    /// All 49 metric names, families in declaration order, horizons in
    /// table order within a family.
    pub fn all() -> Vec<Self> {
        let mut keys = vec![Self::Changed, Self::Appointments, Self::Cancellations, Self::FreeDates];
        keys.extend(Horizon::ALL.iter().map(|h| Self::FreeDatesWithin(*h)));
        keys.extend(Horizon::ALL.iter().map(|h| Self::AppointmentsWithin(*h)));
        keys.extend(Horizon::ALL.iter().map(|h| Self::CancellationsWithin(*h)));
        keys
    }

    /// The series name used as table key in reports, e.g.
    /// `"appointments_1d"`.
    pub fn name(&self) -> String {
        match self {
            Self::Changed => "changed".to_string(),
            Self::Appointments => "appointments".to_string(),
            Self::Cancellations => "cancellations".to_string(),
            Self::FreeDates => "free_dates".to_string(),
            Self::FreeDatesWithin(h) => format!("free_dates_{h}"),
            Self::AppointmentsWithin(h) => format!("appointments_{h}"),
            Self::CancellationsWithin(h) => format!("cancellations_{h}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizon_names_round_trip() {
        for horizon in Horizon::ALL {
            let name = horizon.to_string();
            assert_eq!(Horizon::parse(&name).unwrap(), horizon, "{name} should round-trip");
        }
    }

    #[test]
    fn test_horizon_parse_rejects_unknown_names() {
        for name in ["5h", "9d", "12w", "1m", "h", "", "1", "-1d"] {
            assert!(
                matches!(Horizon::parse(name), Err(SlotwatchError::UnknownHorizon(_))),
                "name {name:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_horizon_index_matches_table_order() {
        for (i, horizon) in Horizon::ALL.iter().enumerate() {
            assert_eq!(horizon.index(), i);
        }
    }

    #[test]
    fn test_metric_registry_has_49_names() {
        let keys = MetricKey::all();
        assert_eq!(keys.len(), 49);

        let names: std::collections::BTreeSet<String> = keys.iter().map(MetricKey::name).collect();
        assert_eq!(names.len(), 49, "names must be unique");
        assert!(names.contains("changed"));
        assert!(names.contains("free_dates"));
        assert!(names.contains("appointments_0h"));
        assert!(names.contains("cancellations_4w"));
    }
}
