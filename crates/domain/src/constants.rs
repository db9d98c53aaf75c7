//! Domain constants
//!
//! Centralized location for the fixed parameters of the snapshot format and
//! the differencing rules.

/// Width of one attribution bucket. Every event a snapshot row produces is
/// attributed to the row's own timestamp floored to this boundary.
pub const BUCKET_MINUTES: u32 = 15;

/// Two snapshots of the same location further apart than this are not
/// treated as consecutive; apparent free/booked flips across such a gap are
/// not attributed to discrete booking actions.
pub const ADJACENCY_WINDOW_SECS: i64 = 16 * 60;

/// Fixed timestamp format of snapshot rows and target-date header labels.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Separator joining `source_id` and `location_id` into a location key.
pub const LOCATION_KEY_SEPARATOR: char = '/';
