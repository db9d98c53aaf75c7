//! Error types used throughout the workspace

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Slotwatch
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum SlotwatchError {
    /// A row timestamp or a header date failed to parse against the fixed
    /// snapshot format. The offending row (or batch, for header dates) is
    /// never partially applied.
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// A row's slot count does not match the batch header's date-column
    /// count. The row is rejected as a whole; slots are never truncated or
    /// padded.
    #[error("Misaligned row for '{location}': expected {expected} slots, got {actual}")]
    MisalignedRow {
        /// Location key of the rejected row.
        location: String,
        /// Date-column count from the batch header.
        expected: usize,
        /// Slot flags actually present on the row.
        actual: usize,
    },

    /// A horizon name outside the fixed table was requested.
    #[error("Unknown horizon: {0}")]
    UnknownHorizon(String),

    /// An iso-week label failed to parse.
    #[error("Invalid iso week: {0}")]
    InvalidWeek(String),

    /// A filter pattern could not be compiled.
    #[error("Invalid filter pattern: {0}")]
    InvalidFilter(String),
}

/// Result type alias for Slotwatch operations
pub type Result<T> = std::result::Result<T, SlotwatchError>;
