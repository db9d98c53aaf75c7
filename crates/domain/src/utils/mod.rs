//! Domain utilities

pub mod filter;

pub use filter::{GlobPattern, StringFilter, WeekFilter};
