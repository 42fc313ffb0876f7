//! Constants for engagement map construction and lookup
//!
//! These values match the reference dataset release so that maps built from
//! the same corpus are interchangeable.

// Bin assignment parameters

/// Number of evenly spaced split candidates in log10(duration) space.
pub const BIN_NUMBER: usize = 1000;

/// Minimum observations a bin must hold before it may be closed.
///
/// Bins below this floor keep absorbing observations past their ideal split
/// point; percentiles over fewer samples are statistically unreliable.
pub const MIN_BIN_SIZE: usize = 50;

/// Lower end of the split-candidate range: log10(10 seconds).
pub const LOG_DURATION_LOWER: f64 = 1.0;

/// Upper end of the split-candidate range: log10(100,000 seconds).
pub const LOG_DURATION_UPPER: f64 = 5.0;

// Percentile table parameters

/// Number of percentile samples stored per bin (the 0.0th, 0.1th, ..., 99.9th).
pub const PERCENTILE_COUNT: usize = 1000;

// Formatted dataset columns

/// Zero-based column index of `duration` in a formatted record.
pub const FIELD_DURATION: usize = 2;

/// Zero-based column index of `wp30` in a formatted record.
pub const FIELD_WATCH_PERCENTAGE: usize = 10;

/// Number of tab-separated columns in a formatted record before relabeling.
pub const FORMATTED_FIELD_COUNT: usize = 14;
