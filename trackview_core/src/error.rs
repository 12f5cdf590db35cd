//! Error types for the TrackView core.

use thiserror::Error;

/// Errors raised while reading user-facing selections.
///
/// Record processing itself never fails; these only cover the closed
/// enumerations parsed from text (CLI flags, query strings).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrackViewError {
    /// Metric name is not one of the known kinds
    #[error("Unknown metric: {0} (expected count or x_pos)")]
    UnknownMetric(String),

    /// Bucket width could not be read
    #[error("Invalid bucket width: {0}")]
    InvalidBucketWidth(String),
}
