//! Error types for the TrackView environment abstraction.

use thiserror::Error;

/// Errors that can occur in the environment abstraction layer.
#[derive(Debug, Error)]
pub enum EnvError {
    /// Task was cancelled before it finished
    #[error("Task cancelled: {0}")]
    Cancelled(String),

    /// Operation timed out
    #[error("Timeout after {0}ms")]
    Timeout(u64),
}

impl EnvError {
    /// Creates a cancellation error for the named task.
    pub fn cancelled(task: impl std::fmt::Display) -> Self {
        Self::Cancelled(task.to_string())
    }
}
