//! Error types for dataset handling, replay and export.

use thiserror::Error;
use trackview_env::EnvError;

/// Errors raised by the replay crate.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("PNG encoding error: {0}")]
    Png(#[from] png::EncodingError),

    #[error(transparent)]
    Env(#[from] EnvError),

    /// Input parsed as JSON but is not shaped like a dataset
    #[error("Invalid dataset: {0}")]
    Dataset(String),
}
