//! Engine errors.

use std::io;

use thiserror::Error;

use crate::backend::BackendError;
use crate::types::LogSourceName;

/// Errors that end a tail run.
#[derive(Debug, Error)]
pub enum TailError {
    /// The log source exists but holds no streams.
    #[error("log source {source_name} exists but has no log streams")]
    NoStreamsFound { source_name: LogSourceName },

    /// The backend failed outside the bootstrap not-found case.
    #[error("log backend error: {0}")]
    Backend(#[from] BackendError),

    /// Writing to the sink failed.
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),

    /// The run was cancelled before completing.
    #[error("cancelled")]
    Cancelled,
}
