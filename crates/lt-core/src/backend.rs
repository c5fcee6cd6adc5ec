//! Boundary to the remote log query API.

use std::error::Error as StdError;
use std::future::Future;

use thiserror::Error;

use crate::types::{ContinuationToken, EventPage, LogSourceName, LogStreamInfo, StreamName};

/// Errors reported by a [`LogBackend`].
#[derive(Debug, Error)]
pub enum BackendError {
    /// The requested log source (or stream) does not exist.
    #[error("not found: {message}")]
    NotFound { message: String },

    /// Any other failure: transport, throttling, authorization, malformed responses.
    #[error(transparent)]
    Other(Box<dyn StdError + Send + Sync + 'static>),
}

impl BackendError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn other(err: impl Into<Box<dyn StdError + Send + Sync + 'static>>) -> Self {
        Self::Other(err.into())
    }

    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Read-only access to a log backend.
///
/// Implementations are injected into the engine; nothing in this crate holds a
/// global client.
pub trait LogBackend: Send + Sync {
    /// Lists streams of `source`, most recent last-event time first, at most `limit`.
    fn list_latest_streams(
        &self,
        source: &LogSourceName,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<LogStreamInfo>, BackendError>> + Send;

    /// Fetches the page of `stream` that starts at `token`, or at the head of the
    /// stream when `token` is `None`.
    fn get_events(
        &self,
        source: &LogSourceName,
        stream: &StreamName,
        token: Option<&ContinuationToken>,
    ) -> impl Future<Output = Result<EventPage, BackendError>> + Send;
}
