//! Live log tailing engine.
//!
//! This crate contains the backend-agnostic pieces of lambda-tail:
//! - Stream resolution: finding the active stream of a log source, waiting for
//!   the source to appear
//! - The tail loop: paginating through new events with a continuation token and
//!   switching streams when the source rotates
//!
//! The log backend, the sleep clock and the output sink are injected, so the
//! engine runs unchanged against `CloudWatch` or an in-memory script.

use std::future::Future;

use tokio_util::sync::CancellationToken;

pub mod backend;
mod error;
pub mod resolver;
pub mod sink;
pub mod sleep;
pub mod tail;
pub mod types;

#[cfg(test)]
mod testing;

pub use backend::{BackendError, LogBackend};
pub use error::TailError;
pub use resolver::StreamResolver;
pub use sink::{Notice, TailSink};
pub use sleep::{Sleeper, TokioSleeper};
pub use tail::{TailLoop, TailSession, TailSettings};
pub use types::{
    ContinuationToken, EventPage, LogEvent, LogSourceName, LogStreamInfo, StreamName,
    ValidationError,
};

/// Drives `fut` unless `cancel` fires first.
async fn until_cancelled<F: Future>(
    cancel: &CancellationToken,
    fut: F,
) -> Result<F::Output, TailError> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(TailError::Cancelled),
        out = fut => Ok(out),
    }
}
