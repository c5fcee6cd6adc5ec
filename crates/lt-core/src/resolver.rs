//! Active stream resolution for a log source.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::backend::LogBackend;
use crate::error::TailError;
use crate::sink::{Notice, TailSink};
use crate::sleep::Sleeper;
use crate::types::{LogSourceName, StreamName};
use crate::until_cancelled;

/// Maps a log source to its most recently active stream.
///
/// A source that does not exist yet is waited for indefinitely: the producer
/// (for example a freshly deployed function) may not have written its first
/// line. A source that exists but lists no streams is fatal.
#[derive(Debug)]
pub struct StreamResolver<B, S> {
    backend: Arc<B>,
    sleeper: S,
    retry_delay: Duration,
    cancel: CancellationToken,
}

impl<B: LogBackend, S: Sleeper> StreamResolver<B, S> {
    pub const fn new(
        backend: Arc<B>,
        sleeper: S,
        retry_delay: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            backend,
            sleeper,
            retry_delay,
            cancel,
        }
    }

    /// Returns the name of the stream with the latest event in `source`.
    ///
    /// Emits a [`Notice::WaitingForSource`] and sleeps `retry_delay` for every
    /// not-found reply. Never returns a not-found error.
    pub async fn resolve_active_stream(
        &self,
        source: &LogSourceName,
        sink: &mut impl TailSink,
    ) -> Result<StreamName, TailError> {
        loop {
            let listed =
                until_cancelled(&self.cancel, self.backend.list_latest_streams(source, 1)).await?;

            match listed {
                Ok(streams) => {
                    let Some(latest) = streams.into_iter().next() else {
                        return Err(TailError::NoStreamsFound {
                            source_name: source.clone(),
                        });
                    };
                    debug!(%source, stream = %latest.name, "resolved active stream");
                    return Ok(latest.name);
                }
                Err(err) if err.is_not_found() => {
                    info!(%source, retry_in = ?self.retry_delay, "log source not found yet");
                    sink.notice(&Notice::WaitingForSource {
                        source: source.clone(),
                        retry_in: self.retry_delay,
                    })?;
                    until_cancelled(&self.cancel, self.sleeper.sleep(self.retry_delay)).await?;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}
