//! The tail loop: poll the active stream, print new events, follow rotations.

use std::num::NonZeroU64;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::backend::LogBackend;
use crate::error::TailError;
use crate::resolver::StreamResolver;
use crate::sink::{Notice, TailSink};
use crate::sleep::Sleeper;
use crate::types::{ContinuationToken, LogSourceName, StreamName};
use crate::until_cancelled;

/// Default delay between fetches.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Default delay between resolution attempts while the log source is missing.
pub const DEFAULT_BOOTSTRAP_RETRY: Duration = Duration::from_secs(10);
/// Default number of iterations between rotation checks.
pub const DEFAULT_ROTATION_CHECK_EVERY: NonZeroU64 = NonZeroU64::new(5).unwrap();

/// Timing knobs for a tail run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TailSettings {
    pub poll_interval: Duration,
    pub rotation_check_every: NonZeroU64,
    pub bootstrap_retry: Duration,
}

impl Default for TailSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            rotation_check_every: DEFAULT_ROTATION_CHECK_EVERY,
            bootstrap_retry: DEFAULT_BOOTSTRAP_RETRY,
        }
    }
}

/// Mutable state of one tail run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailSession {
    log_source: LogSourceName,
    active_stream: StreamName,
    continuation_token: Option<ContinuationToken>,
    iteration: u64,
}

impl TailSession {
    pub const fn new(log_source: LogSourceName, active_stream: StreamName) -> Self {
        Self {
            log_source,
            active_stream,
            continuation_token: None,
            iteration: 0,
        }
    }

    pub const fn log_source(&self) -> &LogSourceName {
        &self.log_source
    }

    pub const fn active_stream(&self) -> &StreamName {
        &self.active_stream
    }

    pub const fn continuation_token(&self) -> Option<&ContinuationToken> {
        self.continuation_token.as_ref()
    }

    pub const fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Adopts `stream` as the active stream. The old token belongs to the old
    /// stream, so reading restarts from the head of the new one.
    fn switch_to(&mut self, stream: StreamName) {
        self.active_stream = stream;
        self.continuation_token = None;
    }
}

/// Polls the active stream of a log source until cancelled.
#[derive(Debug)]
pub struct TailLoop<B, S> {
    backend: Arc<B>,
    sleeper: S,
    resolver: StreamResolver<B, S>,
    settings: TailSettings,
    cancel: CancellationToken,
}

impl<B: LogBackend, S: Sleeper + Clone> TailLoop<B, S> {
    pub fn new(
        backend: Arc<B>,
        sleeper: S,
        settings: TailSettings,
        cancel: CancellationToken,
    ) -> Self {
        let resolver = StreamResolver::new(
            Arc::clone(&backend),
            sleeper.clone(),
            settings.bootstrap_retry,
            cancel.clone(),
        );
        Self {
            backend,
            sleeper,
            resolver,
            settings,
            cancel,
        }
    }

    pub const fn resolver(&self) -> &StreamResolver<B, S> {
        &self.resolver
    }

    pub const fn settings(&self) -> &TailSettings {
        &self.settings
    }

    /// Bootstraps the active stream for `source`, then tails it.
    ///
    /// Returns `Ok(())` only when cancelled.
    pub async fn follow(
        &self,
        source: &LogSourceName,
        sink: &mut impl TailSink,
    ) -> Result<(), TailError> {
        let stream = match self.resolver.resolve_active_stream(source, sink).await {
            Ok(stream) => stream,
            Err(TailError::Cancelled) => return Ok(()),
            Err(err) => return Err(err),
        };
        sink.notice(&Notice::StreamFound {
            stream: stream.clone(),
        })?;
        self.run(source.clone(), stream, sink).await
    }

    /// Tails `initial_stream` of `source`, switching streams on rotation.
    ///
    /// Returns `Ok(())` only when cancelled.
    pub async fn run(
        &self,
        source: LogSourceName,
        initial_stream: StreamName,
        sink: &mut impl TailSink,
    ) -> Result<(), TailError> {
        let mut session = TailSession::new(source, initial_stream);
        info!(
            source = %session.log_source,
            stream = %session.active_stream,
            "streaming started"
        );
        loop {
            match self.step(&mut session, sink).await {
                Ok(()) => {}
                Err(TailError::Cancelled) => {
                    debug!(iteration = session.iteration, "tail cancelled");
                    return Ok(());
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Runs a single fetch, print, sleep, re-check iteration.
    pub async fn step(
        &self,
        session: &mut TailSession,
        sink: &mut impl TailSink,
    ) -> Result<(), TailError> {
        let page = until_cancelled(
            &self.cancel,
            self.backend.get_events(
                &session.log_source,
                &session.active_stream,
                session.continuation_token.as_ref(),
            ),
        )
        .await??;

        debug!(
            stream = %session.active_stream,
            events = page.events.len(),
            "fetched page"
        );
        for event in &page.events {
            sink.event(event)?;
        }
        session.continuation_token = page.next_token;

        until_cancelled(&self.cancel, self.sleeper.sleep(self.settings.poll_interval)).await?;

        session.iteration += 1;
        if session.iteration % self.settings.rotation_check_every.get() == 0 {
            let latest = self
                .resolver
                .resolve_active_stream(&session.log_source, sink)
                .await?;
            if latest != session.active_stream {
                info!(from = %session.active_stream, to = %latest, "log stream rotated");
                sink.notice(&Notice::StreamSwitched {
                    from: session.active_stream.clone(),
                    to: latest.clone(),
                })?;
                session.switch_to(latest);
            }
        }

        Ok(())
    }
}
