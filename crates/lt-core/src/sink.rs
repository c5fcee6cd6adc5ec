//! Output side of the engine.

use std::io;
use std::time::Duration;

use crate::types::{LogEvent, LogSourceName, StreamName};

/// Human-readable status changes reported while tailing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The log source does not exist yet; the resolver will retry after `retry_in`.
    WaitingForSource {
        source: LogSourceName,
        retry_in: Duration,
    },
    /// Bootstrap resolved the first active stream.
    StreamFound { stream: StreamName },
    /// A newer stream replaced the active one.
    StreamSwitched { from: StreamName, to: StreamName },
}

/// Receives events and notices in the order the engine produces them.
pub trait TailSink {
    fn event(&mut self, event: &LogEvent) -> io::Result<()>;

    fn notice(&mut self, notice: &Notice) -> io::Result<()>;
}

impl<T: TailSink + ?Sized> TailSink for &mut T {
    fn event(&mut self, event: &LogEvent) -> io::Result<()> {
        (**self).event(event)
    }

    fn notice(&mut self, notice: &Notice) -> io::Result<()> {
        (**self).notice(notice)
    }
}
