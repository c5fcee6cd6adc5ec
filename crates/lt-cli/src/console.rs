//! Terminal output for tailed events and status notices.

use std::io::{self, Write};

use colored::Colorize;
use lt_core::{LogEvent, LogSourceName, Notice, TailSink};

/// Writes one line per event and per notice, optionally coloured.
#[derive(Debug)]
pub struct ConsoleSink<W> {
    out: W,
    color: bool,
}

impl<W: Write> ConsoleSink<W> {
    pub const fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Announces the log group before bootstrap starts.
    pub fn streaming_started(&mut self, source: &LogSourceName) -> io::Result<()> {
        let name = if self.color {
            source.as_str().cyan().bold().to_string()
        } else {
            source.to_string()
        };
        writeln!(self.out, "Start streaming on {name}")?;
        self.out.flush()
    }

    fn highlight(&self, text: String) -> String {
        if self.color {
            text.yellow().to_string()
        } else {
            text
        }
    }
}

impl<W: Write> TailSink for ConsoleSink<W> {
    fn event(&mut self, event: &LogEvent) -> io::Result<()> {
        let timestamp = event.iso_timestamp();
        let timestamp = if self.color {
            timestamp.green().to_string()
        } else {
            timestamp
        };
        writeln!(self.out, "{timestamp} {}", event.display_message())?;
        self.out.flush()
    }

    fn notice(&mut self, notice: &Notice) -> io::Result<()> {
        let line = match notice {
            Notice::WaitingForSource { source, retry_in } => format!(
                "Log group {source} does not exist yet. Retrying in {}s...",
                retry_in.as_secs()
            ),
            Notice::StreamFound { stream } => {
                self.highlight(format!("New log stream found {stream}"))
            }
            Notice::StreamSwitched { to, .. } => {
                self.highlight(format!("Switch log stream to {to}"))
            }
        };
        writeln!(self.out, "{line}")?;
        self.out.flush()
    }
}
