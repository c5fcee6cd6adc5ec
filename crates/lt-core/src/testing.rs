//! In-memory doubles for engine tests.

use std::collections::VecDeque;
use std::future::Future;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::backend::{BackendError, LogBackend};
use crate::sink::{Notice, TailSink};
use crate::sleep::Sleeper;
use crate::types::{
    ContinuationToken, EventPage, LogEvent, LogSourceName, LogStreamInfo, StreamName,
};

/// Scripted reply to a stream listing.
#[derive(Debug, Clone)]
pub enum StreamsReply {
    Streams(Vec<&'static str>),
    NotFound,
    Fail(&'static str),
}

/// Scripted reply to an event fetch.
#[derive(Debug, Clone)]
pub enum PageReply {
    Page {
        events: Vec<(i64, &'static str)>,
        next: Option<&'static str>,
    },
    NotFound,
    Fail(&'static str),
    /// Never completes.
    Pending,
}

impl PageReply {
    pub fn page(events: &[(i64, &'static str)], next: Option<&'static str>) -> Self {
        Self::Page {
            events: events.to_vec(),
            next,
        }
    }
}

/// A recorded `get_events` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCall {
    pub stream: String,
    pub token: Option<String>,
}

impl FetchCall {
    pub fn new(stream: &str, token: Option<&str>) -> Self {
        Self {
            stream: stream.to_string(),
            token: token.map(str::to_string),
        }
    }
}

/// Backend that replays scripted replies.
///
/// Stream replies are consumed in order and the last one repeats. Page replies
/// are consumed in order; once exhausted, fetches return an empty page that
/// echoes the request token.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    streams: Mutex<VecDeque<StreamsReply>>,
    pages: Mutex<VecDeque<PageReply>>,
    fetches: Mutex<Vec<FetchCall>>,
    list_calls: Mutex<usize>,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_streams(mut self, replies: impl IntoIterator<Item = StreamsReply>) -> Self {
        self.streams = Mutex::new(replies.into_iter().collect());
        self
    }

    pub fn with_pages(mut self, replies: impl IntoIterator<Item = PageReply>) -> Self {
        self.pages = Mutex::new(replies.into_iter().collect());
        self
    }

    /// Cancels `token` while serving the `n`th fetch.
    pub fn cancel_after_fetches(mut self, n: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((n, token));
        self
    }

    pub fn fetches(&self) -> Vec<FetchCall> {
        self.fetches.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> usize {
        *self.list_calls.lock().unwrap()
    }

    fn next_streams_reply(&self) -> StreamsReply {
        let mut queue = self.streams.lock().unwrap();
        if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue
                .front()
                .cloned()
                .unwrap_or(StreamsReply::Streams(Vec::new()))
        }
    }
}

impl LogBackend for ScriptedBackend {
    async fn list_latest_streams(
        &self,
        source: &LogSourceName,
        limit: u32,
    ) -> Result<Vec<LogStreamInfo>, BackendError> {
        *self.list_calls.lock().unwrap() += 1;
        match self.next_streams_reply() {
            StreamsReply::Streams(names) => Ok(names
                .into_iter()
                .take(limit as usize)
                .map(|name| LogStreamInfo {
                    name: StreamName::new(name).unwrap(),
                    last_event_at: None,
                })
                .collect()),
            StreamsReply::NotFound => Err(BackendError::not_found(format!(
                "log group {source} does not exist"
            ))),
            StreamsReply::Fail(message) => Err(BackendError::other(message)),
        }
    }

    async fn get_events(
        &self,
        _source: &LogSourceName,
        stream: &StreamName,
        token: Option<&ContinuationToken>,
    ) -> Result<EventPage, BackendError> {
        let count = {
            let mut fetches = self.fetches.lock().unwrap();
            fetches.push(FetchCall::new(stream.as_str(), token.map(ContinuationToken::as_str)));
            fetches.len()
        };
        if let Some((n, cancel)) = &self.cancel_after {
            if count >= *n {
                cancel.cancel();
            }
        }

        let reply = self.pages.lock().unwrap().pop_front();
        match reply {
            Some(PageReply::Page { events, next }) => Ok(EventPage {
                events: events
                    .into_iter()
                    .map(|(millis, message)| LogEvent::from_millis(millis, message).unwrap())
                    .collect(),
                next_token: next.map(|t| ContinuationToken::new(t).unwrap()),
            }),
            Some(PageReply::NotFound) => Err(BackendError::not_found("log stream does not exist")),
            Some(PageReply::Fail(message)) => Err(BackendError::other(message)),
            Some(PageReply::Pending) => std::future::pending().await,
            None => Ok(EventPage {
                events: Vec::new(),
                next_token: token.cloned(),
            }),
        }
    }
}

/// Zero-delay sleeper that records requested durations once polled.
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    slept: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn durations(&self) -> Vec<Duration> {
        self.slept.lock().unwrap().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        let slept = Arc::clone(&self.slept);
        async move {
            slept.lock().unwrap().push(duration);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Event(String),
    Notice(Notice),
}

/// Sink that keeps everything it receives.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub output: Vec<Output>,
}

impl RecordingSink {
    pub fn event_lines(&self) -> Vec<String> {
        self.output
            .iter()
            .filter_map(|o| match o {
                Output::Event(line) => Some(line.clone()),
                Output::Notice(_) => None,
            })
            .collect()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.output
            .iter()
            .filter_map(|o| match o {
                Output::Notice(notice) => Some(notice.clone()),
                Output::Event(_) => None,
            })
            .collect()
    }
}

impl TailSink for RecordingSink {
    fn event(&mut self, event: &LogEvent) -> io::Result<()> {
        self.output.push(Output::Event(event.to_string()));
        Ok(())
    }

    fn notice(&mut self, notice: &Notice) -> io::Result<()> {
        self.output.push(Output::Notice(notice.clone()));
        Ok(())
    }
}
