//! Request and response bodies of the `CloudWatch` Logs JSON protocol.

use serde::{Deserialize, Serialize};

/// Sort order for `DescribeLogStreams`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrderBy {
    LogStreamName,
    LastEventTime,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeLogStreamsRequest<'a> {
    pub log_group_name: &'a str,
    pub order_by: OrderBy,
    pub descending: bool,
    pub limit: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeLogStreamsResponse {
    #[serde(default)]
    pub log_streams: Vec<LogStreamDescription>,
    #[serde(default)]
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogStreamDescription {
    #[serde(default)]
    pub log_stream_name: Option<String>,
    #[serde(default)]
    pub creation_time: Option<i64>,
    #[serde(default)]
    pub last_event_timestamp: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetLogEventsRequest<'a> {
    pub log_group_name: &'a str,
    pub log_stream_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_token: Option<&'a str>,
    pub start_from_head: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetLogEventsResponse {
    #[serde(default)]
    pub events: Vec<OutputLogEvent>,
    #[serde(default)]
    pub next_forward_token: Option<String>,
    #[serde(default)]
    pub next_backward_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputLogEvent {
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub ingestion_time: Option<i64>,
}

/// Error body returned with non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(rename = "__type", default)]
    pub kind: Option<String>,
    #[serde(alias = "Message", default)]
    pub message: Option<String>,
}
