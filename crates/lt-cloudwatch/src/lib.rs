//! `CloudWatch` Logs backend for lambda-tail.
//!
//! Speaks the `CloudWatch` Logs JSON 1.1 protocol over `reqwest` and signs
//! requests with AWS Signature Version 4. Only the two read operations the
//! tailing engine needs are implemented: `DescribeLogStreams` and
//! `GetLogEvents`.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::AUTHORIZATION;
use reqwest::{StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use lt_core::{
    BackendError, ContinuationToken, EventPage, LogBackend, LogEvent, LogSourceName,
    LogStreamInfo, StreamName,
};

mod credentials;
mod profile;
mod sigv4;
pub mod wire;

pub use credentials::{Credentials, resolve_region};

use sigv4::{SignedHeaders, Signer};
use wire::{
    DescribeLogStreamsRequest, DescribeLogStreamsResponse, ErrorBody, GetLogEventsRequest,
    GetLogEventsResponse, OrderBy,
};

/// Default request timeout for API calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const JSON_CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const TARGET_PREFIX: &str = "Logs_20140328";
const SERVICE: &str = "logs";
const RESOURCE_NOT_FOUND: &str = "ResourceNotFoundException";

/// `CloudWatch` Logs client errors.
#[derive(Debug, Error)]
pub enum CloudWatchError {
    /// Credentials are missing or blank.
    #[error("missing AWS credentials: {reason}")]
    MissingCredentials { reason: String },
    /// A shared profile file exists but could not be read.
    #[error("failed to read AWS profile file {}: {source}", path.display())]
    ProfileFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The endpoint URL could not be used.
    #[error("invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Failed to encode a request body.
    #[error("failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),
    /// API returned an error response.
    #[error("{code}: {message} (HTTP {status})")]
    Api {
        status: u16,
        code: String,
        message: String,
    },
    /// Failed to parse response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl CloudWatchError {
    /// True for `ResourceNotFoundException`, e.g. a log group that does not exist yet.
    pub fn is_resource_not_found(&self) -> bool {
        matches!(self, Self::Api { code, .. } if code == RESOURCE_NOT_FOUND)
    }
}

impl From<CloudWatchError> for BackendError {
    fn from(err: CloudWatchError) -> Self {
        if err.is_resource_not_found() {
            Self::not_found(err.to_string())
        } else {
            Self::other(err)
        }
    }
}

/// `CloudWatch` Logs API client.
///
/// # Thread Safety
///
/// The client is safe to share across tasks; the underlying HTTP connection
/// pool is reused for every call.
pub struct Client {
    http: reqwest::Client,
    endpoint: Url,
    host: String,
    signer: Signer,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.endpoint.as_str())
            .field("signer", &self.signer)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a client for the public regional endpoint,
    /// `https://logs.<region>.amazonaws.com/`.
    pub fn new(credentials: Credentials, region: &str) -> Result<Self, CloudWatchError> {
        Self::with_endpoint(
            credentials,
            region,
            &format!("https://{SERVICE}.{region}.amazonaws.com/"),
        )
    }

    /// Creates a client for a custom endpoint (`LocalStack`, VPC endpoints, tests).
    pub fn with_endpoint(
        credentials: Credentials,
        region: &str,
        endpoint: &str,
    ) -> Result<Self, CloudWatchError> {
        let invalid = |reason: &str| CloudWatchError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
        };

        if region.trim().is_empty() {
            return Err(invalid("region cannot be empty"));
        }
        let endpoint_url = Url::parse(endpoint).map_err(|err| invalid(&err.to_string()))?;
        let host_name = endpoint_url
            .host_str()
            .ok_or_else(|| invalid("endpoint has no host"))?;
        let host = match endpoint_url.port() {
            Some(port) => format!("{host_name}:{port}"),
            None => host_name.to_string(),
        };

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(CloudWatchError::ClientBuild)?;

        Ok(Self {
            http,
            endpoint: endpoint_url,
            host,
            signer: Signer::new(credentials, region.to_string(), SERVICE),
        })
    }

    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Calls `DescribeLogStreams`.
    pub async fn describe_log_streams(
        &self,
        request: &DescribeLogStreamsRequest<'_>,
    ) -> Result<DescribeLogStreamsResponse, CloudWatchError> {
        self.call("DescribeLogStreams", request).await
    }

    /// Calls `GetLogEvents`.
    pub async fn get_log_events(
        &self,
        request: &GetLogEventsRequest<'_>,
    ) -> Result<GetLogEventsResponse, CloudWatchError> {
        self.call("GetLogEvents", request).await
    }

    /// Signs a request to the configured endpoint, path included.
    fn sign(&self, target: &str, payload: &[u8], now: DateTime<Utc>) -> SignedHeaders {
        self.signer.sign(
            &self.host,
            self.endpoint.path(),
            JSON_CONTENT_TYPE,
            target,
            payload,
            now,
        )
    }

    async fn call<Req, Resp>(&self, action: &str, request: &Req) -> Result<Resp, CloudWatchError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let payload = serde_json::to_vec(request).map_err(CloudWatchError::Encode)?;
        let target = format!("{TARGET_PREFIX}.{action}");
        let signed = self.sign(&target, &payload, Utc::now());

        let mut builder = self.http.post(self.endpoint.clone());
        for (name, value) in &signed.headers {
            // reqwest derives Host from the URL.
            if *name != "host" {
                builder = builder.header(*name, value);
            }
        }
        debug!(%target, bytes = payload.len(), "sending request");
        let response = builder
            .header(AUTHORIZATION, &signed.authorization)
            .body(payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let err = parse_api_error(status, &body);
            if !err.is_resource_not_found() {
                warn!(%target, %status, "request rejected");
            }
            return Err(err);
        }

        serde_json::from_str(&body).map_err(|err| CloudWatchError::InvalidResponse(err.to_string()))
    }
}

impl LogBackend for Client {
    async fn list_latest_streams(
        &self,
        source: &LogSourceName,
        limit: u32,
    ) -> Result<Vec<LogStreamInfo>, BackendError> {
        let response = self
            .describe_log_streams(&DescribeLogStreamsRequest {
                log_group_name: source.as_str(),
                order_by: OrderBy::LastEventTime,
                descending: true,
                limit,
            })
            .await?;

        let streams = response
            .log_streams
            .into_iter()
            .map(|stream| {
                let name = stream
                    .log_stream_name
                    .and_then(|name| StreamName::new(name).ok())
                    .ok_or_else(|| {
                        CloudWatchError::InvalidResponse("log stream name missing".to_string())
                    })?;
                Ok(LogStreamInfo {
                    name,
                    last_event_at: stream
                        .last_event_timestamp
                        .and_then(DateTime::<Utc>::from_timestamp_millis),
                })
            })
            .collect::<Result<Vec<_>, CloudWatchError>>()?;
        Ok(streams)
    }

    async fn get_events(
        &self,
        source: &LogSourceName,
        stream: &StreamName,
        token: Option<&ContinuationToken>,
    ) -> Result<EventPage, BackendError> {
        // A forward token is only honoured together with startFromHead=true.
        let response = self
            .get_log_events(&GetLogEventsRequest {
                log_group_name: source.as_str(),
                log_stream_name: stream.as_str(),
                next_token: token.map(ContinuationToken::as_str),
                start_from_head: true,
            })
            .await?;
        Ok(into_event_page(response)?)
    }
}

fn into_event_page(response: GetLogEventsResponse) -> Result<EventPage, CloudWatchError> {
    let events = response
        .events
        .into_iter()
        .map(|event| {
            let millis = event.timestamp.ok_or_else(|| {
                CloudWatchError::InvalidResponse("log event timestamp missing".to_string())
            })?;
            LogEvent::from_millis(millis, event.message.unwrap_or_default())
                .map_err(|err| CloudWatchError::InvalidResponse(err.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(EventPage {
        events,
        next_token: response
            .next_forward_token
            .and_then(|token| ContinuationToken::new(token).ok()),
    })
}

fn parse_api_error(status: StatusCode, body: &str) -> CloudWatchError {
    let parsed = serde_json::from_str::<ErrorBody>(body).ok();
    let code = parsed
        .as_ref()
        .and_then(|error| error.kind.as_deref())
        // e.g. "com.amazonaws.logs#ResourceNotFoundException"
        .map(|kind| kind.rsplit('#').next().unwrap_or(kind).to_string())
        .unwrap_or_else(|| format!("HTTP{}", status.as_u16()));
    let message = parsed
        .and_then(|error| error.message)
        .unwrap_or_else(|| body.trim().to_string());

    CloudWatchError::Api {
        status: status.as_u16(),
        code,
        message,
    }
}
