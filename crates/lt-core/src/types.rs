//! Core type definitions with validation.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// A millisecond timestamp could not be represented as an instant.
    #[error("timestamp out of range: {millis}ms")]
    TimestampOutOfRange { millis: i64 },
}

/// Generates a validated string newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new value after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// Name of a logical log source (a CloudWatch log group).
    ///
    /// A log source may not exist yet when tailing starts; it is created by the
    /// backend on the producer's first write.
    LogSourceName, "log source name"
);

define_string_id!(
    /// Name of one physical stream within a log source.
    StreamName, "stream name"
);

define_string_id!(
    /// Opaque pagination cursor issued by the backend.
    ///
    /// A token is only meaningful for the stream that issued it.
    ContinuationToken, "continuation token"
);

/// Stream metadata returned when listing the streams of a log source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogStreamInfo {
    pub name: StreamName,
    pub last_event_at: Option<DateTime<Utc>>,
}

/// A single log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl LogEvent {
    pub fn new(timestamp: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            message: message.into(),
        }
    }

    /// Builds an event from a Unix timestamp in milliseconds.
    pub fn from_millis(millis: i64, message: impl Into<String>) -> Result<Self, ValidationError> {
        let timestamp = DateTime::<Utc>::from_timestamp_millis(millis)
            .ok_or(ValidationError::TimestampOutOfRange { millis })?;
        Ok(Self::new(timestamp, message))
    }

    /// ISO-8601 instant with millisecond precision, e.g. `2024-01-01T00:00:00.000Z`.
    pub fn iso_timestamp(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Message with surrounding whitespace (including the trailing newline) removed.
    pub fn display_message(&self) -> &str {
        self.message.trim()
    }
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.iso_timestamp(), self.display_message())
    }
}

/// One page of events from a stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPage {
    /// Events in backend order.
    pub events: Vec<LogEvent>,
    /// Token for the next forward page. May repeat when no new events arrived.
    pub next_token: Option<ContinuationToken>,
}
