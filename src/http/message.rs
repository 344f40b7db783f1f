//! Typed messages produced by the framer and delivered by the dispatcher.

use bytes::Bytes;
use thiserror::Error;

use crate::http::head::ResponseHead;

/// Category of a stream failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamErrorKind {
    /// The engine answered with a status outside 200..=299.
    RemoteRejected,
    /// Header, chunk or hijacked frame framing was violated.
    MalformedFrame,
    /// The byte source ended or failed before a terminal message.
    ConnectionClosed,
}

impl StreamErrorKind {
    /// Stable label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamErrorKind::RemoteRejected => "remote_rejected",
            StreamErrorKind::MalformedFrame => "malformed_frame",
            StreamErrorKind::ConnectionClosed => "connection_closed",
        }
    }
}

impl std::fmt::Display for StreamErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A terminal stream failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {description}")]
pub struct StreamError {
    pub kind: StreamErrorKind,
    pub description: String,
}

impl StreamError {
    pub fn new(kind: StreamErrorKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
        }
    }

    pub fn remote_rejected(status: u16, reason: &str) -> Self {
        Self::new(
            StreamErrorKind::RemoteRejected,
            format!("engine returned status {} {}", status, reason),
        )
    }

    pub fn malformed(description: impl Into<String>) -> Self {
        Self::new(StreamErrorKind::MalformedFrame, description)
    }

    pub fn connection_closed(description: impl Into<String>) -> Self {
        Self::new(StreamErrorKind::ConnectionClosed, description)
    }
}

/// One semantically complete unit of a response stream.
///
/// `Complete` and `Error` are terminal: nothing follows them for the same stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamMessage {
    /// Status line and headers of a successful response.
    Headers(ResponseHead),
    /// Newline-delimited JSON values decoded from one payload.
    Json(Vec<serde_json::Value>),
    /// An opaque payload (a whole chunk, a hijacked frame or an identity body).
    Data(Bytes),
    /// The stream finished cleanly.
    Complete,
    /// The stream failed.
    Error(StreamError),
}

impl StreamMessage {
    /// True for `Complete` and `Error`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamMessage::Complete | StreamMessage::Error(_))
    }

    /// Label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            StreamMessage::Headers(_) => "headers",
            StreamMessage::Json(_) => "json",
            StreamMessage::Data(_) => "data",
            StreamMessage::Complete => "complete",
            StreamMessage::Error(_) => "error",
        }
    }
}
