//! Payload classification.
//!
//! # Responsibilities
//! - Decide whether a response body is raw bytes or newline-delimited JSON
//! - Reassemble JSON lines split across payloads
//! - Fall back to raw `Data` for lines that do not decode
//!
//! # Design Decisions
//! - `Auto` decides from the response `Content-Type`
//! - Hijacked streams are process output and always stay raw
//! - Values are grouped per payload: one `Json` message per decoded payload
//! - An unterminated line longer than the payload limit ends the stream with
//!   `MalformedFrame`

use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::http::message::{StreamError, StreamMessage};

/// How body payloads are presented to the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadFormat {
    /// Always deliver `Data`.
    Raw,
    /// Always decode newline-delimited JSON.
    Json,
    /// Decode JSON when the response declares `application/json`.
    #[default]
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Undecided,
    Raw,
    Json,
}

/// Converts framer output into consumer-facing messages.
#[derive(Debug)]
pub struct PayloadClassifier {
    format: PayloadFormat,
    mode: Mode,
    partial_line: BytesMut,
    max_line_bytes: usize,
    terminated: bool,
}

impl PayloadClassifier {
    /// `max_line_bytes` caps a JSON line still waiting for its newline.
    pub fn new(format: PayloadFormat, hijacked: bool, max_line_bytes: usize) -> Self {
        let mode = match (format, hijacked) {
            (_, true) | (PayloadFormat::Raw, _) => Mode::Raw,
            (PayloadFormat::Json, _) => Mode::Json,
            (PayloadFormat::Auto, _) => Mode::Undecided,
        };
        Self {
            format,
            mode,
            partial_line: BytesMut::new(),
            max_line_bytes,
            terminated: false,
        }
    }

    pub fn is_json(&self) -> bool {
        self.mode == Mode::Json
    }

    /// Classify one framer message into zero or more delivered messages.
    pub fn classify(&mut self, message: StreamMessage) -> Vec<StreamMessage> {
        if self.terminated {
            return Vec::new();
        }
        let out = self.route(message);
        self.terminated = out.last().is_some_and(StreamMessage::is_terminal);
        out
    }

    fn route(&mut self, message: StreamMessage) -> Vec<StreamMessage> {
        match message {
            StreamMessage::Headers(head) => {
                if self.mode == Mode::Undecided {
                    self.mode = if head.is_json() { Mode::Json } else { Mode::Raw };
                    tracing::debug!(format = ?self.format, json = self.is_json(), "Payload format decided");
                }
                vec![StreamMessage::Headers(head)]
            }
            StreamMessage::Data(payload) if self.mode == Mode::Json => self.decode_lines(&payload),
            StreamMessage::Complete if self.mode == Mode::Json => {
                let mut out = self.flush();
                out.push(StreamMessage::Complete);
                out
            }
            other => vec![other],
        }
    }

    fn decode_lines(&mut self, payload: &[u8]) -> Vec<StreamMessage> {
        self.partial_line.extend_from_slice(payload);

        let mut out = Vec::new();
        let mut values = Vec::new();
        while let Some(pos) = self.partial_line.iter().position(|b| *b == b'\n') {
            let line = self.partial_line.split_to(pos + 1);
            decode_line(&line[..pos], &mut values, &mut out);
        }
        if !values.is_empty() {
            out.push(StreamMessage::Json(values));
        }
        if self.partial_line.len() > self.max_line_bytes {
            tracing::warn!(buffered = self.partial_line.len(), limit = self.max_line_bytes, "JSON line exceeds limit");
            self.partial_line.clear();
            out.push(StreamMessage::Error(StreamError::malformed(format!(
                "JSON line exceeds {} bytes without a newline",
                self.max_line_bytes
            ))));
        }
        out
    }

    fn flush(&mut self) -> Vec<StreamMessage> {
        let line = self.partial_line.split();
        let mut out = Vec::new();
        let mut values = Vec::new();
        decode_line(&line, &mut values, &mut out);
        if !values.is_empty() {
            out.push(StreamMessage::Json(values));
        }
        out
    }
}

fn decode_line(line: &[u8], values: &mut Vec<Value>, out: &mut Vec<StreamMessage>) {
    let line = line.trim_ascii();
    if line.is_empty() {
        return;
    }
    match serde_json::from_slice::<Value>(line) {
        Ok(value) => values.push(value),
        Err(e) => {
            tracing::warn!(error = %e, len = line.len(), "Undecodable JSON line delivered as raw data");
            if !values.is_empty() {
                out.push(StreamMessage::Json(std::mem::take(values)));
            }
            out.push(StreamMessage::Data(Bytes::copy_from_slice(line)));
        }
    }
}
