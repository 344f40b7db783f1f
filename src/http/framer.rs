//! Incremental response framer.
//!
//! # Responsibilities
//! - Accumulate raw deliveries of any size into protocol units
//! - Decode the response head, then a chunked, length-delimited or
//!   read-until-close body
//! - Apply hijacked inner framing to body payloads when requested
//! - Turn every framing violation into a single terminal error
//!
//! # Data Flow
//! ```text
//! feed(bytes)
//!     → pending buffer
//!     → head.rs (status line, headers)            → Headers / Error(remote_rejected)
//!     → chunked.rs (size line, payload, CRLF)     → Data / Complete
//!     → hijack.rs (8-byte inner frames, optional) → Data per frame
//! finish()
//!     → Complete on a clean boundary, Error(connection_closed) otherwise
//! ```
//!
//! # Design Decisions
//! - Nothing is emitted for a unit until it is complete; no partial `Data`
//! - After `Complete` or `Error` every call is a no-op

use bytes::{Bytes, BytesMut};

use crate::http::chunked::{ChunkDecoder, ChunkEvent};
use crate::http::head::{find, parse_head, HEAD_TERMINATOR};
use crate::http::hijack::HijackDecoder;
use crate::http::message::{StreamError, StreamMessage};

/// Default limit for the header block.
pub const DEFAULT_MAX_HEADER_BYTES: usize = 64 * 1024;

/// Default limit for a single payload (chunk, frame or identity body).
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Buffering limits for a framer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramerLimits {
    pub max_header_bytes: usize,
    pub max_payload_bytes: usize,
}

impl Default for FramerLimits {
    fn default() -> Self {
        Self {
            max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}

/// Per-connection framing state.
#[derive(Debug, Default)]
pub struct FrameState {
    pub header_received: bool,
    pub is_chunked: bool,
    pub is_hijacked: bool,
    /// Unconsumed tail from earlier deliveries.
    pub pending: BytesMut,
}

#[derive(Debug)]
enum Body {
    Head,
    Chunked(ChunkDecoder),
    Length { remaining: usize },
    UntilClose,
    Done,
}

/// Decodes a response from raw deliveries into [`StreamMessage`]s.
#[derive(Debug)]
pub struct ByteStreamFramer {
    state: FrameState,
    body: Body,
    hijack: Option<HijackDecoder>,
    limits: FramerLimits,
}

impl ByteStreamFramer {
    pub fn new(hijacked: bool) -> Self {
        Self::with_limits(hijacked, FramerLimits::default())
    }

    pub fn with_limits(hijacked: bool, limits: FramerLimits) -> Self {
        Self {
            state: FrameState {
                is_hijacked: hijacked,
                ..FrameState::default()
            },
            body: Body::Head,
            hijack: None,
            limits,
        }
    }

    pub fn state(&self) -> &FrameState {
        &self.state
    }

    /// True once `Complete` or `Error` has been produced.
    pub fn is_terminated(&self) -> bool {
        matches!(self.body, Body::Done)
    }

    /// Consume one delivery and return every message it completes.
    pub fn feed(&mut self, data: &[u8]) -> Vec<StreamMessage> {
        let mut out = Vec::new();
        if self.is_terminated() {
            return out;
        }
        self.state.pending.extend_from_slice(data);
        if let Err(err) = self.advance(&mut out) {
            self.fail(err, &mut out);
        }
        out
    }

    /// Signal that the byte source reached end-of-stream.
    pub fn finish(&mut self) -> Vec<StreamMessage> {
        let mut out = Vec::new();
        let hijack_idle = self.hijack.as_ref().map(HijackDecoder::is_idle).unwrap_or(true);

        let result = match &self.body {
            Body::Done => return out,
            Body::Head => Err(StreamError::connection_closed(
                "source closed before the response head was complete",
            )),
            Body::Chunked(decoder) => {
                if decoder.is_between_chunks() && self.state.pending.is_empty() && hijack_idle {
                    Ok(())
                } else {
                    Err(StreamError::connection_closed(
                        "source closed inside a chunk",
                    ))
                }
            }
            Body::Length { remaining } => Err(StreamError::connection_closed(format!(
                "source closed with {} body bytes outstanding",
                remaining
            ))),
            Body::UntilClose => {
                if self.hijack.is_some() {
                    if hijack_idle {
                        Ok(())
                    } else {
                        Err(StreamError::connection_closed(
                            "source closed inside a hijacked frame",
                        ))
                    }
                } else {
                    let payload = self.state.pending.split().freeze();
                    if !payload.is_empty() {
                        out.push(StreamMessage::Data(payload));
                    }
                    Ok(())
                }
            }
        };

        match result {
            Ok(()) => self.complete(&mut out),
            Err(err) => self.fail(err, &mut out),
        }
        out
    }

    fn advance(&mut self, out: &mut Vec<StreamMessage>) -> Result<(), StreamError> {
        if matches!(self.body, Body::Head) && !self.read_head(out)? {
            return Ok(());
        }

        match self.body {
            Body::Head | Body::Done => Ok(()),
            Body::Chunked(_) => self.read_chunks(out),
            Body::Length { .. } => self.read_length_delimited(out),
            Body::UntilClose => self.read_until_close(out),
        }
    }

    /// Returns true once the head has been consumed and the body may follow.
    fn read_head(&mut self, out: &mut Vec<StreamMessage>) -> Result<bool, StreamError> {
        let Some(end) = find(&self.state.pending, HEAD_TERMINATOR) else {
            if self.state.pending.len() > self.limits.max_header_bytes {
                return Err(StreamError::malformed(format!(
                    "response head exceeds {} bytes",
                    self.limits.max_header_bytes
                )));
            }
            return Ok(false);
        };

        let block = self.state.pending.split_to(end);
        let _ = self.state.pending.split_to(HEAD_TERMINATOR.len());
        let head = parse_head(&block)?;
        if !head.is_success() {
            return Err(StreamError::remote_rejected(head.status, &head.reason));
        }

        self.state.header_received = true;
        self.state.is_chunked = head.is_chunked();
        self.body = if self.state.is_chunked {
            Body::Chunked(ChunkDecoder::new(self.limits.max_payload_bytes))
        } else if let Some(len) = head.content_length() {
            if !self.state.is_hijacked && len > self.limits.max_payload_bytes {
                return Err(StreamError::malformed(format!(
                    "content length {} exceeds maximum {}",
                    len, self.limits.max_payload_bytes
                )));
            }
            Body::Length { remaining: len }
        } else {
            Body::UntilClose
        };
        if self.state.is_hijacked {
            self.hijack = Some(HijackDecoder::new(self.limits.max_payload_bytes));
        }

        tracing::debug!(
            status = head.status,
            chunked = self.state.is_chunked,
            hijacked = self.state.is_hijacked,
            "Response head decoded"
        );
        out.push(StreamMessage::Headers(head));

        if matches!(self.body, Body::Length { remaining: 0 }) {
            self.end_of_body(out)?;
            return Ok(false);
        }
        Ok(true)
    }

    fn read_chunks(&mut self, out: &mut Vec<StreamMessage>) -> Result<(), StreamError> {
        loop {
            let Body::Chunked(decoder) = &mut self.body else {
                return Ok(());
            };
            match decoder.next_event(&mut self.state.pending)? {
                Some(ChunkEvent::Data(payload)) => self.emit_payload(payload, out)?,
                Some(ChunkEvent::End) => return self.end_of_body(out),
                None => return Ok(()),
            }
        }
    }

    fn read_length_delimited(&mut self, out: &mut Vec<StreamMessage>) -> Result<(), StreamError> {
        let Body::Length { remaining } = self.body else {
            return Ok(());
        };

        if self.hijack.is_some() {
            let take = remaining.min(self.state.pending.len());
            let slice = self.state.pending.split_to(take).freeze();
            self.body = Body::Length {
                remaining: remaining - take,
            };
            self.emit_payload(slice, out)?;
        } else if self.state.pending.len() >= remaining {
            let payload = self.state.pending.split_to(remaining).freeze();
            self.body = Body::Length { remaining: 0 };
            out.push(StreamMessage::Data(payload));
        } else {
            return Ok(());
        }

        if matches!(self.body, Body::Length { remaining: 0 }) {
            self.end_of_body(out)?;
        }
        Ok(())
    }

    fn read_until_close(&mut self, out: &mut Vec<StreamMessage>) -> Result<(), StreamError> {
        if self.hijack.is_some() {
            let available = self.state.pending.split().freeze();
            return self.emit_payload(available, out);
        }
        if self.state.pending.len() > self.limits.max_payload_bytes {
            return Err(StreamError::malformed(format!(
                "unframed body exceeds {} bytes",
                self.limits.max_payload_bytes
            )));
        }
        Ok(())
    }

    fn emit_payload(&mut self, payload: Bytes, out: &mut Vec<StreamMessage>) -> Result<(), StreamError> {
        match &mut self.hijack {
            Some(decoder) => {
                let mut frames = Vec::new();
                let result = decoder.push(&payload, &mut frames);
                for frame in frames {
                    tracing::trace!(stream = ?frame.stream, len = frame.payload.len(), "Hijacked frame decoded");
                    out.push(StreamMessage::Data(frame.payload));
                }
                result
            }
            None => {
                out.push(StreamMessage::Data(payload));
                Ok(())
            }
        }
    }

    fn end_of_body(&mut self, out: &mut Vec<StreamMessage>) -> Result<(), StreamError> {
        if let Some(decoder) = &self.hijack {
            if !decoder.is_idle() {
                return Err(StreamError::malformed("body ended inside a hijacked frame"));
            }
        }
        self.complete(out);
        Ok(())
    }

    fn complete(&mut self, out: &mut Vec<StreamMessage>) {
        tracing::debug!("Response stream complete");
        self.body = Body::Done;
        self.state.pending.clear();
        out.push(StreamMessage::Complete);
    }

    fn fail(&mut self, err: StreamError, out: &mut Vec<StreamMessage>) {
        tracing::warn!(kind = %err.kind, error = %err.description, "Response stream failed");
        self.body = Body::Done;
        self.state.pending.clear();
        out.push(StreamMessage::Error(err));
    }
}
