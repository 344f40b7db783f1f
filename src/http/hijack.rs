//! Multiplexed ("hijacked") stream framing for attached process I/O.
//!
//! Each frame is an 8-byte header followed by its payload:
//!
//! ```text
//! [stream type: 1][reserved: 3][payload length: 4, big-endian][payload]
//! ```
//!
//! The decoder keeps its own buffer so a frame whose header or payload is
//! split across outer chunk boundaries is reassembled before it is released.

use bytes::{Buf, Bytes, BytesMut};

use crate::http::message::StreamError;

/// Size of the inner frame header.
pub const FRAME_HEADER_SIZE: usize = 8;

/// Which output of the attached process a frame belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl OutputStream {
    fn from_type_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(OutputStream::Stdout),
            2 => Some(OutputStream::Stderr),
            _ => None,
        }
    }
}

/// One decoded inner frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HijackFrame {
    pub stream: OutputStream,
    pub payload: Bytes,
}

#[derive(Debug, Clone, Copy)]
enum State {
    WaitingForHeader,
    WaitingForPayload { stream: OutputStream, len: usize },
}

/// Incremental decoder for hijacked stream frames.
#[derive(Debug)]
pub struct HijackDecoder {
    buffer: BytesMut,
    state: State,
    max_frame_bytes: usize,
}

impl HijackDecoder {
    pub fn new(max_frame_bytes: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            state: State::WaitingForHeader,
            max_frame_bytes,
        }
    }

    /// Append `data` and decode every complete frame into `frames`.
    ///
    /// Frames decoded before a framing error are still pushed to `frames`;
    /// nothing after the offending header is.
    pub fn push(&mut self, data: &[u8], frames: &mut Vec<HijackFrame>) -> Result<(), StreamError> {
        self.buffer.extend_from_slice(data);
        while let Some(frame) = self.try_extract_one()? {
            frames.push(frame);
        }
        Ok(())
    }

    fn try_extract_one(&mut self) -> Result<Option<HijackFrame>, StreamError> {
        match self.state {
            State::WaitingForHeader => {
                if self.buffer.len() < FRAME_HEADER_SIZE {
                    return Ok(None);
                }
                let type_byte = self.buffer[0];
                let stream = OutputStream::from_type_byte(type_byte).ok_or_else(|| {
                    StreamError::malformed(format!("invalid hijacked stream type {}", type_byte))
                })?;
                let mut header = self.buffer.split_to(FRAME_HEADER_SIZE);
                header.advance(4);
                let len = header.get_u32() as usize;
                if len > self.max_frame_bytes {
                    return Err(StreamError::malformed(format!(
                        "hijacked frame length {} exceeds maximum {}",
                        len, self.max_frame_bytes
                    )));
                }

                self.state = State::WaitingForPayload { stream, len };
                self.try_extract_one()
            }
            State::WaitingForPayload { stream, len } => {
                if self.buffer.len() < len {
                    return Ok(None);
                }
                let payload = self.buffer.split_to(len).freeze();
                self.state = State::WaitingForHeader;
                Ok(Some(HijackFrame { stream, payload }))
            }
        }
    }

    /// True when no partial frame is buffered.
    pub fn is_idle(&self) -> bool {
        matches!(self.state, State::WaitingForHeader) && self.buffer.is_empty()
    }
}

/// Encode one frame. Used by tests and by tooling that replays captured streams.
pub fn encode_frame(stream: OutputStream, payload: &[u8]) -> Vec<u8> {
    let type_byte = match stream {
        OutputStream::Stdout => 1u8,
        OutputStream::Stderr => 2u8,
    };
    let mut out = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
    out.extend_from_slice(&[type_byte, 0, 0, 0]);
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::message::StreamErrorKind;

    #[test]
    fn test_multiple_frames_in_one_push() {
        let mut data = encode_frame(OutputStream::Stdout, b"out");
        data.extend(encode_frame(OutputStream::Stderr, b"err"));

        let mut decoder = HijackDecoder::new(1024);
        let mut frames = Vec::new();
        decoder.push(&data, &mut frames).unwrap();

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].stream, OutputStream::Stdout);
        assert_eq!(frames[0].payload, Bytes::from_static(b"out"));
        assert_eq!(frames[1].stream, OutputStream::Stderr);
        assert!(decoder.is_idle());
    }

    #[test]
    fn test_split_header_and_payload() {
        let data = encode_frame(OutputStream::Stdout, b"hello world");
        let mut decoder = HijackDecoder::new(1024);
        let mut frames = Vec::new();

        decoder.push(&data[..5], &mut frames).unwrap();
        assert!(frames.is_empty());
        decoder.push(&data[5..12], &mut frames).unwrap();
        assert!(frames.is_empty());
        assert!(!decoder.is_idle());
        decoder.push(&data[12..], &mut frames).unwrap();

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload, Bytes::from_static(b"hello world"));
    }

    #[test]
    fn test_invalid_type_keeps_earlier_frames() {
        let mut data = encode_frame(OutputStream::Stdout, b"ok");
        data.extend_from_slice(&[3, 0, 0, 0, 0, 0, 0, 1, b'x']);
        data.extend(encode_frame(OutputStream::Stdout, b"never"));

        let mut decoder = HijackDecoder::new(1024);
        let mut frames = Vec::new();
        let err = decoder.push(&data, &mut frames).unwrap_err();

        assert_eq!(err.kind, StreamErrorKind::MalformedFrame);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload, Bytes::from_static(b"ok"));
    }

    #[test]
    fn test_empty_payload_frame() {
        let data = encode_frame(OutputStream::Stderr, b"");
        let mut decoder = HijackDecoder::new(1024);
        let mut frames = Vec::new();
        decoder.push(&data, &mut frames).unwrap();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].payload.is_empty());
    }
}
