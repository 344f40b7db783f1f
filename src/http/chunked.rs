//! HTTP/1.1 chunked transfer-encoding decoder.
//!
//! State machine over the framer's pending buffer:
//! - `Size`: waiting for a `<hex>[;ext]CRLF` size line
//! - `Data`: size known, waiting for the payload plus its trailing CRLF
//! - `Done`: the zero-size chunk was seen
//!
//! A chunk is only released once every byte of it, including the trailing
//! CRLF, has been received.

use bytes::{Bytes, BytesMut};

use crate::http::head::{find, CRLF};
use crate::http::message::StreamError;

/// Longest size line accepted before giving up on finding its CRLF.
pub const MAX_SIZE_LINE: usize = 1024;

/// One decoded unit of a chunked body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkEvent {
    /// A complete non-empty chunk payload.
    Data(Bytes),
    /// The terminating zero-size chunk.
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Size,
    Data { len: usize },
    Done,
}

/// Incremental chunked body decoder.
#[derive(Debug)]
pub struct ChunkDecoder {
    state: State,
    max_chunk_bytes: usize,
}

impl ChunkDecoder {
    pub fn new(max_chunk_bytes: usize) -> Self {
        Self {
            state: State::Size,
            max_chunk_bytes,
        }
    }

    /// Extract the next complete unit from `buffer`, consuming its bytes.
    ///
    /// Returns `Ok(None)` when more input is needed.
    pub fn next_event(&mut self, buffer: &mut BytesMut) -> Result<Option<ChunkEvent>, StreamError> {
        match self.state {
            State::Done => Ok(None),
            State::Size => {
                let Some(line_end) = find(buffer, CRLF) else {
                    if buffer.len() > MAX_SIZE_LINE {
                        return Err(StreamError::malformed("chunk size line exceeds limit"));
                    }
                    return Ok(None);
                };
                let size = parse_size(&buffer[..line_end])?;
                let _ = buffer.split_to(line_end + CRLF.len());

                if size == 0 {
                    self.state = State::Done;
                    return Ok(Some(ChunkEvent::End));
                }
                if size > self.max_chunk_bytes {
                    return Err(StreamError::malformed(format!(
                        "chunk size {} exceeds maximum {}",
                        size, self.max_chunk_bytes
                    )));
                }

                tracing::trace!(size, "Chunk size line decoded");
                self.state = State::Data { len: size };
                self.next_event(buffer)
            }
            State::Data { len } => {
                if buffer.len() < len + CRLF.len() {
                    return Ok(None);
                }
                if &buffer[len..len + CRLF.len()] != CRLF {
                    return Err(StreamError::malformed("chunk payload not followed by CRLF"));
                }
                let payload = buffer.split_to(len).freeze();
                let _ = buffer.split_to(CRLF.len());
                self.state = State::Size;
                Ok(Some(ChunkEvent::Data(payload)))
            }
        }
    }

    /// True between chunks, i.e. nothing of the next chunk has been consumed.
    pub fn is_between_chunks(&self) -> bool {
        self.state == State::Size
    }

    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }
}

fn parse_size(line: &[u8]) -> Result<usize, StreamError> {
    let text = std::str::from_utf8(line)
        .map_err(|_| StreamError::malformed("chunk size line is not ASCII"))?;
    // Chunk extensions follow a ';' and are ignored.
    let digits = text.split(';').next().unwrap_or_default().trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(StreamError::malformed(format!("invalid chunk size {:?}", text)));
    }
    usize::from_str_radix(digits, 16)
        .map_err(|_| StreamError::malformed(format!("chunk size {:?} out of range", digits)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::message::StreamErrorKind;

    fn drain(decoder: &mut ChunkDecoder, buffer: &mut BytesMut) -> Vec<ChunkEvent> {
        let mut events = Vec::new();
        while let Some(event) = decoder.next_event(buffer).unwrap() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_decode_chunks() {
        let mut decoder = ChunkDecoder::new(1024);
        let mut buffer = BytesMut::from(&b"5\r\nhello\r\nA;name=x\r\n0123456789\r\n0\r\n\r\n"[..]);
        let events = drain(&mut decoder, &mut buffer);
        assert_eq!(
            events,
            vec![
                ChunkEvent::Data(Bytes::from_static(b"hello")),
                ChunkEvent::Data(Bytes::from_static(b"0123456789")),
                ChunkEvent::End,
            ]
        );
        assert!(decoder.is_done());
    }

    #[test]
    fn test_waits_for_trailing_crlf() {
        let mut decoder = ChunkDecoder::new(1024);
        let mut buffer = BytesMut::from(&b"5\r\nhello"[..]);
        assert!(drain(&mut decoder, &mut buffer).is_empty());
        assert!(!decoder.is_between_chunks());

        buffer.extend_from_slice(b"\r");
        assert!(drain(&mut decoder, &mut buffer).is_empty());

        buffer.extend_from_slice(b"\n");
        assert_eq!(
            drain(&mut decoder, &mut buffer),
            vec![ChunkEvent::Data(Bytes::from_static(b"hello"))]
        );
        assert!(decoder.is_between_chunks());
    }

    #[test]
    fn test_invalid_size() {
        let mut decoder = ChunkDecoder::new(1024);
        let mut buffer = BytesMut::from(&b"zz\r\n"[..]);
        let err = decoder.next_event(&mut buffer).unwrap_err();
        assert_eq!(err.kind, StreamErrorKind::MalformedFrame);
    }

    #[test]
    fn test_missing_trailing_crlf() {
        let mut decoder = ChunkDecoder::new(1024);
        let mut buffer = BytesMut::from(&b"3\r\nabcXY"[..]);
        let err = decoder.next_event(&mut buffer).unwrap_err();
        assert_eq!(err.kind, StreamErrorKind::MalformedFrame);
    }

    #[test]
    fn test_chunk_over_limit() {
        let mut decoder = ChunkDecoder::new(4);
        let mut buffer = BytesMut::from(&b"10\r\n"[..]);
        assert!(decoder.next_event(&mut buffer).is_err());
    }

    #[test]
    fn test_size_line_too_long() {
        let mut decoder = ChunkDecoder::new(4);
        let mut buffer = BytesMut::from(vec![b'1'; MAX_SIZE_LINE + 1].as_slice());
        assert!(decoder.next_event(&mut buffer).is_err());
    }
}
