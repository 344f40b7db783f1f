//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWriteExt, DuplexStream, ReadBuf};

use rc2_client_core::http::hijack::encode_frame;
use rc2_client_core::http::{OutputStream, StreamMessage};

/// Encode `chunks` with chunked transfer-encoding, including the final `0` chunk.
pub fn chunked_body(chunks: &[&[u8]]) -> Vec<u8> {
    let mut body = Vec::new();
    for chunk in chunks {
        body.extend_from_slice(format!("{:x}\r\n", chunk.len()).as_bytes());
        body.extend_from_slice(chunk);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(b"0\r\n\r\n");
    body
}

/// A complete chunked response with the given status line and extra headers.
pub fn chunked_response(status: &str, headers: &[(&str, &str)], chunks: &[&[u8]]) -> Vec<u8> {
    let mut response = format!("HTTP/1.1 {}\r\nTransfer-Encoding: chunked\r\n", status);
    for (name, value) in headers {
        response.push_str(&format!("{}: {}\r\n", name, value));
    }
    response.push_str("\r\n");

    let mut bytes = response.into_bytes();
    bytes.extend_from_slice(&chunked_body(chunks));
    bytes
}

/// Concatenated multiplexed frames.
pub fn hijacked_payload(frames: &[(OutputStream, &[u8])]) -> Vec<u8> {
    frames
        .iter()
        .flat_map(|(stream, payload)| encode_frame(*stream, payload))
        .collect()
}

/// Start a mock engine that writes `response` in `piece`-sized writes and
/// then closes its end of the connection.
pub fn start_mock_engine(response: Vec<u8>, piece: usize) -> DuplexStream {
    let (mut engine, client) = tokio::io::duplex(1024);
    tokio::spawn(async move {
        for part in response.chunks(piece.max(1)) {
            if engine.write_all(part).await.is_err() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        let _ = engine.shutdown().await;
    });
    client
}

/// Callback that records every delivered message.
pub fn collector() -> (
    Arc<Mutex<Vec<StreamMessage>>>,
    impl FnMut(StreamMessage) + Send + 'static,
) {
    let store = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&store);
    (store, move |message| sink.lock().unwrap().push(message))
}

/// Concatenate every `Data` payload.
pub fn data_bytes(messages: &[StreamMessage]) -> Vec<u8> {
    messages
        .iter()
        .filter_map(|m| match m {
            StreamMessage::Data(bytes) => Some(bytes.to_vec()),
            _ => None,
        })
        .flatten()
        .collect()
}

/// A source that yields `prefix`, then fails every later read.
pub struct FailingSource {
    prefix: Vec<u8>,
}

impl FailingSource {
    pub fn new(prefix: &[u8]) -> Self {
        Self { prefix: prefix.to_vec() }
    }
}

impl AsyncRead for FailingSource {
    fn poll_read(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        if self.prefix.is_empty() {
            return Poll::Ready(Err(io::Error::new(io::ErrorKind::ConnectionReset, "engine went away")));
        }
        let n = self.prefix.len().min(buf.remaining());
        buf.put_slice(&self.prefix[..n]);
        self.prefix.drain(..n);
        Poll::Ready(Ok(()))
    }
}
