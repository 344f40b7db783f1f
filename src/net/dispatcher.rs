//! Response dispatcher: one connection, one reader, one callback.
//!
//! # Responsibilities
//! - Own the byte source exclusively and close it when the stream ends
//! - Read on a dedicated task and feed the framer
//! - Hand classified messages to a delivery task over a bounded channel
//! - Invoke the consumer callback strictly in order, never on the reader task
//! - Honour cancellation before every handoff and every callback
//!
//! # Data Flow
//! ```text
//! source.read() ──▶ ByteStreamFramer ──▶ PayloadClassifier
//!                                              │ mpsc (bounded)
//!                                              ▼
//!                                   delivery task ──▶ callback(StreamMessage)
//! ```
//!
//! # Design Decisions
//! - `stop()` always wins: queued messages and an end-of-stream `Complete`
//!   are dropped once the token is cancelled
//! - Read errors surface as `Error(connection_closed)`; no retries here

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::StreamConfig;
use crate::http::framer::{ByteStreamFramer, FramerLimits};
use crate::http::message::{StreamError, StreamMessage};
use crate::lifecycle::cancel::CancelToken;
use crate::net::classify::{PayloadClassifier, PayloadFormat};
use crate::net::connection::{StreamId, StreamState, StreamStatus};
use crate::observability::metrics;

/// Default size of a single read from the source.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 8 * 1024;

/// Default capacity of the reader → delivery channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Per-stream dispatch settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Apply the 8-byte multiplexed framing to body payloads.
    pub hijacked: bool,
    pub payload_format: PayloadFormat,
    pub read_buffer_size: usize,
    pub channel_capacity: usize,
    pub limits: FramerLimits,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            hijacked: false,
            payload_format: PayloadFormat::default(),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            limits: FramerLimits::default(),
        }
    }
}

impl DispatchOptions {
    pub fn from_config(config: &StreamConfig) -> Self {
        Self {
            hijacked: false,
            payload_format: config.payload_format,
            read_buffer_size: config.read_buffer_size,
            channel_capacity: config.channel_capacity,
            limits: FramerLimits {
                max_header_bytes: config.max_header_bytes,
                max_payload_bytes: config.max_payload_bytes,
            },
        }
    }

    pub fn hijacked(mut self, hijacked: bool) -> Self {
        self.hijacked = hijacked;
        self
    }

    pub fn payload_format(mut self, format: PayloadFormat) -> Self {
        self.payload_format = format;
        self
    }
}

/// Owns one engine connection until it is started.
pub struct ResponseDispatcher<R> {
    id: StreamId,
    source: R,
    options: DispatchOptions,
}

impl<R> ResponseDispatcher<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    pub fn new(source: R, options: DispatchOptions) -> Self {
        Self {
            id: StreamId::new(),
            source,
            options,
        }
    }

    pub fn id(&self) -> StreamId {
        self.id
    }

    /// Start reading; callbacks run on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn start<F>(self, handler: F) -> DispatchHandle
    where
        F: FnMut(StreamMessage) + Send + 'static,
    {
        self.start_on(&Handle::current(), handler)
    }

    /// Start reading; both tasks are spawned on `runtime`.
    pub fn start_on<F>(self, runtime: &Handle, handler: F) -> DispatchHandle
    where
        F: FnMut(StreamMessage) + Send + 'static,
    {
        let cancel = CancelToken::new();
        let status = Arc::new(StreamStatus::new());
        let (tx, rx) = mpsc::channel(self.options.channel_capacity.max(1));

        tracing::debug!(
            stream_id = %self.id,
            hijacked = self.options.hijacked,
            format = ?self.options.payload_format,
            "Dispatcher starting"
        );

        let reader = runtime.spawn(read_loop(self.id, self.source, self.options, tx, cancel.clone()));
        let delivery = runtime.spawn(deliver_loop(
            self.id,
            rx,
            handler,
            cancel.clone(),
            Arc::clone(&status),
        ));

        DispatchHandle {
            id: self.id,
            cancel,
            status,
            reader,
            delivery,
        }
    }
}

/// Control handle for a started dispatcher.
#[derive(Debug)]
pub struct DispatchHandle {
    id: StreamId,
    cancel: CancelToken,
    status: Arc<StreamStatus>,
    reader: JoinHandle<()>,
    delivery: JoinHandle<()>,
}

impl DispatchHandle {
    pub fn id(&self) -> StreamId {
        self.id
    }

    /// Stop the stream: close the source and suppress every later callback.
    ///
    /// Idempotent and safe to call while a read is in flight.
    pub fn stop(&self) {
        if self.cancel.cancel() {
            tracing::info!(stream_id = %self.id, "Stream stopped by caller");
        }
        self.status.settle(StreamState::Cancelled);
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn state(&self) -> StreamState {
        self.status.get()
    }

    /// Token that stops this stream when cancelled, e.g. from a signal handler.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Wait for the reader and delivery tasks to exit.
    pub async fn join(self) -> StreamState {
        if let Err(e) = self.reader.await {
            tracing::error!(stream_id = %self.id, error = %e, "Reader task failed");
        }
        if let Err(e) = self.delivery.await {
            tracing::error!(stream_id = %self.id, error = %e, "Delivery task failed");
        }
        self.status.get()
    }
}

async fn read_loop<R>(
    id: StreamId,
    mut source: R,
    options: DispatchOptions,
    tx: mpsc::Sender<StreamMessage>,
    cancel: CancelToken,
) where
    R: AsyncRead + Unpin,
{
    let mut framer = ByteStreamFramer::with_limits(options.hijacked, options.limits);
    let mut classifier = PayloadClassifier::new(
        options.payload_format,
        options.hijacked,
        options.limits.max_payload_bytes,
    );
    let mut buf = vec![0u8; options.read_buffer_size.max(1)];

    'reading: loop {
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => break 'reading,
            result = source.read(&mut buf) => result,
        };

        let (messages, source_done) = match read {
            Ok(0) => {
                tracing::debug!(stream_id = %id, "Source reached end of stream");
                (framer.finish(), true)
            }
            Ok(n) => {
                metrics::record_bytes_read(n);
                (framer.feed(&buf[..n]), false)
            }
            Err(e) => {
                let err = StreamError::connection_closed(format!("read failed: {}", e));
                tracing::warn!(stream_id = %id, error = %e, "Source read failed");
                (vec![StreamMessage::Error(err)], true)
            }
        };

        for message in messages.into_iter().flat_map(|m| classifier.classify(m)) {
            let terminal = message.is_terminal();
            if cancel.is_cancelled() {
                break 'reading;
            }
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break 'reading,
                sent = tx.send(message) => {
                    if sent.is_err() {
                        break 'reading;
                    }
                }
            }
            if terminal {
                break 'reading;
            }
        }

        if source_done {
            break;
        }
    }

    drop(source);
    tracing::debug!(stream_id = %id, cancelled = cancel.is_cancelled(), "Byte source closed");
}

async fn deliver_loop<F>(
    id: StreamId,
    mut rx: mpsc::Receiver<StreamMessage>,
    mut handler: F,
    cancel: CancelToken,
    status: Arc<StreamStatus>,
) where
    F: FnMut(StreamMessage),
{
    loop {
        let message = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            received = rx.recv() => match received {
                Some(message) => message,
                None => break,
            },
        };
        // Re-check right before the callback so a stop that raced the
        // receive still suppresses delivery.
        if cancel.is_cancelled() {
            break;
        }

        let terminal = message.is_terminal();
        if let StreamMessage::Error(err) = &message {
            tracing::error!(stream_id = %id, kind = %err.kind, error = %err.description, "Stream terminated with error");
        }
        metrics::record_stream_message(message.kind());
        handler(message);

        if terminal {
            status.settle(StreamState::Finished);
            break;
        }
    }

    if cancel.is_cancelled() {
        status.settle(StreamState::Cancelled);
    }
    rx.close();
    tracing::debug!(stream_id = %id, state = ?status.get(), "Delivery finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;

    fn collector() -> (Arc<Mutex<Vec<StreamMessage>>>, impl FnMut(StreamMessage) + Send + 'static) {
        let store = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&store);
        (store, move |m| sink.lock().unwrap().push(m))
    }

    #[tokio::test]
    async fn test_delivers_in_order() {
        let (mut server, client) = tokio::io::duplex(64);
        let (messages, handler) = collector();
        let handle = ResponseDispatcher::new(client, DispatchOptions::default()).start(handler);

        server
            .write_all(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nabc\r\n0\r\n\r\n")
            .await
            .unwrap();

        assert_eq!(handle.join().await, StreamState::Finished);
        let messages = messages.lock().unwrap();
        assert_eq!(messages.len(), 3);
        assert!(matches!(messages[0], StreamMessage::Headers(_)));
        assert_eq!(messages[1], StreamMessage::Data(bytes::Bytes::from_static(b"abc")));
        assert_eq!(messages[2], StreamMessage::Complete);
    }

    #[tokio::test]
    async fn test_stop_suppresses_complete() {
        let (mut server, client) = tokio::io::duplex(64);
        let (messages, handler) = collector();
        let handle = ResponseDispatcher::new(client, DispatchOptions::default()).start(handler);

        server
            .write_all(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        handle.stop();
        handle.stop();
        drop(server);

        assert_eq!(handle.join().await, StreamState::Cancelled);
        let messages = messages.lock().unwrap();
        assert!(messages.iter().all(|m| !m.is_terminal()));
    }
}
