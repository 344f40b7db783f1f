//! Stream identity and lifecycle state.
//!
//! # Responsibilities
//! - Generate unique stream IDs for log correlation
//! - Track a dispatcher's state (Running → Finished | Cancelled)

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Global atomic counter for stream IDs.
/// Relaxed ordering is enough since we only need uniqueness.
static STREAM_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for one dispatched response stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamId(u64);

impl StreamId {
    /// Generate a new unique stream ID.
    pub fn new() -> Self {
        Self(STREAM_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for StreamId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stream-{}", self.0)
    }
}

/// Lifecycle state of a dispatched stream.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Reading and delivering messages.
    Running = 0,
    /// A terminal message (`Complete` or `Error`) was delivered.
    Finished = 1,
    /// Stopped by the caller; later messages were suppressed.
    Cancelled = 2,
}

impl From<u8> for StreamState {
    fn from(val: u8) -> Self {
        match val {
            1 => StreamState::Finished,
            2 => StreamState::Cancelled,
            _ => StreamState::Running,
        }
    }
}

/// Shared, atomically updated [`StreamState`].
///
/// Only the first transition out of `Running` sticks.
#[derive(Debug)]
pub struct StreamStatus {
    state: AtomicU8,
}

impl StreamStatus {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(StreamState::Running as u8),
        }
    }

    pub fn get(&self) -> StreamState {
        StreamState::from(self.state.load(Ordering::SeqCst))
    }

    /// Leave `Running` for `next`. Returns false if another transition won.
    pub fn settle(&self, next: StreamState) -> bool {
        self.state
            .compare_exchange(
                StreamState::Running as u8,
                next as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }
}

impl Default for StreamStatus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_id_unique() {
        let id1 = StreamId::new();
        let id2 = StreamId::new();
        assert_ne!(id1, id2);
        assert!(id1.to_string().starts_with("stream-"));
    }

    #[test]
    fn stream_status_first_transition_wins() {
        let status = StreamStatus::new();
        assert_eq!(status.get(), StreamState::Running);

        assert!(status.settle(StreamState::Cancelled));
        assert!(!status.settle(StreamState::Finished));
        assert_eq!(status.get(), StreamState::Cancelled);
    }
}
