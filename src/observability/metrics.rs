//! Metrics collection.
//!
//! # Responsibilities
//! - Count delivered stream messages by kind
//! - Count bytes read from engine connections
//! - Count document parses and swallowed highlighting failures
//!
//! # Metrics
//! - `rc2_stream_messages_total` (counter): delivered messages by `kind`
//! - `rc2_stream_bytes_read_total` (counter): raw bytes read from sources
//! - `rc2_documents_parsed_total` (counter): parses by `outcome`
//! - `rc2_highlight_failures_total` (counter): highlighting errors
//!
//! # Design Decisions
//! - The library never installs a recorder; without one every call is a no-op
//! - Labels are static strings only

use metrics::counter;

pub fn record_stream_message(kind: &'static str) {
    counter!("rc2_stream_messages_total", "kind" => kind).increment(1);
}

pub fn record_bytes_read(bytes: usize) {
    counter!("rc2_stream_bytes_read_total").increment(bytes as u64);
}

pub fn record_document_parsed(success: bool) {
    let outcome = if success { "ok" } else { "malformed" };
    counter!("rc2_documents_parsed_total", "outcome" => outcome).increment(1);
}

pub fn record_highlight_failure() {
    counter!("rc2_highlight_failures_total").increment(1);
}
