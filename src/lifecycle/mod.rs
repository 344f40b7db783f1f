//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Cancellation (cancel.rs):
//!     DispatchHandle::stop() / signal → CancelToken → reader + delivery tasks exit
//!
//! Signals (signals.rs):
//!     SIGINT → cancel the active stream
//! ```
//!
//! # Design Decisions
//! - Cancellation is a flag plus a wakeup, checked before every handoff
//! - Cancel is idempotent and always wins over pending deliveries

pub mod cancel;
pub mod signals;

pub use cancel::CancelToken;
