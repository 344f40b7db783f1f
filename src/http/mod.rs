//! Engine response decoding subsystem.
//!
//! # Data Flow
//! ```text
//! raw socket deliveries
//!     → framer.rs (pending buffer, phase state machine)
//!     → head.rs (status line + headers)
//!     → chunked.rs (chunked transfer-encoding)
//!     → hijack.rs (8-byte multiplexed frames, attached I/O only)
//!     → message.rs (StreamMessage handed to the dispatcher)
//! ```
//!
//! # Design Decisions
//! - Sans-I/O: the framer never touches a socket, it only consumes byte slices
//! - Every unit is buffered until complete, regardless of delivery size
//! - Errors are in-band and terminal

pub mod chunked;
pub mod framer;
pub mod head;
pub mod hijack;
pub mod message;

pub use framer::{ByteStreamFramer, FrameState, FramerLimits};
pub use head::{HeaderMap, ResponseHead};
pub use hijack::OutputStream;
pub use message::{StreamError, StreamErrorKind, StreamMessage};
