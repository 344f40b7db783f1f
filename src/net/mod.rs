//! Engine connection subsystem.
//!
//! # Data Flow
//! ```text
//! docker.rs (encode request, open socket)
//!     → dispatcher.rs (reader task owns the socket)
//!     → http::ByteStreamFramer (bytes → StreamMessage)
//!     → classify.rs (raw vs newline-delimited JSON)
//!     → dispatcher.rs (delivery task → consumer callback)
//!
//! Stream States:
//!     Running → Finished | Cancelled
//! ```
//!
//! # Design Decisions
//! - One reader task per connection, one delivery task per consumer
//! - Bounded channel between them applies backpressure to the socket
//! - Cancellation is checked before every handoff

pub mod classify;
pub mod connection;
pub mod dispatcher;
pub mod docker;

pub use classify::{PayloadClassifier, PayloadFormat};
pub use connection::{StreamId, StreamState};
pub use dispatcher::{DispatchHandle, DispatchOptions, ResponseDispatcher};
pub use docker::DockerRequest;
