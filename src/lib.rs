//! rc2 client core library.
//!
//! Two independent pipelines:
//! - `http` + `net`: decode container-engine API responses (chunked and
//!   multiplexed framing) from a socket and deliver them to a callback
//! - `document`: parse notebook documents into a chunk tree and serve
//!   chunk content, optionally syntax highlighted

pub mod config;
pub mod document;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::schema::ClientConfig;
pub use document::Document;
pub use http::{ByteStreamFramer, StreamMessage};
pub use lifecycle::CancelToken;
pub use net::{DispatchHandle, DispatchOptions, ResponseDispatcher};
