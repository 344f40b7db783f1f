//! Notebook document subsystem.
//!
//! # Data Flow
//! ```text
//! source text
//!     → front_matter.rs (leading metadata block split off)
//!     → parser.rs (code / equation / markdown chunks)
//!     → inline.rs (inline code and equations inside markdown)
//!     → store.rs (arena of chunks with ids and parent links)
//!     → model.rs (Document: content lookup, insertion, edits)
//!     → highlight.rs (styling for executable chunks)
//! ```
//!
//! # Design Decisions
//! - Chunks are addressed by `ChunkId`, never by reference
//! - Parsing is synchronous and all-or-nothing
//! - Highlighting is configured per document, there is no global theme

pub mod chunk;
pub mod error;
pub mod front_matter;
pub mod highlight;
pub mod inline;
pub mod model;
pub mod parser;
pub mod store;
pub mod text;

pub use chunk::{ChunkId, ChunkKind, DocumentChunk, RangeType, TextRange};
pub use error::DocumentError;
pub use front_matter::FrontMatter;
pub use highlight::{HighlightConfig, HighlightError, Highlighter, SyntectHighlighter};
pub use model::Document;
pub use parser::{DocumentParser, ParsedChunk};
pub use store::ChunkStore;
pub use text::{StyledText, ATTACHMENT_MARKER};
