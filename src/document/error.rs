//! Document errors.

use thiserror::Error;

use crate::document::chunk::{ChunkId, ChunkKind};

/// Errors returned by document construction, edits and lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    /// A code or equation fence opened on `line` (1-based) never closes.
    #[error("unterminated {kind} fence opened on line {line}")]
    UnterminatedFence { kind: ChunkKind, line: usize },

    #[error("front matter block is never closed")]
    UnterminatedFrontMatter,

    #[error("invalid chunk header on line {line}: {header}")]
    InvalidChunkHeader { line: usize, header: String },

    #[error("no chunk with id {0}")]
    UnknownChunk(ChunkId),

    #[error("chunk index {index} out of bounds ({count} chunks)")]
    IndexOutOfBounds { index: usize, count: usize },

    #[error("{0} chunks cannot be inserted at the top level")]
    UnsupportedInsert(ChunkKind),

    #[error("initial content does not form a single {0} chunk")]
    InvalidInsertContent(ChunkKind),

    #[error("range {start}..{end} is invalid for a document of {len} bytes")]
    InvalidRange { start: usize, end: usize, len: usize },
}

impl DocumentError {
    /// True for errors raised because the source text itself is malformed.
    pub fn is_malformed_document(&self) -> bool {
        matches!(
            self,
            DocumentError::UnterminatedFence { .. }
                | DocumentError::UnterminatedFrontMatter
                | DocumentError::InvalidChunkHeader { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, DocumentError>;
