//! Chunk tree nodes.
//!
//! # Responsibilities
//! - Describe one typed segment of a document and its two ranges
//! - Give every chunk a process-unique identity
//!
//! # Design Decisions
//! - Ranges are UTF-8 byte offsets into the document body
//! - Top-level ranges are body-absolute; inline ranges are relative to the
//!   enclosing markdown chunk's outer start
//! - Equality is identity: two chunks are equal only if they share a `ChunkId`

use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

static CHUNK_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique handle of a chunk inside a [`ChunkStore`](crate::document::ChunkStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ChunkId(u64);

impl ChunkId {
    pub fn new() -> Self {
        Self(CHUNK_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ChunkId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ChunkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "chunk-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChunkKind {
    Markdown,
    Code,
    Equation,
    InlineCode,
}

impl ChunkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkKind::Markdown => "markdown",
            ChunkKind::Code => "code",
            ChunkKind::Equation => "equation",
            ChunkKind::InlineCode => "inline code",
        }
    }
}

impl std::fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which of a chunk's two ranges to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeType {
    /// Content only, delimiters excluded.
    Inner,
    /// Content plus delimiters.
    Outer,
}

/// Half-open byte range `start..start + len`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TextRange {
    pub start: usize,
    pub len: usize,
}

impl TextRange {
    pub fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    pub fn from_bounds(start: usize, end: usize) -> Self {
        Self {
            start,
            len: end.saturating_sub(start),
        }
    }

    pub fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end()
    }

    pub fn intersects(&self, other: &TextRange) -> bool {
        if self.is_empty() || other.is_empty() {
            return other.start >= self.start && other.start <= self.end()
                || self.start >= other.start && self.start <= other.end();
        }
        self.start < other.end() && other.start < self.end()
    }

    pub fn shifted(&self, delta: usize) -> Self {
        Self::new(self.start + delta, self.len)
    }

    /// Translate a range relative to this one's start into absolute terms.
    pub fn offset_by(&self, relative: TextRange) -> Self {
        relative.shifted(self.start)
    }

    pub fn as_range(&self) -> Range<usize> {
        self.start..self.end()
    }
}

/// One node of the chunk tree.
#[derive(Debug, Clone)]
pub struct DocumentChunk {
    pub id: ChunkId,
    pub kind: ChunkKind,
    pub outer: TextRange,
    pub inner: TextRange,
    /// Position among siblings, from 0.
    pub sequence_number: usize,
    pub is_inline: bool,
    pub parent: Option<ChunkId>,
    pub children: Vec<ChunkId>,
    /// Engine of a code chunk (`r` in ```` ```{r} ````).
    pub engine: Option<String>,
    pub name: Option<String>,
    pub arguments: Option<String>,
}

impl DocumentChunk {
    pub fn new(kind: ChunkKind, outer: TextRange, inner: TextRange) -> Self {
        Self {
            id: ChunkId::new(),
            kind,
            outer,
            inner,
            sequence_number: 0,
            is_inline: kind == ChunkKind::InlineCode,
            parent: None,
            children: Vec::new(),
            engine: None,
            name: None,
            arguments: None,
        }
    }

    pub fn is_executable(&self) -> bool {
        matches!(self.kind, ChunkKind::Code | ChunkKind::InlineCode)
    }

    pub fn range(&self, range_type: RangeType) -> TextRange {
        match range_type {
            RangeType::Inner => self.inner,
            RangeType::Outer => self.outer,
        }
    }
}

impl PartialEq for DocumentChunk {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for DocumentChunk {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_equality() {
        let a = DocumentChunk::new(ChunkKind::Code, TextRange::new(0, 10), TextRange::new(2, 4));
        let b = DocumentChunk::new(ChunkKind::Code, TextRange::new(0, 10), TextRange::new(2, 4));
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_executable_kinds() {
        let range = TextRange::new(0, 1);
        assert!(DocumentChunk::new(ChunkKind::Code, range, range).is_executable());
        assert!(DocumentChunk::new(ChunkKind::InlineCode, range, range).is_executable());
        assert!(!DocumentChunk::new(ChunkKind::Equation, range, range).is_executable());
        assert!(!DocumentChunk::new(ChunkKind::Markdown, range, range).is_executable());
    }

    #[test]
    fn test_range_helpers() {
        let range = TextRange::new(4, 3);
        assert_eq!(range.end(), 7);
        assert!(range.contains(6));
        assert!(!range.contains(7));
        assert_eq!(range.shifted(2), TextRange::new(6, 3));
        assert_eq!(range.offset_by(TextRange::new(1, 1)), TextRange::new(5, 1));
        assert!(range.intersects(&TextRange::new(6, 5)));
        assert!(!range.intersects(&TextRange::new(7, 2)));
        assert!(range.intersects(&TextRange::new(5, 0)));
    }
}
