//! Arena holding every chunk of one document.
//!
//! # Responsibilities
//! - Own all chunk nodes; hand out `ChunkId` handles
//! - Resolve parent/child links by lookup, never by reference
//! - Keep top-level order and sequence numbers consistent on insert
//!
//! # Design Decisions
//! - Nodes live in a `Vec`; an id → index map gives O(1) lookup
//! - Inline children move with their parent for free because their ranges
//!   are relative to it

use std::collections::HashMap;

use crate::document::chunk::{ChunkId, DocumentChunk, TextRange};
use crate::document::error::{DocumentError, Result};
use crate::document::parser::ParsedChunk;

#[derive(Debug, Default, Clone)]
pub struct ChunkStore {
    nodes: Vec<DocumentChunk>,
    top_level: Vec<ChunkId>,
    index: HashMap<ChunkId, usize>,
}

impl ChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a fresh tree; every chunk gets a new identity.
    pub fn from_parsed(parsed: Vec<ParsedChunk>) -> Self {
        let mut store = Self::new();
        for (sequence, chunk) in parsed.into_iter().enumerate() {
            let mut node = store.build_node(chunk);
            node.sequence_number = sequence;
            store.top_level.push(node.id);
            store.push(node);
        }
        store
    }

    /// Create the node for `chunk` and store its inline children.
    fn build_node(&mut self, chunk: ParsedChunk) -> DocumentChunk {
        let mut node = DocumentChunk::new(chunk.kind, chunk.outer, chunk.inner);
        node.engine = chunk.engine;
        node.name = chunk.name;
        node.arguments = chunk.arguments;

        for (sequence, span) in chunk.inline.into_iter().enumerate() {
            let mut child = DocumentChunk::new(span.kind, span.outer, span.inner);
            child.sequence_number = sequence;
            child.is_inline = true;
            child.parent = Some(node.id);
            node.children.push(child.id);
            self.push(child);
        }
        node
    }

    fn push(&mut self, chunk: DocumentChunk) {
        self.index.insert(chunk.id, self.nodes.len());
        self.nodes.push(chunk);
    }

    pub fn len(&self) -> usize {
        self.top_level.len()
    }

    pub fn is_empty(&self) -> bool {
        self.top_level.is_empty()
    }

    pub fn get(&self, id: ChunkId) -> Result<&DocumentChunk> {
        self.index
            .get(&id)
            .and_then(|i| self.nodes.get(*i))
            .ok_or(DocumentError::UnknownChunk(id))
    }

    fn get_mut(&mut self, id: ChunkId) -> Result<&mut DocumentChunk> {
        let i = *self.index.get(&id).ok_or(DocumentError::UnknownChunk(id))?;
        self.nodes.get_mut(i).ok_or(DocumentError::UnknownChunk(id))
    }

    /// Top-level chunks in document order.
    pub fn top_level(&self) -> impl Iterator<Item = &DocumentChunk> + '_ {
        self.top_level.iter().filter_map(|id| self.get(*id).ok())
    }

    pub fn top_level_ids(&self) -> &[ChunkId] {
        &self.top_level
    }

    pub fn children(&self, id: ChunkId) -> Result<Vec<&DocumentChunk>> {
        let chunk = self.get(id)?;
        chunk.children.iter().map(|child| self.get(*child)).collect()
    }

    pub fn parent(&self, id: ChunkId) -> Result<Option<&DocumentChunk>> {
        match self.get(id)?.parent {
            Some(parent) => self.get(parent).map(Some),
            None => Ok(None),
        }
    }

    /// Absolute range of a chunk in body coordinates.
    pub fn absolute(&self, id: ChunkId, range: TextRange) -> Result<TextRange> {
        match self.get(id)?.parent {
            Some(parent) => Ok(self.get(parent)?.outer.offset_by(range)),
            None => Ok(range),
        }
    }

    /// Insert `chunk` as top-level sibling `at`, shifting every later
    /// top-level chunk by `chunk.outer.len` and renumbering siblings.
    pub fn insert_top_level(&mut self, at: usize, chunk: ParsedChunk) -> Result<ChunkId> {
        if at > self.top_level.len() {
            return Err(DocumentError::IndexOutOfBounds {
                index: at,
                count: self.top_level.len(),
            });
        }

        let delta = chunk.outer.len;
        let later: Vec<ChunkId> = self.top_level[at..].to_vec();
        for id in later {
            let node = self.get_mut(id)?;
            node.outer = node.outer.shifted(delta);
            node.inner = node.inner.shifted(delta);
        }

        let node = self.build_node(chunk);
        let id = node.id;
        self.push(node);
        self.top_level.insert(at, id);
        self.renumber()?;
        Ok(id)
    }

    /// Extend a top-level chunk by `delta` bytes at its end. The inner range
    /// grows too when it reaches the outer end (markdown).
    pub(crate) fn grow(&mut self, id: ChunkId, delta: usize) -> Result<()> {
        let node = self.get_mut(id)?;
        if node.inner.end() == node.outer.end() {
            node.inner.len += delta;
        }
        node.outer.len += delta;
        Ok(())
    }

    fn renumber(&mut self) -> Result<()> {
        let ids = self.top_level.clone();
        for (sequence, id) in ids.into_iter().enumerate() {
            self.get_mut(id)?.sequence_number = sequence;
        }
        Ok(())
    }
}
