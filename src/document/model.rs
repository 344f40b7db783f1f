//! Parsed document: text buffer, front matter and chunk tree.
//!
//! # Responsibilities
//! - Parse source text into a `ChunkStore` (all-or-nothing)
//! - Resolve chunks to plain or styled content by range type
//! - Insert chunks and apply text edits
//!
//! # Data Flow
//! ```text
//! source
//!     → front_matter::split   (metadata block kept aside)
//!     → DocumentParser::parse (body → ParsedChunk list)
//!     → ChunkStore            (ids, parent links, sequence numbers)
//!
//! content(id, range type)
//!     → absolute range → body slice → attachment markers stripped
//!     → Highlighter (executable chunks, styled_content only)
//! ```
//!
//! # Design Decisions
//! - Single-threaded: mutation goes through `&mut self`, no locking
//! - Insertion shifts later ranges explicitly; text edits reparse fully
//! - Highlighting failures are logged and the unstyled text is returned

use std::sync::Arc;

use crate::document::chunk::{ChunkId, ChunkKind, DocumentChunk, RangeType, TextRange};
use crate::document::error::{DocumentError, Result};
use crate::document::front_matter::{self, FrontMatter};
use crate::document::highlight::Highlighter;
use crate::document::parser::DocumentParser;
use crate::document::store::ChunkStore;
use crate::document::text::{strip_attachments, StyledText};
use crate::observability::metrics;

pub struct Document {
    body: String,
    front_matter: Option<FrontMatter>,
    store: ChunkStore,
    highlighter: Option<Arc<dyn Highlighter>>,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("body_len", &self.body.len())
            .field("front_matter", &self.front_matter.is_some())
            .field("chunks", &self.store.len())
            .field("highlighter", &self.highlighter.is_some())
            .finish()
    }
}

impl Document {
    /// Parse `source` without a highlighter; `styled_content` returns plain text.
    pub fn parse(source: &str) -> Result<Self> {
        let (front_matter, body, store) = build(source)?;
        Ok(Self {
            body,
            front_matter,
            store,
            highlighter: None,
        })
    }

    pub fn with_highlighter(source: &str, highlighter: Arc<dyn Highlighter>) -> Result<Self> {
        let mut document = Self::parse(source)?;
        document.highlighter = Some(highlighter);
        Ok(document)
    }

    pub fn set_highlighter(&mut self, highlighter: Option<Arc<dyn Highlighter>>) {
        self.highlighter = highlighter;
    }

    /// The chunked text, front matter excluded.
    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn front_matter(&self) -> Option<&FrontMatter> {
        self.front_matter.as_ref()
    }

    /// Full source: front matter block followed by the body.
    pub fn source(&self) -> String {
        match &self.front_matter {
            Some(front) => format!("{}{}", front.block, self.body),
            None => self.body.clone(),
        }
    }

    /// The body with attachment markers removed.
    pub fn raw_string(&self) -> String {
        strip_attachments(&self.body)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn chunk(&self, id: ChunkId) -> Result<&DocumentChunk> {
        self.store.get(id)
    }

    /// Top-level chunks in document order.
    pub fn chunks(&self) -> impl Iterator<Item = &DocumentChunk> + '_ {
        self.store.top_level()
    }

    pub fn children(&self, id: ChunkId) -> Result<Vec<&DocumentChunk>> {
        self.store.children(id)
    }

    pub fn parent(&self, id: ChunkId) -> Result<Option<&DocumentChunk>> {
        self.store.parent(id)
    }

    /// Range of `id` in body coordinates (inline ranges resolved via the parent).
    pub fn absolute_range(&self, id: ChunkId, range_type: RangeType) -> Result<TextRange> {
        let chunk = self.store.get(id)?;
        self.store.absolute(id, chunk.range(range_type))
    }

    /// Top-level chunk containing body offset `offset`. The end of the body
    /// belongs to the last chunk.
    pub fn chunk_at(&self, offset: usize) -> Option<&DocumentChunk> {
        if offset == self.body.len() {
            return self.store.top_level().last();
        }
        self.store.top_level().find(|c| c.outer.contains(offset))
    }

    /// Top-level chunks intersecting `range`.
    pub fn chunks_in_range(&self, range: TextRange) -> Vec<&DocumentChunk> {
        self.store
            .top_level()
            .filter(|c| c.outer.intersects(&range))
            .collect()
    }

    pub fn content(&self, id: ChunkId, range_type: RangeType) -> Result<String> {
        let range = self.absolute_range(id, range_type)?;
        Ok(strip_attachments(&self.body[range.as_range()]))
    }

    /// Content as styled text. Executable chunks are highlighted on a private
    /// copy; the document itself is never restyled.
    pub fn styled_content(&self, id: ChunkId, range_type: RangeType) -> Result<StyledText> {
        let chunk = self.store.get(id)?;
        let mut text = StyledText::new(self.content(id, range_type)?);

        if let (true, Some(highlighter)) = (chunk.is_executable(), &self.highlighter) {
            if let Err(e) = highlighter.highlight(&mut text) {
                tracing::warn!(chunk = %id, kind = %chunk.kind, error = %e, "Highlighting failed; returning plain text");
                metrics::record_highlight_failure();
            }
        }
        Ok(text)
    }

    /// Source of an executable chunk, `None` for other kinds.
    pub fn executable_code(&self, id: ChunkId) -> Result<Option<String>> {
        if !self.store.get(id)?.is_executable() {
            return Ok(None);
        }
        self.content(id, RangeType::Inner).map(Some)
    }

    /// Insert a new top-level chunk before sibling `at` (or at the end when
    /// `at` equals the chunk count).
    pub fn insert_chunk(&mut self, kind: ChunkKind, initial_content: &str, at: usize) -> Result<ChunkId> {
        if kind == ChunkKind::InlineCode {
            return Err(DocumentError::UnsupportedInsert(kind));
        }
        let count = self.store.len();
        if at > count {
            return Err(DocumentError::IndexOutOfBounds { index: at, count });
        }

        let rendered = render_chunk(kind, initial_content);
        let mut parsed = DocumentParser::parse(&rendered).map_err(|e| {
            tracing::debug!(%kind, error = %e, "Insert content does not parse back");
            DocumentError::InvalidInsertContent(kind)
        })?;
        if parsed.len() != 1 || parsed[0].kind != kind {
            return Err(DocumentError::InvalidInsertContent(kind));
        }
        let chunk = parsed.remove(0);

        let offset = match self.store.top_level_ids().get(at) {
            Some(next) => self.store.get(*next)?.outer.start,
            None => {
                if !self.body.is_empty() && !self.body.ends_with('\n') {
                    if let Some(last) = self.store.top_level_ids().last().copied() {
                        self.store.grow(last, 1)?;
                    }
                    self.body.push('\n');
                }
                self.body.len()
            }
        };

        self.body.insert_str(offset, &rendered);
        let id = self.store.insert_top_level(at, chunk.shifted(offset))?;
        tracing::debug!(chunk = %id, %kind, at, offset, len = rendered.len(), "Chunk inserted");
        Ok(id)
    }

    /// Replace `range` of the body with `text` and reparse. On failure the
    /// document is unchanged.
    pub fn replace_text(&mut self, range: TextRange, text: &str) -> Result<()> {
        let (start, end) = (range.start, range.end());
        let len = self.body.len();
        if end > len || !self.body.is_char_boundary(start) || !self.body.is_char_boundary(end) {
            return Err(DocumentError::InvalidRange { start, end, len });
        }

        let mut body = String::with_capacity(len - range.len + text.len());
        body.push_str(&self.body[..start]);
        body.push_str(text);
        body.push_str(&self.body[end..]);

        let store = parse_body(&body)?;
        self.body = body;
        self.store = store;
        Ok(())
    }

    /// Rebuild the chunk tree from the current body. Chunk ids change.
    pub fn reparse(&mut self) -> Result<()> {
        self.store = parse_body(&self.body)?;
        Ok(())
    }
}

fn build(source: &str) -> Result<(Option<FrontMatter>, String, ChunkStore)> {
    let (front, body) = match front_matter::split(source) {
        Ok(split) => split,
        Err(e) => {
            metrics::record_document_parsed(false);
            return Err(e);
        }
    };
    let store = parse_body(body)?;
    Ok((front, body.to_string(), store))
}

fn parse_body(body: &str) -> Result<ChunkStore> {
    let result = DocumentParser::parse(body);
    metrics::record_document_parsed(result.is_ok());
    match result {
        Ok(parsed) => Ok(ChunkStore::from_parsed(parsed)),
        Err(e) => {
            tracing::debug!(error = %e, "Document rejected");
            Err(e)
        }
    }
}

fn render_chunk(kind: ChunkKind, initial: &str) -> String {
    let content = if initial.is_empty() || initial.ends_with('\n') {
        initial.to_string()
    } else {
        format!("{}\n", initial)
    };
    match kind {
        ChunkKind::Code => format!("```{{r}}\n{}```\n", content),
        ChunkKind::Equation => format!("$$\n{}$$\n", content),
        _ if content.is_empty() => "\n".to_string(),
        _ => content,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::highlight::HighlightError;
    use crate::document::text::ATTACHMENT_MARKER;

    struct FailingHighlighter;

    impl Highlighter for FailingHighlighter {
        fn highlight(&self, _text: &mut StyledText) -> std::result::Result<(), HighlightError> {
            Err(HighlightError::UnknownSyntax("broken".to_string()))
        }
    }

    #[test]
    fn test_inline_content_resolves_through_parent() {
        let doc = Document::parse("intro\n\nvalue `r x + 1` here\n").unwrap();
        let markdown = doc.chunks().next().unwrap().id;
        let inline = doc.children(markdown).unwrap()[0].id;
        assert_eq!(doc.content(inline, RangeType::Inner).unwrap(), "x + 1");
        assert_eq!(doc.content(inline, RangeType::Outer).unwrap(), "`r x + 1`");
        assert_eq!(doc.executable_code(inline).unwrap().as_deref(), Some("x + 1"));
        assert_eq!(doc.executable_code(markdown).unwrap(), None);
    }

    #[test]
    fn test_attachment_markers_stripped() {
        let source = format!("see {}\n", ATTACHMENT_MARKER);
        let doc = Document::parse(&source).unwrap();
        let id = doc.chunks().next().unwrap().id;
        assert_eq!(doc.content(id, RangeType::Outer).unwrap(), "see \n");
        assert_eq!(doc.raw_string(), "see \n");
        assert_eq!(doc.source(), source);
    }

    #[test]
    fn test_highlight_failure_returns_plain_text() {
        let doc = Document::with_highlighter("```{r}\nx\n```\n", Arc::new(FailingHighlighter)).unwrap();
        let id = doc.chunks().next().unwrap().id;
        let styled = doc.styled_content(id, RangeType::Inner).unwrap();
        assert_eq!(styled.as_str(), "x\n");
        assert!(styled.spans().is_empty());
    }

    #[test]
    fn test_insert_at_end_without_trailing_newline() {
        let mut doc = Document::parse("text").unwrap();
        let id = doc.insert_chunk(ChunkKind::Code, "y", 1).unwrap();
        assert_eq!(doc.body(), "text\n```{r}\ny\n```\n");
        assert_eq!(doc.content(id, RangeType::Inner).unwrap(), "y\n");
        let first = doc.chunks().next().unwrap().id;
        assert_eq!(doc.content(first, RangeType::Outer).unwrap(), "text\n");
    }

    #[test]
    fn test_insert_rejects_inline_and_bad_index() {
        let mut doc = Document::parse("a\n").unwrap();
        assert_eq!(
            doc.insert_chunk(ChunkKind::InlineCode, "x", 0).unwrap_err(),
            DocumentError::UnsupportedInsert(ChunkKind::InlineCode)
        );
        assert_eq!(
            doc.insert_chunk(ChunkKind::Code, "x", 3).unwrap_err(),
            DocumentError::IndexOutOfBounds { index: 3, count: 1 }
        );
        assert_eq!(
            doc.insert_chunk(ChunkKind::Code, "x\n```\n", 0).unwrap_err(),
            DocumentError::InvalidInsertContent(ChunkKind::Code)
        );
        assert_eq!(doc.body(), "a\n");
    }

    #[test]
    fn test_insert_content_that_breaks_parsing() {
        let mut doc = Document::parse("a\n").unwrap();
        let err = doc.insert_chunk(ChunkKind::Equation, "a $$ b", 1).unwrap_err();
        assert_eq!(err, DocumentError::InvalidInsertContent(ChunkKind::Equation));
        assert!(!err.is_malformed_document());
        assert_eq!(doc.body(), "a\n");
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn test_replace_text_is_all_or_nothing() {
        let mut doc = Document::parse("a\n```{r}\nx\n```\n").unwrap();
        let err = doc.replace_text(TextRange::new(0, 0), "$$\n").unwrap_err();
        assert!(err.is_malformed_document());
        assert_eq!(doc.body(), "a\n```{r}\nx\n```\n");
        assert_eq!(doc.len(), 2);

        doc.replace_text(TextRange::new(15, 0), "$$\ny\n$$\n").unwrap();
        assert_eq!(doc.len(), 3);
    }

    #[test]
    fn test_replace_text_invalid_range() {
        let mut doc = Document::parse("ab\n").unwrap();
        assert_eq!(
            doc.replace_text(TextRange::new(2, 5), "x").unwrap_err(),
            DocumentError::InvalidRange { start: 2, end: 7, len: 3 }
        );
    }

    #[test]
    fn test_chunk_lookup_by_offset() {
        let doc = Document::parse("a\n```{r}\nx\n```\n").unwrap();
        let chunks: Vec<ChunkId> = doc.chunks().map(|c| c.id).collect();
        assert_eq!(doc.chunk_at(0).unwrap().id, chunks[0]);
        assert_eq!(doc.chunk_at(2).unwrap().id, chunks[1]);
        assert_eq!(doc.chunk_at(doc.body().len()).unwrap().id, chunks[1]);
        assert!(doc.chunk_at(100).is_none());
        assert_eq!(doc.chunks_in_range(TextRange::new(1, 2)).len(), 2);
    }
}
