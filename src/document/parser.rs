//! Document body → ordered chunk list.
//!
//! # Responsibilities
//! - Recognise code chunks (```` ```{engine name, args} ````), equation
//!   blocks (`$$`) and the markdown runs between them
//! - Collect inline spans for every markdown run
//! - Reject malformed fences and chunk headers
//!
//! # Data Flow
//! ```text
//! body text
//!     → line scan (fence state machine)
//!     → ParsedChunk { outer, inner, header metadata }
//!     → inline.rs (markdown runs only)
//!     → ChunkStore::from_parsed
//! ```
//!
//! # Design Decisions
//! - An unclosed code or equation fence fails the whole parse
//! - Plain fenced blocks (no `{…}` header) are markdown
//! - Top-level outer ranges tile the body with no gaps

use crate::document::chunk::{ChunkKind, TextRange};
use crate::document::error::{DocumentError, Result};
use crate::document::inline::{fence_marker, scan_inline, InlineSpan};

/// A top-level chunk as recognised by the parser, before it gets an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedChunk {
    pub kind: ChunkKind,
    pub outer: TextRange,
    pub inner: TextRange,
    pub engine: Option<String>,
    pub name: Option<String>,
    pub arguments: Option<String>,
    /// Inline spans, relative to `outer.start`.
    pub inline: Vec<InlineSpan>,
}

impl ParsedChunk {
    fn markdown(body: &str, range: TextRange) -> Self {
        Self {
            kind: ChunkKind::Markdown,
            outer: range,
            inner: range,
            engine: None,
            name: None,
            arguments: None,
            inline: scan_inline(&body[range.as_range()]),
        }
    }

    fn block(kind: ChunkKind, outer: TextRange, inner: TextRange) -> Self {
        Self {
            kind,
            outer,
            inner,
            engine: None,
            name: None,
            arguments: None,
            inline: Vec::new(),
        }
    }

    /// Move the chunk by `delta` bytes; inline spans follow implicitly.
    pub fn shifted(mut self, delta: usize) -> Self {
        self.outer = self.outer.shifted(delta);
        self.inner = self.inner.shifted(delta);
        self
    }
}

#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    /// 1-based line number
    number: usize,
    start: usize,
    text: &'a str,
}

impl Line<'_> {
    fn end(&self) -> usize {
        self.start + self.text.len()
    }

    fn content(&self) -> &str {
        self.text.trim_end_matches('\n').trim_end_matches('\r')
    }
}

/// Parses a document body (front matter already removed).
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentParser;

impl DocumentParser {
    pub fn parse(body: &str) -> Result<Vec<ParsedChunk>> {
        let lines: Vec<Line<'_>> = body
            .split_inclusive('\n')
            .scan(0, |offset, text| {
                let start = *offset;
                *offset += text.len();
                Some((start, text))
            })
            .enumerate()
            .map(|(i, (start, text))| Line {
                number: i + 1,
                start,
                text,
            })
            .collect();

        let mut chunks = Vec::new();
        let mut markdown_start: Option<usize> = None;
        let mut plain_fence: Option<char> = None;
        let mut i = 0;

        while i < lines.len() {
            let line = lines[i];

            if let Some(open) = plain_fence {
                if fence_marker(line.text) == Some(open) {
                    plain_fence = None;
                }
                i += 1;
                continue;
            }

            let block = if is_code_open(line.content()) {
                Some(parse_code(&lines, i)?)
            } else if is_equation_open(line.content()) {
                Some(parse_equation(&lines, i)?)
            } else {
                None
            };

            match block {
                Some((chunk, next)) => {
                    if let Some(start) = markdown_start.take() {
                        chunks.push(ParsedChunk::markdown(body, TextRange::from_bounds(start, line.start)));
                    }
                    chunks.push(chunk);
                    i = next;
                }
                None => {
                    markdown_start.get_or_insert(line.start);
                    plain_fence = fence_marker(line.text);
                    i += 1;
                }
            }
        }

        if let Some(start) = markdown_start {
            chunks.push(ParsedChunk::markdown(body, TextRange::from_bounds(start, body.len())));
        }

        tracing::debug!(chunks = chunks.len(), bytes = body.len(), "Document body parsed");
        Ok(chunks)
    }
}

fn is_code_open(content: &str) -> bool {
    content
        .strip_prefix("```")
        .is_some_and(|rest| rest.trim_start().starts_with('{'))
}

/// `$$` opens a block unless text follows a closing `$$` on the same line;
/// such a line is markdown with an inline equation.
fn is_equation_open(content: &str) -> bool {
    let Some(rest) = content.strip_prefix("$$") else {
        return false;
    };
    match rest.find("$$") {
        Some(pos) => rest[pos + 2..].trim().is_empty(),
        None => true,
    }
}

fn is_code_close(content: &str) -> bool {
    content.trim_end() == "```"
}

/// Parse the code chunk opening at `lines[open]`; returns the chunk and the
/// index of the first line after it.
fn parse_code(lines: &[Line<'_>], open: usize) -> Result<(ParsedChunk, usize)> {
    let line = lines[open];
    let (engine, name, arguments) = parse_header(line)?;

    let close = lines[open + 1..]
        .iter()
        .position(|l| is_code_close(l.content()))
        .map(|p| open + 1 + p)
        .ok_or(DocumentError::UnterminatedFence {
            kind: ChunkKind::Code,
            line: line.number,
        })?;

    let closing = lines[close];
    let mut chunk = ParsedChunk::block(
        ChunkKind::Code,
        TextRange::from_bounds(line.start, closing.end()),
        TextRange::from_bounds(line.end(), closing.start),
    );
    chunk.engine = Some(engine);
    chunk.name = name;
    chunk.arguments = arguments;
    Ok((chunk, close + 1))
}

/// Split `{engine name, args}` into its parts.
fn parse_header(line: Line<'_>) -> Result<(String, Option<String>, Option<String>)> {
    let invalid = || DocumentError::InvalidChunkHeader {
        line: line.number,
        header: line.content().to_string(),
    };

    let content = line.content();
    let open = content.find('{').ok_or_else(invalid)?;
    let close = content.rfind('}').filter(|c| *c > open).ok_or_else(invalid)?;
    let header = content[open + 1..close].trim();
    if header.is_empty() {
        return Err(invalid());
    }

    let (label, arguments) = match header.split_once(',') {
        Some((label, args)) => (label.trim(), Some(args.trim().to_string()).filter(|a| !a.is_empty())),
        None => (header, None),
    };

    let mut words = label.splitn(2, char::is_whitespace);
    let engine = words.next().unwrap_or_default().to_string();
    let rest = words.next().map(str::trim).filter(|r| !r.is_empty());

    match rest {
        Some(rest) if rest.contains('=') => {
            // `{r echo=FALSE}`: no name, the rest are options
            let arguments = match arguments {
                Some(more) => format!("{}, {}", rest, more),
                None => rest.to_string(),
            };
            Ok((engine, None, Some(arguments)))
        }
        Some(rest) => Ok((engine, Some(rest.to_string()), arguments)),
        None => Ok((engine, None, arguments)),
    }
}

fn parse_equation(lines: &[Line<'_>], open: usize) -> Result<(ParsedChunk, usize)> {
    let line = lines[open];
    let after_open = &line.content()[2..];

    if let Some(pos) = after_open.find("$$") {
        let inner_start = line.start + 2;
        let chunk = ParsedChunk::block(
            ChunkKind::Equation,
            TextRange::from_bounds(line.start, line.end()),
            TextRange::from_bounds(inner_start, inner_start + pos),
        );
        return Ok((chunk, open + 1));
    }

    let close = lines[open + 1..]
        .iter()
        .position(|l| l.content().contains("$$"))
        .map(|p| open + 1 + p)
        .ok_or(DocumentError::UnterminatedFence {
            kind: ChunkKind::Equation,
            line: line.number,
        })?;
    let closing = lines[close];

    let inner_start = if after_open.trim().is_empty() {
        line.end()
    } else {
        line.start + 2
    };
    let inner_end = closing.start + closing.content().find("$$").unwrap_or(0);

    let chunk = ParsedChunk::block(
        ChunkKind::Equation,
        TextRange::from_bounds(line.start, closing.end()),
        TextRange::from_bounds(inner_start, inner_end),
    );
    Ok((chunk, close + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text<'a>(body: &'a str, range: TextRange) -> &'a str {
        &body[range.as_range()]
    }

    #[test]
    fn test_markdown_and_code() {
        let body = "# Title\n\n```{r}\nx <- 1\n```\n";
        let chunks = DocumentParser::parse(body).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].kind, ChunkKind::Markdown);
        assert_eq!(chunks[0].outer, TextRange::new(0, 9));
        assert_eq!(chunks[1].kind, ChunkKind::Code);
        assert_eq!(chunks[1].outer, TextRange::new(9, 18));
        assert_eq!(text(body, chunks[1].inner), "x <- 1\n");
        assert_eq!(chunks[1].engine.as_deref(), Some("r"));
    }

    #[test]
    fn test_plain_markdown_is_one_chunk() {
        let body = "Just text.\n\nMore text with `code`.\n";
        let chunks = DocumentParser::parse(body).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].outer, TextRange::new(0, body.len()));
    }

    #[test]
    fn test_empty_body() {
        assert!(DocumentParser::parse("").unwrap().is_empty());
    }

    #[test]
    fn test_header_metadata() {
        let body = "```{r setup, echo=FALSE}\n1\n```\n```{python}\n2\n```\n```{r fig.width=3}\n3\n```\n";
        let chunks = DocumentParser::parse(body).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].name.as_deref(), Some("setup"));
        assert_eq!(chunks[0].arguments.as_deref(), Some("echo=FALSE"));
        assert_eq!(chunks[1].engine.as_deref(), Some("python"));
        assert_eq!(chunks[1].name, None);
        assert_eq!(chunks[2].name, None);
        assert_eq!(chunks[2].arguments.as_deref(), Some("fig.width=3"));
    }

    #[test]
    fn test_equation_block() {
        let body = "text\n$$\nx^2\n$$\nmore\n";
        let chunks = DocumentParser::parse(body).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1].kind, ChunkKind::Equation);
        assert_eq!(text(body, chunks[1].outer), "$$\nx^2\n$$\n");
        assert_eq!(text(body, chunks[1].inner), "x^2\n");
    }

    #[test]
    fn test_one_line_equation() {
        let body = "$$ a + b $$\n";
        let chunks = DocumentParser::parse(body).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(text(body, chunks[0].inner), " a + b ");
    }

    #[test]
    fn test_one_line_equation_with_trailing_text_is_markdown() {
        let body = "intro\n$$x$$ see above\n$$ y $$  \n";
        let chunks = DocumentParser::parse(body).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].kind, ChunkKind::Markdown);
        assert_eq!(text(body, chunks[0].outer), "intro\n$$x$$ see above\n");
        assert_eq!(chunks[1].kind, ChunkKind::Equation);
        assert_eq!(text(body, chunks[1].inner), " y ");
    }

    #[test]
    fn test_plain_fence_stays_markdown() {
        let body = "```\n$$\n```{r}\n```\nafter\n";
        let chunks = DocumentParser::parse(body).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].kind, ChunkKind::Markdown);
    }

    #[test]
    fn test_unterminated_code_fence() {
        let err = DocumentParser::parse("intro\n```{r}\nx\n").unwrap_err();
        assert_eq!(err, DocumentError::UnterminatedFence { kind: ChunkKind::Code, line: 2 });
        assert!(err.is_malformed_document());
    }

    #[test]
    fn test_unterminated_equation() {
        let err = DocumentParser::parse("$$\nx\n").unwrap_err();
        assert!(matches!(err, DocumentError::UnterminatedFence { kind: ChunkKind::Equation, .. }));
    }

    #[test]
    fn test_empty_header_rejected() {
        let err = DocumentParser::parse("```{}\n```\n").unwrap_err();
        assert!(matches!(err, DocumentError::InvalidChunkHeader { line: 1, .. }));
    }

    #[test]
    fn test_ranges_tile_body() {
        let body = "a\n```{r}\nb\n```\n$$\nc\n$$\nd `r e` f\n";
        let chunks = DocumentParser::parse(body).unwrap();
        let mut expected = 0;
        for chunk in &chunks {
            assert_eq!(chunk.outer.start, expected);
            expected = chunk.outer.end();
        }
        assert_eq!(expected, body.len());
        assert_eq!(chunks[3].inline.len(), 1);
    }
}
