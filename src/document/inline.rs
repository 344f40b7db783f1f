//! Inline code and equation spans inside markdown text.
//!
//! # Responsibilities
//! - Find `` `r expr` `` inline code spans
//! - Find `$$…$$` and `$…$` inline equations
//! - Ignore everything inside plain fenced blocks
//!
//! # Design Decisions
//! - Spans never cross a line break
//! - All delimiters are ASCII, so byte scanning never splits a UTF-8 sequence
//! - `$…$` follows the pandoc rule: the opening `$` is followed by non-space,
//!   the closing `$` is preceded by non-space and not followed by a digit

use crate::document::chunk::{ChunkKind, TextRange};

/// An inline chunk candidate, ranged relative to the scanned text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InlineSpan {
    pub kind: ChunkKind,
    pub outer: TextRange,
    pub inner: TextRange,
}

/// Returns the marker character when `line` opens or closes a plain fence.
pub(crate) fn fence_marker(line: &str) -> Option<char> {
    let trimmed = line.trim_start();
    if trimmed.starts_with("```") {
        Some('`')
    } else if trimmed.starts_with("~~~") {
        Some('~')
    } else {
        None
    }
}

/// Scan markdown `text` for inline spans in document order.
pub fn scan_inline(text: &str) -> Vec<InlineSpan> {
    let mut spans = Vec::new();
    let mut fence: Option<char> = None;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        match (fence, fence_marker(line)) {
            (Some(open), Some(marker)) if open == marker => fence = None,
            (Some(_), _) => {}
            (None, Some(marker)) => fence = Some(marker),
            (None, None) => scan_line(line.as_bytes(), offset, &mut spans),
        }
        offset += line.len();
    }

    spans
}

fn scan_line(line: &[u8], base: usize, spans: &mut Vec<InlineSpan>) {
    let mut i = 0;
    while i < line.len() {
        match line[i] {
            b'\\' => i += 2,
            b'`' => i = scan_backticks(line, i, base, spans),
            b'$' if line.get(i + 1) == Some(&b'$') => i = scan_display_math(line, i, base, spans),
            b'$' => i = scan_inline_math(line, i, base, spans),
            _ => i += 1,
        }
    }
}

fn scan_backticks(line: &[u8], start: usize, base: usize, spans: &mut Vec<InlineSpan>) -> usize {
    let run = count_run(line, start, b'`');
    let content_start = start + run;

    let mut j = content_start;
    while j < line.len() {
        if line[j] == b'`' {
            let closing = count_run(line, j, b'`');
            if closing == run {
                let content = &line[content_start..j];
                if run == 1 && content.len() > 2 && content.starts_with(b"r ") {
                    spans.push(InlineSpan {
                        kind: ChunkKind::InlineCode,
                        outer: TextRange::from_bounds(base + start, base + j + run),
                        inner: TextRange::from_bounds(base + content_start + 2, base + j),
                    });
                }
                return j + run;
            }
            j += closing;
        } else {
            j += 1;
        }
    }

    // unmatched run is literal text
    content_start
}

fn scan_display_math(line: &[u8], start: usize, base: usize, spans: &mut Vec<InlineSpan>) -> usize {
    let content_start = start + 2;
    let mut j = content_start;
    while j + 1 < line.len() {
        match line[j] {
            b'\\' => j += 2,
            b'$' if line[j + 1] == b'$' => {
                if j > content_start {
                    spans.push(InlineSpan {
                        kind: ChunkKind::Equation,
                        outer: TextRange::from_bounds(base + start, base + j + 2),
                        inner: TextRange::from_bounds(base + content_start, base + j),
                    });
                }
                return j + 2;
            }
            _ => j += 1,
        }
    }
    content_start
}

fn scan_inline_math(line: &[u8], start: usize, base: usize, spans: &mut Vec<InlineSpan>) -> usize {
    let content_start = start + 1;
    match line.get(content_start) {
        Some(b) if !b.is_ascii_whitespace() => {}
        _ => return content_start,
    }

    let mut j = content_start + 1;
    while j < line.len() {
        match line[j] {
            b'\\' => j += 2,
            b'\n' => break,
            b'$' => {
                let closes = !line[j - 1].is_ascii_whitespace()
                    && !line.get(j + 1).is_some_and(|b| b.is_ascii_digit());
                if closes {
                    spans.push(InlineSpan {
                        kind: ChunkKind::Equation,
                        outer: TextRange::from_bounds(base + start, base + j + 1),
                        inner: TextRange::from_bounds(base + content_start, base + j),
                    });
                    return j + 1;
                }
                j += 1;
            }
            _ => j += 1,
        }
    }
    content_start
}

fn count_run(line: &[u8], start: usize, byte: u8) -> usize {
    line[start..].iter().take_while(|b| **b == byte).count()
}
