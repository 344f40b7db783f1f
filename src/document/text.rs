//! Styled text values handed to editors.

use serde::Serialize;

/// Stand-in character for an embedded non-text attachment (image, widget).
///
/// It occupies space in the document so chunk ranges stay aligned, but it is
/// never part of any text view returned to callers.
pub const ATTACHMENT_MARKER: char = '\u{0FFE}';

/// RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TextStyle {
    pub foreground: Option<Rgba>,
    pub background: Option<Rgba>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

/// A style applied to `start..end` (byte offsets into the owning text).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StyleSpan {
    pub start: usize,
    pub end: usize,
    pub style: TextStyle,
}

/// Text plus non-overlapping style spans.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct StyledText {
    text: String,
    spans: Vec<StyleSpan>,
}

impl StyledText {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            spans: Vec::new(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn spans(&self) -> &[StyleSpan] {
        &self.spans
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Replace all spans. Spans outside the text are clamped.
    pub fn set_spans(&mut self, spans: Vec<StyleSpan>) {
        let len = self.text.len();
        self.spans = spans
            .into_iter()
            .map(|s| StyleSpan {
                start: s.start.min(len),
                end: s.end.min(len),
                style: s.style,
            })
            .filter(|s| s.start < s.end)
            .collect();
    }
}

pub fn strip_attachments(text: &str) -> String {
    text.chars().filter(|c| *c != ATTACHMENT_MARKER).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bold() -> TextStyle {
        TextStyle {
            bold: true,
            ..TextStyle::default()
        }
    }

    #[test]
    fn test_set_spans_clamps_to_text() {
        let mut text = StyledText::new("hello");
        text.set_spans(vec![
            StyleSpan { start: 1, end: 9, style: bold() },
            StyleSpan { start: 7, end: 9, style: bold() },
        ]);
        assert_eq!(text.spans(), &[StyleSpan { start: 1, end: 5, style: bold() }]);
    }

    #[test]
    fn test_strip_attachments() {
        assert_eq!(strip_attachments(&format!("a{}b", ATTACHMENT_MARKER)), "ab");
        assert_eq!(strip_attachments("plain"), "plain");
    }
}
