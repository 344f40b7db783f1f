//! Syntax highlighting for executable chunks.
//!
//! # Responsibilities
//! - Define the `Highlighter` seam used by `Document::styled_content`
//! - Provide a syntect-backed implementation
//!
//! # Design Decisions
//! - No process-wide theme or syntax state: each highlighter owns its
//!   syntax set and theme, built from an explicit `HighlightConfig`
//! - Highlighting writes spans into a caller-owned copy, never the document

use syntect::easy::HighlightLines;
use syntect::highlighting::{Color, FontStyle, Theme, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;
use thiserror::Error;

use crate::config::DocumentConfig;
use crate::document::text::{Rgba, StyleSpan, StyledText, TextStyle};

#[derive(Debug, Error)]
pub enum HighlightError {
    #[error("no syntax for token '{0}'")]
    UnknownSyntax(String),

    #[error("unknown theme '{0}'")]
    UnknownTheme(String),

    #[error(transparent)]
    Syntect(#[from] syntect::Error),
}

/// Applies styling to a chunk's text in place.
pub trait Highlighter: Send + Sync {
    fn highlight(&self, text: &mut StyledText) -> Result<(), HighlightError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightConfig {
    /// Name of a syntect default theme.
    pub theme: String,
    /// Token used to find the code syntax (name or file extension).
    pub code_syntax: String,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self::from(&DocumentConfig::default())
    }
}

impl From<&DocumentConfig> for HighlightConfig {
    fn from(config: &DocumentConfig) -> Self {
        Self {
            theme: config.highlight_theme.clone(),
            code_syntax: config.code_syntax.clone(),
        }
    }
}

pub struct SyntectHighlighter {
    syntaxes: SyntaxSet,
    theme: Theme,
    syntax_token: String,
}

impl std::fmt::Debug for SyntectHighlighter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntectHighlighter")
            .field("syntax_token", &self.syntax_token)
            .finish_non_exhaustive()
    }
}

impl SyntectHighlighter {
    /// Load syntect's bundled syntaxes and themes.
    ///
    /// Fails when the configured theme or syntax is not bundled.
    pub fn new(config: &HighlightConfig) -> Result<Self, HighlightError> {
        let syntaxes = SyntaxSet::load_defaults_newlines();
        if syntaxes.find_syntax_by_token(&config.code_syntax).is_none() {
            return Err(HighlightError::UnknownSyntax(config.code_syntax.clone()));
        }

        let mut themes = ThemeSet::load_defaults();
        let theme = themes
            .themes
            .remove(&config.theme)
            .ok_or_else(|| HighlightError::UnknownTheme(config.theme.clone()))?;

        tracing::debug!(theme = %config.theme, syntax = %config.code_syntax, "Highlighter loaded");
        Ok(Self {
            syntaxes,
            theme,
            syntax_token: config.code_syntax.clone(),
        })
    }
}

impl Highlighter for SyntectHighlighter {
    fn highlight(&self, text: &mut StyledText) -> Result<(), HighlightError> {
        let syntax = self
            .syntaxes
            .find_syntax_by_token(&self.syntax_token)
            .ok_or_else(|| HighlightError::UnknownSyntax(self.syntax_token.clone()))?;
        let mut lines = HighlightLines::new(syntax, &self.theme);

        let mut spans = Vec::new();
        let mut offset = 0;
        for line in LinesWithEndings::from(text.as_str()) {
            for (style, piece) in lines.highlight_line(line, &self.syntaxes)? {
                spans.push(StyleSpan {
                    start: offset,
                    end: offset + piece.len(),
                    style: TextStyle {
                        foreground: Some(rgba(style.foreground)),
                        background: None,
                        bold: style.font_style.contains(FontStyle::BOLD),
                        italic: style.font_style.contains(FontStyle::ITALIC),
                        underline: style.font_style.contains(FontStyle::UNDERLINE),
                    },
                });
                offset += piece.len();
            }
        }

        text.set_spans(spans);
        Ok(())
    }
}

fn rgba(color: Color) -> Rgba {
    Rgba {
        r: color.r,
        g: color.g,
        b: color.b,
        a: color.a,
    }
}
