//! Leading metadata block.
//!
//! A document may open with a block delimited by `---` lines (the closing
//! line may also be `...`). The block is kept verbatim outside the chunk tree.

use crate::document::error::{DocumentError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontMatter {
    /// The block exactly as written, delimiters and trailing newline included.
    pub block: String,
    /// Text between the delimiter lines.
    pub content: String,
}

/// Split `source` into its front matter (if any) and the remaining body.
pub fn split(source: &str) -> Result<(Option<FrontMatter>, &str)> {
    let mut lines = source.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return Ok((None, source));
    };
    if trim_eol(first) != "---" {
        return Ok((None, source));
    }

    let content_start = first.len();
    let mut offset = content_start;
    for line in lines {
        let end = offset + line.len();
        let marker = trim_eol(line).trim_end();
        if marker == "---" || marker == "..." {
            let front = FrontMatter {
                block: source[..end].to_string(),
                content: source[content_start..offset].to_string(),
            };
            return Ok((Some(front), &source[end..]));
        }
        offset = end;
    }

    Err(DocumentError::UnterminatedFrontMatter)
}

fn trim_eol(line: &str) -> &str {
    line.trim_end_matches('\n').trim_end_matches('\r')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_front_matter() {
        let (front, body) = split("# Title\n").unwrap();
        assert!(front.is_none());
        assert_eq!(body, "# Title\n");
    }

    #[test]
    fn test_front_matter_removed() {
        let source = "---\ntitle: x\n---\nbody\n";
        let (front, body) = split(source).unwrap();
        let front = front.unwrap();
        assert_eq!(front.content, "title: x\n");
        assert_eq!(front.block, "---\ntitle: x\n---\n");
        assert_eq!(body, "body\n");
    }

    #[test]
    fn test_dots_close_block() {
        let (front, body) = split("---\na: 1\n...\n").unwrap();
        assert_eq!(front.unwrap().content, "a: 1\n");
        assert_eq!(body, "");
    }

    #[test]
    fn test_unterminated() {
        assert_eq!(
            split("---\ntitle: x\n").unwrap_err(),
            DocumentError::UnterminatedFrontMatter
        );
    }

    #[test]
    fn test_rule_not_at_start_is_body() {
        let (front, _) = split("text\n---\n").unwrap();
        assert!(front.is_none());
    }
}
