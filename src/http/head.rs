//! Status line and header block parsing.
//!
//! # Responsibilities
//! - Locate the CRLFCRLF separator between head and body
//! - Parse `HTTP/<ver> <code> <reason>` into a numeric status
//! - Collect `Name: value` lines into a [`HeaderMap`]
//!
//! # Design Decisions
//! - Header names keep their original case; lookups ignore case
//! - A repeated header replaces the earlier value (last value wins)

use crate::http::message::StreamError;

/// Separator between the header block and the body.
pub const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Line terminator used by headers and chunk framing.
pub const CRLF: &[u8] = b"\r\n";

/// Case-preserving header map with case-insensitive lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: Vec<(String, String)>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header, replacing any earlier value with the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(entry) => *entry = (name, value),
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

/// Parsed response head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: u16,
    pub reason: String,
    pub headers: HeaderMap,
}

impl ResponseHead {
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    /// True when `Transfer-Encoding` lists `chunked`.
    pub fn is_chunked(&self) -> bool {
        self.headers
            .get("transfer-encoding")
            .map(|v| v.to_ascii_lowercase().contains("chunked"))
            .unwrap_or(false)
    }

    /// Declared body length, if any and well formed.
    pub fn content_length(&self) -> Option<usize> {
        self.headers
            .get("content-length")
            .and_then(|v| v.trim().parse().ok())
    }

    /// True when the body is newline-delimited JSON.
    pub fn is_json(&self) -> bool {
        self.headers
            .get("content-type")
            .map(|v| v.to_ascii_lowercase().starts_with("application/json"))
            .unwrap_or(false)
    }
}

/// Position of `needle` in `haystack`.
pub fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Parse a header block (without the trailing blank line).
pub fn parse_head(block: &[u8]) -> Result<ResponseHead, StreamError> {
    let text = std::str::from_utf8(block)
        .map_err(|_| StreamError::malformed("header block is not valid UTF-8"))?;
    let mut lines = text.split("\r\n");

    let status_line = lines
        .next()
        .filter(|l| !l.is_empty())
        .ok_or_else(|| StreamError::malformed("missing status line"))?;
    let (status, reason) = parse_status_line(status_line)?;

    let mut headers = HeaderMap::new();
    for line in lines.filter(|l| !l.is_empty()) {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| StreamError::malformed(format!("header line without colon: {:?}", line)))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(StreamError::malformed("header line with empty name"));
        }
        headers.insert(name, value.trim());
    }

    Ok(ResponseHead {
        status,
        reason,
        headers,
    })
}

fn parse_status_line(line: &str) -> Result<(u16, String), StreamError> {
    let mut parts = line.splitn(3, ' ');
    let version = parts.next().unwrap_or_default();
    if !version.starts_with("HTTP/") {
        return Err(StreamError::malformed(format!("invalid status line: {:?}", line)));
    }
    let status = parts
        .next()
        .and_then(|code| code.parse::<u16>().ok())
        .filter(|code| (100..=999).contains(code))
        .ok_or_else(|| StreamError::malformed(format!("invalid status code in {:?}", line)))?;
    let reason = parts.next().unwrap_or_default().trim().to_string();
    Ok((status, reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::message::StreamErrorKind;

    #[test]
    fn test_parse_head() {
        let head = parse_head(
            b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nTransfer-Encoding: chunked",
        )
        .unwrap();
        assert_eq!(head.status, 200);
        assert_eq!(head.reason, "OK");
        assert!(head.is_success());
        assert!(head.is_chunked());
        assert!(head.is_json());
        assert_eq!(head.headers.get("content-type"), Some("application/json"));
    }

    #[test]
    fn test_header_case_preserved_last_wins() {
        let head = parse_head(b"HTTP/1.0 204 No Content\r\nX-Id: a\r\nx-id: b").unwrap();
        assert_eq!(head.headers.len(), 1);
        assert_eq!(head.headers.get("X-ID"), Some("b"));
        let names: Vec<_> = head.headers.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["x-id"]);
    }

    #[test]
    fn test_bad_status_line() {
        let err = parse_head(b"HTP/1.1 200 OK").unwrap_err();
        assert_eq!(err.kind, StreamErrorKind::MalformedFrame);

        let err = parse_head(b"HTTP/1.1 abc OK").unwrap_err();
        assert_eq!(err.kind, StreamErrorKind::MalformedFrame);
    }

    #[test]
    fn test_header_without_colon() {
        let err = parse_head(b"HTTP/1.1 200 OK\r\nbogus").unwrap_err();
        assert_eq!(err.kind, StreamErrorKind::MalformedFrame);
    }

    #[test]
    fn test_content_length() {
        let head = parse_head(b"HTTP/1.1 200 OK\r\nContent-Length: 12").unwrap();
        assert_eq!(head.content_length(), Some(12));
        assert!(!head.is_chunked());
    }

    #[test]
    fn test_find() {
        assert_eq!(find(b"abc\r\n\r\nrest", HEAD_TERMINATOR), Some(3));
        assert_eq!(find(b"abc\r\n", HEAD_TERMINATOR), None);
    }
}
