//! RFC 5322 header-block parsing: separator location, byte decoding,
//! unfolding, and case-insensitive lookup.
//!
//! This is the shared front half of both pipelines. It is intentionally
//! header-only: the body is never inspected, only carried as raw bytes.

use crate::error::{IngestError, Result};
use crate::model::address::Address;

/// A parsed view over the header block of a raw message.
///
/// Header names are stored lowercased; values are unfolded and trimmed.
#[derive(Debug, Clone)]
pub struct ParsedHeaders {
    headers: Vec<(String, String)>,
}

/// Parse the header block of a raw RFC 5322 message.
///
/// Fails with [`IngestError::MalformedMessage`] when no header/body
/// separator (first blank line) can be located. Side-effect free.
pub fn parse(raw: &[u8]) -> Result<ParsedHeaders> {
    let header_end = find_header_end(raw).ok_or_else(|| {
        IngestError::MalformedMessage("no header/body separator found".to_string())
    })?;

    let text = decode_header_bytes(&raw[..header_end]);
    Ok(ParsedHeaders {
        headers: unfold_headers(&text),
    })
}

impl ParsedHeaders {
    /// First value for a header name (case-insensitive).
    pub fn first(&self, name: &str) -> Option<&str> {
        let name = name.to_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    /// All values for a header name, in order of appearance.
    pub fn all<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> {
        let name = name.to_lowercase();
        self.headers
            .iter()
            .filter(move |(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Every address listed under a header name, across all occurrences,
    /// preserving order and duplicates.
    pub fn address_list(&self, name: &str) -> Vec<Address> {
        self.all(name).flat_map(Address::parse_list).collect()
    }

    /// The `Return-Path` value with surrounding angle brackets stripped.
    ///
    /// Returns `None` when the header is absent or empty after stripping.
    pub fn return_path(&self) -> Option<&str> {
        let path = self
            .first("Return-Path")?
            .trim_matches(|c| c == '<' || c == '>');
        (!path.is_empty()).then_some(path)
    }
}

/// Find the byte offset where headers end (position of the first blank line).
fn find_header_end(data: &[u8]) -> Option<usize> {
    for i in 0..data.len().saturating_sub(1) {
        if data[i] == b'\n' && data[i + 1] == b'\n' {
            return Some(i);
        }
        if i + 3 < data.len()
            && data[i] == b'\r'
            && data[i + 1] == b'\n'
            && data[i + 2] == b'\r'
            && data[i + 3] == b'\n'
        {
            return Some(i);
        }
    }
    None
}

/// Decode raw header bytes to a string.
///
/// Tries UTF-8 first, then falls back to Windows-1252 (which accepts every byte).
fn decode_header_bytes(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Unfold headers: join continuation lines (starting with space or tab) with
/// the previous header. Returns `(lowercase_name, value)` pairs.
fn unfold_headers(text: &str) -> Vec<(String, String)> {
    let mut result: Vec<(String, String)> = Vec::new();

    for line in text.lines() {
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(last) = result.last_mut() {
                last.1.push(' ');
                last.1.push_str(line.trim());
            }
        } else if let Some(colon) = line.find(':') {
            let name = line[..colon].trim().to_lowercase();
            let value = line[colon + 1..].trim().to_string();
            result.push((name, value));
        }
        // Lines with no colon that are not continuations are skipped
    }

    result
}
