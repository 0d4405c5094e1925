//! Scanners for link labels, destinations and titles.
//!
//! Shared by inline links (`[text](dest "title")`), reference links and
//! link reference definitions. All functions take a byte offset into the
//! text and return the offset just past what they matched.

use crate::chars::{is_escapable, unescape};

/// Labels longer than this never match.
pub const MAX_LABEL_LENGTH: usize = 999;

/// Parentheses nesting limit inside unbracketed destinations.
const MAX_DESTINATION_PARENS: usize = 32;

/// Skip a backslash and the escapable character after it, if any.
#[inline]
fn skip_escape(bytes: &[u8], i: usize) -> usize {
    match bytes.get(i + 1) {
        Some(&b) if is_escapable(b as char) => i + 2,
        _ => i + 1,
    }
}

/// Skip whitespace (spaces, tabs, line endings). Returns the new offset.
#[inline]
pub fn skip_whitespace(s: &str, from: usize) -> usize {
    let bytes = s.as_bytes();
    let mut i = from;
    while i < bytes.len() && matches!(bytes[i], b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c) {
        i += 1;
    }
    i
}

/// Scan the content of a link label. `from` points just after `[`.
///
/// Returns the offset of the closing `]`.
pub fn scan_label_content(s: &str, from: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = from;
    let mut chars = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                let next = skip_escape(bytes, i);
                chars += next - i;
                i = next;
            }
            b']' => return (chars <= MAX_LABEL_LENGTH).then_some(i),
            b'[' => return None,
            b => {
                // UTF-8 continuation bytes belong to the previous character.
                if b & 0xc0 != 0x80 {
                    chars += 1;
                }
                i += 1;
            }
        }
    }
    None
}

/// Parse a full link label `[...]` starting at `from`.
///
/// Returns the raw label text (without brackets) and the offset after `]`.
pub fn parse_label(s: &str, from: usize) -> Option<(&str, usize)> {
    if s.as_bytes().get(from) != Some(&b'[') {
        return None;
    }
    let close = scan_label_content(s, from + 1)?;
    Some((&s[from + 1..close], close + 1))
}

/// Scan a link destination starting at `from`.
///
/// Returns the offset after the destination. An unbracketed destination may
/// be empty; callers decide whether that is acceptable.
pub fn scan_destination(s: &str, from: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    if from >= bytes.len() {
        return None;
    }
    if bytes[from] == b'<' {
        let mut i = from + 1;
        while i < bytes.len() {
            match bytes[i] {
                b'\\' => i = skip_escape(bytes, i),
                b'\n' | b'<' => return None,
                b'>' => return Some(i + 1),
                _ => i += 1,
            }
        }
        return None;
    }

    let mut parens = 0usize;
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b' ' => break,
            b'\\' => i = skip_escape(bytes, i),
            b'(' => {
                parens += 1;
                if parens > MAX_DESTINATION_PARENS {
                    return None;
                }
                i += 1;
            }
            b')' => {
                if parens == 0 {
                    break;
                }
                parens -= 1;
                i += 1;
            }
            b if b.is_ascii_control() => break,
            _ => i += 1,
        }
    }
    (parens == 0).then_some(i)
}

/// Parse a destination, returning the unescaped value and the end offset.
pub fn parse_destination(s: &str, from: usize) -> Option<(String, usize)> {
    let end = scan_destination(s, from)?;
    let raw = &s[from..end];
    let raw = if raw.starts_with('<') {
        &raw[1..raw.len() - 1]
    } else {
        raw
    };
    Some((unescape(raw).into_owned(), end))
}

/// Scan a link title (`"..."`, `'...'` or `(...)`) starting at `from`.
pub fn scan_title(s: &str, from: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    let close = match bytes.get(from)? {
        b'"' => b'"',
        b'\'' => b'\'',
        b'(' => b')',
        _ => return None,
    };
    let mut i = from + 1;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'\\' {
            i = skip_escape(bytes, i);
        } else if b == close {
            return Some(i + 1);
        } else if close == b')' && b == b'(' {
            return None;
        } else {
            i += 1;
        }
    }
    None
}

/// Parse a title, returning the unescaped value and the end offset.
pub fn parse_title(s: &str, from: usize) -> Option<(String, usize)> {
    let end = scan_title(s, from)?;
    let raw = &s[from + 1..end - 1];
    Some((unescape(raw).into_owned(), end))
}
