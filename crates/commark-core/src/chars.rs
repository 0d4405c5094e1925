//! Character classes and string helpers shared by both parsing phases.

use std::borrow::Cow;
use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_categories::UnicodeCategories;

/// Lines indented this many columns or more are indented code.
pub const CODE_BLOCK_INDENT: usize = 4;

static ESCAPABLE_OR_ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r##"\\[!"#$%&'()*+,./:;<=>?@\[\\\]^_`{|}~-]|&(?:#[xX][0-9a-fA-F]{1,6}|#[0-9]{1,7}|[A-Za-z][A-Za-z0-9]{1,31});"##)
        .expect("valid escape pattern")
});

static ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^&(?:#[xX][0-9a-fA-F]{1,6}|#[0-9]{1,7}|[A-Za-z][A-Za-z0-9]{1,31});")
        .expect("valid entity pattern")
});

/// HTML5 named references, keyed by `&name;`.
static NAMED_ENTITIES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    entities::ENTITIES
        .iter()
        .filter(|e| e.entity.ends_with(';'))
        .map(|e| (e.entity, e.characters))
        .collect()
});

/// Number of columns a tab at `column` advances to reach the next stop.
#[inline]
pub fn columns_to_next_tab_stop(column: usize) -> usize {
    4 - (column % 4)
}

#[inline]
pub fn is_space_or_tab(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

/// ASCII punctuation, the set of characters a backslash can escape.
#[inline]
pub fn is_escapable(c: char) -> bool {
    c.is_ascii_punctuation()
}

/// Unicode punctuation as CommonMark defines it: general categories P and S.
#[inline]
pub fn is_punctuation(c: char) -> bool {
    if c.is_ascii() {
        return c.is_ascii_punctuation();
    }
    c.is_punctuation() || c.is_symbol()
}

/// Unicode whitespace: category Zs plus tab, line feed, form feed and
/// carriage return.
#[inline]
pub fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\u{0c}' | '\r') || c.is_separator_space()
}

/// Whether a line consists of spaces and tabs only.
#[inline]
pub fn is_blank(s: &str) -> bool {
    s.bytes().all(is_space_or_tab)
}

/// Index of the first byte at or after `from` that is not `b`.
#[inline]
pub fn skip(b: u8, s: &str, from: usize) -> usize {
    let bytes = s.as_bytes();
    let mut i = from;
    while i < bytes.len() && bytes[i] == b {
        i += 1;
    }
    i
}

/// Index of the first byte at or after `from` that is not a space or tab.
#[inline]
pub fn skip_space_tab(s: &str, from: usize) -> usize {
    let bytes = s.as_bytes();
    let mut i = from;
    while i < bytes.len() && is_space_or_tab(bytes[i]) {
        i += 1;
    }
    i
}

/// Decode an entity reference at the start of `s`.
///
/// Returns the decoded text and the number of bytes consumed, or `None`
/// when `s` does not start with a valid reference. Numeric references to
/// U+0000 or invalid code points decode to U+FFFD.
pub fn decode_entity(s: &str) -> Option<(String, usize)> {
    let m = ENTITY.find(s)?;
    let entity = m.as_str();
    let body = &entity[1..entity.len() - 1];
    if let Some(num) = body.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        let c = match char::from_u32(code) {
            Some('\0') | None => '\u{fffd}',
            Some(c) => c,
        };
        return Some((c.to_string(), m.end()));
    }
    let decoded = NAMED_ENTITIES.get(entity)?;
    Some((decoded.to_string(), m.end()))
}

/// Resolve backslash escapes and entity references.
pub fn unescape(s: &str) -> Cow<'_, str> {
    if !s.contains(['\\', '&']) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len());
    let mut last = 0;
    for m in ESCAPABLE_OR_ENTITY.find_iter(s) {
        out.push_str(&s[last..m.start()]);
        let text = m.as_str();
        if let Some(escaped) = text.strip_prefix('\\') {
            out.push_str(escaped);
        } else {
            match decode_entity(text) {
                Some((decoded, _)) => out.push_str(&decoded),
                None => out.push_str(text),
            }
        }
        last = m.end();
    }
    out.push_str(&s[last..]);
    Cow::Owned(out)
}
