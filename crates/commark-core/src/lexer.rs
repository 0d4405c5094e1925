//! Input preprocessing and line splitting.
//!
//! The block parser consumes the input one line at a time. Before that the
//! input has its byte order mark removed, and each line has `U+0000`
//! replaced with `U+FFFD`. Line endings can be `\n`, `\r\n` or a lone `\r`.
//!
//! Lines borrow from the input unless they contain a NUL character.

use std::borrow::Cow;

use memchr::{memchr, memchr2};

const BOM: &str = "\u{feff}";

/// A single line of input without its line ending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line<'a> {
    /// Line content, with NUL characters replaced.
    pub text: Cow<'a, str>,
    /// Zero-based line number.
    pub index: usize,
    /// Byte offset of the line start in the (BOM-stripped) input.
    pub offset: usize,
}

/// Strip a leading byte order mark, if any.
#[inline]
pub fn strip_bom(input: &str) -> &str {
    input.strip_prefix(BOM).unwrap_or(input)
}

/// Splits input into [`Line`]s.
///
/// A trailing line ending does not produce an extra empty line, matching
/// how CommonMark treats the end of the document.
pub struct Lexer<'a> {
    input: &'a str,
    bytes: &'a [u8],
    offset: usize,
    line_index: usize,
}

impl<'a> Lexer<'a> {
    /// Create a lexer over `input`. The BOM must already be stripped.
    #[inline]
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            offset: 0,
            line_index: 0,
        }
    }

    /// Check if all input has been consumed.
    #[inline(always)]
    pub fn is_eof(&self) -> bool {
        self.offset >= self.bytes.len()
    }

    /// Consume and return the next line.
    pub fn next_line(&mut self) -> Option<Line<'a>> {
        if self.is_eof() {
            return None;
        }

        let start = self.offset;
        let (end, next) = match memchr2(b'\n', b'\r', &self.bytes[start..]) {
            Some(pos) => {
                let end = start + pos;
                let skip = if self.bytes[end] == b'\r' && self.bytes.get(end + 1) == Some(&b'\n') {
                    2
                } else {
                    1
                };
                (end, end + skip)
            }
            None => (self.bytes.len(), self.bytes.len()),
        };
        self.offset = next;

        let raw = &self.input[start..end];
        let text = if memchr(0, raw.as_bytes()).is_some() {
            Cow::Owned(raw.replace('\0', "\u{fffd}"))
        } else {
            Cow::Borrowed(raw)
        };

        let line = Line {
            text,
            index: self.line_index,
            offset: start,
        };
        self.line_index += 1;
        Some(line)
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Line<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_line()
    }
}
