//! Source location tracking for tree nodes.
//!
//! Nodes carry zero or more [`SourceSpan`]s. A block that covers several
//! lines gets one span per line, so container blocks (block quotes, list
//! items) end up with discontiguous spans that skip their markers.

/// A span of source text on a single line.
///
/// All fields are zero based and measured in bytes of the input after BOM
/// removal.
///
/// # Example
///
/// ```rust
/// use commark_core::span::SourceSpan;
///
/// let span = SourceSpan::new(2, 4, 30, 6);
/// assert_eq!(span.end_input_index(), 36);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SourceSpan {
    /// Line number of the span.
    pub line_index: usize,
    /// Byte offset of the span start within its line.
    pub column_index: usize,
    /// Byte offset of the span start within the whole input.
    pub input_index: usize,
    /// Length in bytes.
    pub length: usize,
}

impl SourceSpan {
    #[inline]
    pub const fn new(line_index: usize, column_index: usize, input_index: usize, length: usize) -> Self {
        Self {
            line_index,
            column_index,
            input_index,
            length,
        }
    }

    /// Byte offset one past the end of the span within the whole input.
    #[inline]
    pub const fn end_input_index(&self) -> usize {
        self.input_index + self.length
    }

    /// Sub-span starting `offset` bytes in, `length` bytes long.
    #[inline]
    pub fn subspan(&self, offset: usize, length: usize) -> SourceSpan {
        let offset = offset.min(self.length);
        SourceSpan {
            line_index: self.line_index,
            column_index: self.column_index + offset,
            input_index: self.input_index + offset,
            length: length.min(self.length - offset),
        }
    }

    /// Whether `other` starts exactly where this span ends on the same line.
    #[inline]
    pub fn touches(&self, other: &SourceSpan) -> bool {
        self.line_index == other.line_index && self.end_input_index() == other.input_index
    }
}

/// Which nodes get source spans attached during parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IncludeSourceSpans {
    /// No spans (fastest).
    #[default]
    None,
    /// Spans on block nodes only.
    Blocks,
    /// Spans on block and inline nodes.
    BlocksAndInlines,
}

impl IncludeSourceSpans {
    #[inline]
    pub(crate) fn blocks(self) -> bool {
        !matches!(self, IncludeSourceSpans::None)
    }

    #[inline]
    pub(crate) fn inlines(self) -> bool {
        matches!(self, IncludeSourceSpans::BlocksAndInlines)
    }
}

/// Append `span` to `spans`, merging it into the last span when adjacent.
pub(crate) fn push_span(spans: &mut Vec<SourceSpan>, span: SourceSpan) {
    if span.length == 0 {
        return;
    }
    if let Some(last) = spans.last_mut() {
        if last.touches(&span) {
            last.length += span.length;
            return;
        }
    }
    spans.push(span);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjacent_spans_merge() {
        let mut spans = Vec::new();
        push_span(&mut spans, SourceSpan::new(0, 0, 0, 2));
        push_span(&mut spans, SourceSpan::new(0, 2, 2, 3));
        push_span(&mut spans, SourceSpan::new(1, 0, 6, 1));
        assert_eq!(
            spans,
            vec![SourceSpan::new(0, 0, 0, 5), SourceSpan::new(1, 0, 6, 1)]
        );
    }

    #[test]
    fn subspan_is_clamped() {
        let span = SourceSpan::new(3, 4, 20, 5);
        assert_eq!(span.subspan(2, 10), SourceSpan::new(3, 6, 22, 3));
    }
}
