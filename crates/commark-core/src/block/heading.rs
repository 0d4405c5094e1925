use crate::ast::{Heading, NodeValue};
use crate::chars::{skip, skip_space_tab, CODE_BLOCK_INDENT};

use super::{
    BlockContinue, BlockParser, BlockParserFactory, BlockStart, MatchedBlock, ParserState,
    SourceLine, SourceLines,
};

/// Level of a setext underline starting at `from`, if the rest of the line
/// is one.
pub(crate) fn setext_level(line: &str, from: usize) -> Option<u8> {
    let (marker, level) = match line.as_bytes().get(from)? {
        b'=' => (b'=', 1),
        b'-' => (b'-', 2),
        _ => return None,
    };
    let end = skip_space_tab(line, skip(marker, line, from));
    (end == line.len()).then_some(level)
}

/// Parse an ATX heading starting at `from` (the first `#`).
///
/// Returns the level and the byte range of the content, with the optional
/// closing sequence and surrounding whitespace removed.
fn atx_heading(line: &str, from: usize) -> Option<(u8, usize, usize)> {
    let bytes = line.as_bytes();
    let after_hashes = skip(b'#', line, from);
    let level = after_hashes - from;
    if level == 0 || level > 6 {
        return None;
    }
    if after_hashes == bytes.len() {
        return Some((level as u8, after_hashes, after_hashes));
    }
    if !matches!(bytes[after_hashes], b' ' | b'\t') {
        return None;
    }

    let start = skip_space_tab(line, after_hashes);
    let mut end = start;
    let mut hash_can_end = true;
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b'#' if hash_can_end => {
                let after = skip(b'#', line, i);
                let next = skip_space_tab(line, after);
                if next < bytes.len() {
                    // Not a closing sequence: keep it as content.
                    end = next;
                    hash_can_end = next > after;
                }
                i = next;
            }
            b' ' | b'\t' => {
                hash_can_end = true;
                i += 1;
            }
            _ => {
                hash_can_end = false;
                i += 1;
                end = i;
            }
        }
    }
    Some((level as u8, start, end))
}

struct HeadingParser {
    content: Option<SourceLines>,
}

impl BlockParser for HeadingParser {
    fn try_continue(&mut self, _state: &ParserState<'_>) -> Option<BlockContinue> {
        None
    }

    fn inline_content(&mut self) -> Option<SourceLines> {
        self.content.take()
    }
}

/// Starts `#` headings.
pub struct AtxHeadingFactory;

impl BlockParserFactory for AtxHeadingFactory {
    fn try_start(&self, state: &ParserState<'_>, _matched: &MatchedBlock<'_>) -> Option<BlockStart> {
        if state.indent() >= CODE_BLOCK_INDENT {
            return None;
        }
        let line = state.line();
        let nns = state.next_non_space_index();
        if line.as_bytes().get(nns) != Some(&b'#') {
            return None;
        }
        let (level, start, end) = atx_heading(line, nns)?;

        let mut content = SourceLines::new();
        content.push(SourceLine {
            content: line[start..end].to_string(),
            span: Some(state.span(start, end)),
        });
        Some(
            BlockStart::of(
                NodeValue::Heading(Heading { level, setext: false }),
                HeadingParser {
                    content: Some(content),
                },
            )
            .at_index(line.len()),
        )
    }
}

/// Turns a paragraph followed by a `===` or `---` underline into a
/// heading.
pub struct SetextHeadingFactory;

impl BlockParserFactory for SetextHeadingFactory {
    fn try_start(&self, state: &ParserState<'_>, matched: &MatchedBlock<'_>) -> Option<BlockStart> {
        if state.indent() >= CODE_BLOCK_INDENT {
            return None;
        }
        let line = state.line();
        let level = setext_level(line, state.next_non_space_index())?;
        let lines = matched.paragraph_lines()?;
        if lines.is_empty() {
            return None;
        }
        Some(
            BlockStart::of(
                NodeValue::Heading(Heading { level, setext: true }),
                HeadingParser {
                    content: Some(lines),
                },
            )
            .at_index(line.len())
            .replace_active_block_parser(),
        )
    }
}
