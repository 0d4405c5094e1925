use crate::ast::NodeValue;
use crate::chars::CODE_BLOCK_INDENT;

use super::heading::setext_level;
use super::{BlockContinue, BlockParser, BlockParserFactory, BlockStart, MatchedBlock, ParserState};

/// Three or more matching `-`, `_` or `*`, optionally separated by spaces
/// or tabs, and nothing else.
pub(crate) fn is_thematic_break(line: &str, from: usize) -> bool {
    let mut marker = None;
    let mut count = 0;
    for &b in &line.as_bytes()[from..] {
        match b {
            b'-' | b'_' | b'*' => match marker {
                None => {
                    marker = Some(b);
                    count = 1;
                }
                Some(m) if m == b => count += 1,
                Some(_) => return false,
            },
            b' ' | b'\t' => {}
            _ => return false,
        }
    }
    count >= 3
}

struct ThematicBreakParser;

impl BlockParser for ThematicBreakParser {
    fn try_continue(&mut self, _state: &ParserState<'_>) -> Option<BlockContinue> {
        None
    }
}

/// Starts `***`, `---` and `___` breaks.
pub struct ThematicBreakFactory;

impl BlockParserFactory for ThematicBreakFactory {
    fn try_start(&self, state: &ParserState<'_>, matched: &MatchedBlock<'_>) -> Option<BlockStart> {
        if state.indent() >= CODE_BLOCK_INDENT {
            return None;
        }
        let line = state.line();
        let nns = state.next_non_space_index();
        if !is_thematic_break(line, nns) {
            return None;
        }
        // `---` under paragraph text is a setext underline instead.
        if setext_level(line, nns) == Some(2) && matched.has_paragraph_content() {
            return None;
        }
        Some(BlockStart::of(NodeValue::ThematicBreak, ThematicBreakParser).at_index(line.len()))
    }
}
