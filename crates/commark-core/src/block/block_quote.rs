use crate::ast::NodeValue;
use crate::chars::{is_space_or_tab, CODE_BLOCK_INDENT};

use super::{BlockContinue, BlockParser, BlockParserFactory, BlockStart, MatchedBlock, ParserState};

/// Column after a `>` marker (and one optional following space), if the
/// line has one at the current position.
fn marker_end_column(state: &ParserState<'_>) -> Option<usize> {
    let line = state.line().as_bytes();
    let nns = state.next_non_space_index();
    if state.indent() >= CODE_BLOCK_INDENT || line.get(nns) != Some(&b'>') {
        return None;
    }
    let mut column = state.column() + state.indent() + 1;
    if line.get(nns + 1).is_some_and(|&b| is_space_or_tab(b)) {
        column += 1;
    }
    Some(column)
}

struct BlockQuoteParser;

impl BlockParser for BlockQuoteParser {
    fn is_container(&self) -> bool {
        true
    }

    fn can_contain(&mut self, _child: &NodeValue) -> bool {
        true
    }

    fn try_continue(&mut self, state: &ParserState<'_>) -> Option<BlockContinue> {
        marker_end_column(state).map(BlockContinue::AtColumn)
    }
}

/// Starts `>` block quotes.
pub struct BlockQuoteFactory;

impl BlockParserFactory for BlockQuoteFactory {
    fn try_start(&self, state: &ParserState<'_>, _matched: &MatchedBlock<'_>) -> Option<BlockStart> {
        let column = marker_end_column(state)?;
        Some(BlockStart::of(NodeValue::BlockQuote, BlockQuoteParser).at_column(column))
    }
}
