use crate::ast::NodeValue;

use super::{BlockContinue, BlockParser, ParserState};

/// Parser for the root. It continues every line and contains anything.
pub(super) struct DocumentParser;

impl BlockParser for DocumentParser {
    fn is_container(&self) -> bool {
        true
    }

    fn can_contain(&mut self, _child: &NodeValue) -> bool {
        true
    }

    fn try_continue(&mut self, state: &ParserState<'_>) -> Option<BlockContinue> {
        Some(BlockContinue::AtIndex(state.index()))
    }
}
