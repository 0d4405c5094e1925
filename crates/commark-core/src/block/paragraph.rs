use crate::ast::NodeValue;
use crate::reference::{scan_definitions, ScannedDefinition};
use crate::span::push_span;

use super::{BlockContext, BlockContinue, BlockParser, ParserState, SourceLine, SourceLines};

/// Collects paragraph lines. Link reference definitions at the start are
/// split off when the paragraph closes.
pub(super) struct ParagraphParser {
    lines: SourceLines,
    remainder: Option<SourceLines>,
}

impl ParagraphParser {
    pub(super) fn new() -> Self {
        Self {
            lines: SourceLines::new(),
            remainder: None,
        }
    }

    /// Number of leading lines taken by definitions, with the definitions.
    fn split_definitions(&self) -> (usize, Vec<ScannedDefinition>) {
        let starts_with_bracket = self
            .lines
            .lines()
            .first()
            .is_some_and(|line| line.content.trim_start().starts_with('['));
        if !starts_with_bracket {
            return (0, Vec::new());
        }

        let content = self.lines.content();
        let found = scan_definitions(&content);
        let consumed = match found.last() {
            None => 0,
            Some(last) if last.end >= content.len() => self.lines.len(),
            Some(last) => content[..last.end].matches('\n').count(),
        };
        (consumed, found)
    }
}

impl BlockParser for ParagraphParser {
    fn can_have_lazy_continuation_lines(&self) -> bool {
        true
    }

    fn try_continue(&mut self, state: &ParserState<'_>) -> Option<BlockContinue> {
        (!state.is_blank()).then(|| BlockContinue::AtIndex(state.index()))
    }

    fn add_line(&mut self, line: SourceLine) {
        self.lines.push(line);
    }

    fn close_block(&mut self, ctx: &mut BlockContext<'_>) {
        let (consumed, found) = self.split_definitions();
        let node = ctx.node();

        let mut line_start = 0;
        let mut line = 0;
        for scanned in found {
            let def_node = ctx
                .document_mut()
                .new_node(NodeValue::LinkReferenceDefinition(scanned.definition.clone()));
            // Spans of the lines this definition covers.
            while line < self.lines.len() && line_start < scanned.end {
                if let Some(span) = self.lines.lines()[line].span {
                    push_span(&mut ctx.document_mut().get_mut(def_node).spans, span);
                }
                line_start += self.lines.lines()[line].content.len() + 1;
                line += 1;
            }
            ctx.document_mut().attach_before(node, def_node);
            ctx.define(scanned.definition);
        }

        let remainder = self.lines.split_off(consumed);
        if remainder.is_empty() {
            ctx.document_mut().discard(node);
        } else {
            self.remainder = Some(remainder);
        }
    }

    fn inline_content(&mut self) -> Option<SourceLines> {
        self.remainder.take()
    }

    fn has_paragraph_content(&self) -> bool {
        let (consumed, _) = self.split_definitions();
        consumed < self.lines.len()
    }

    fn paragraph_lines(&self) -> Option<SourceLines> {
        let (consumed, _) = self.split_definitions();
        let mut lines = self.lines.clone();
        Some(lines.split_off(consumed))
    }
}
