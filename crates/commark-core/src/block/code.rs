use memchr::memchr;

use crate::ast::{CodeBlock, Fence, NodeValue};
use crate::chars::{is_blank, skip, skip_space_tab, unescape, CODE_BLOCK_INDENT};

use super::{BlockContext, BlockContinue, BlockParser, BlockParserFactory, BlockStart, MatchedBlock, ParserState, SourceLine};

struct FencedCodeParser {
    character: u8,
    length: usize,
    indent: usize,
    closing_length: Option<usize>,
    /// Rest of the opening line, the raw info string.
    info: Option<String>,
    literal: String,
}

impl FencedCodeParser {
    /// A closing fence is at least as long as the opening one and is
    /// followed only by spaces and tabs.
    fn try_closing(&mut self, line: &str, index: usize) -> bool {
        let fences = skip(self.character, line, index) - index;
        if fences < self.length {
            return false;
        }
        if skip_space_tab(line, index + fences) != line.len() {
            return false;
        }
        self.closing_length = Some(fences);
        true
    }
}

impl BlockParser for FencedCodeParser {
    fn try_continue(&mut self, state: &ParserState<'_>) -> Option<BlockContinue> {
        let line = state.line();
        let nns = state.next_non_space_index();
        if state.indent() < CODE_BLOCK_INDENT
            && line.as_bytes().get(nns) == Some(&self.character)
            && self.try_closing(line, nns)
        {
            return Some(BlockContinue::Finished);
        }

        // Strip up to the opening fence's indentation.
        let bytes = line.as_bytes();
        let mut index = state.index();
        let mut remaining = self.indent;
        while remaining > 0 && bytes.get(index) == Some(&b' ') {
            index += 1;
            remaining -= 1;
        }
        Some(BlockContinue::AtIndex(index))
    }

    fn add_line(&mut self, line: SourceLine) {
        if self.info.is_none() {
            self.info = Some(line.content);
        } else {
            self.literal.push_str(&line.content);
            self.literal.push('\n');
        }
    }

    fn close_block(&mut self, ctx: &mut BlockContext<'_>) {
        let info = self.info.take().unwrap_or_default();
        if let NodeValue::CodeBlock(code) = ctx.value_mut() {
            code.info = unescape(info.trim()).into_owned();
            code.literal = std::mem::take(&mut self.literal);
            if let Some(fence) = code.fence.as_mut() {
                fence.closing_length = self.closing_length;
            }
        }
    }
}

/// Starts ```` ``` ```` and `~~~` fenced code blocks.
pub struct FencedCodeFactory;

impl BlockParserFactory for FencedCodeFactory {
    fn try_start(&self, state: &ParserState<'_>, _matched: &MatchedBlock<'_>) -> Option<BlockStart> {
        if state.indent() >= CODE_BLOCK_INDENT {
            return None;
        }
        let line = state.line();
        let nns = state.next_non_space_index();
        let character = match line.as_bytes().get(nns)? {
            c @ (b'`' | b'~') => *c,
            _ => return None,
        };
        let length = skip(character, line, nns) - nns;
        if length < 3 {
            return None;
        }
        // Backtick fences cannot have backticks in the info string.
        if character == b'`' && memchr(b'`', &line.as_bytes()[nns + length..]).is_some() {
            return None;
        }

        let fence = Fence {
            character: character as char,
            length,
            indent: state.indent(),
            closing_length: None,
        };
        let value = NodeValue::CodeBlock(CodeBlock {
            fence: Some(fence),
            info: String::new(),
            literal: String::new(),
        });
        let parser = FencedCodeParser {
            character,
            length,
            indent: state.indent(),
            closing_length: None,
            info: None,
            literal: String::new(),
        };
        Some(BlockStart::of(value, parser).at_index(nns + length))
    }
}

struct IndentedCodeParser {
    lines: Vec<String>,
}

impl BlockParser for IndentedCodeParser {
    fn try_continue(&mut self, state: &ParserState<'_>) -> Option<BlockContinue> {
        if state.indent() >= CODE_BLOCK_INDENT {
            Some(BlockContinue::AtColumn(state.column() + CODE_BLOCK_INDENT))
        } else if state.is_blank() {
            Some(BlockContinue::AtIndex(state.next_non_space_index()))
        } else {
            None
        }
    }

    fn add_line(&mut self, line: SourceLine) {
        self.lines.push(line.content);
    }

    fn close_block(&mut self, ctx: &mut BlockContext<'_>) {
        // Trailing blank lines are not part of the block.
        let keep = self
            .lines
            .iter()
            .rposition(|line| !is_blank(line))
            .map_or(0, |last| last + 1);
        let mut literal = String::new();
        for line in &self.lines[..keep] {
            literal.push_str(line);
            literal.push('\n');
        }
        if let NodeValue::CodeBlock(code) = ctx.value_mut() {
            code.literal = literal;
        }
    }
}

/// Starts code blocks indented by four or more columns.
pub struct IndentedCodeFactory;

impl BlockParserFactory for IndentedCodeFactory {
    fn try_start(&self, state: &ParserState<'_>, _matched: &MatchedBlock<'_>) -> Option<BlockStart> {
        // Indented code cannot interrupt a paragraph, lazy or not.
        if state.indent() < CODE_BLOCK_INDENT
            || state.is_blank()
            || matches!(state.active_block(), NodeValue::Paragraph)
        {
            return None;
        }
        let value = NodeValue::CodeBlock(CodeBlock {
            fence: None,
            info: String::new(),
            literal: String::new(),
        });
        Some(
            BlockStart::of(value, IndentedCodeParser { lines: Vec::new() })
                .at_column(state.column() + CODE_BLOCK_INDENT),
        )
    }
}
