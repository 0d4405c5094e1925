//! Block structure phase.
//!
//! The input is consumed one line at a time. For every line the engine
//! walks the stack of open blocks from the root down, asking each block
//! whether the line continues it. Whatever remains of the line is then
//! offered to the block start factories, which may open new blocks.
//! Remaining text is added to the deepest open block, or to a paragraph.
//!
//! Blocks are closed innermost first, either when a line no longer
//! continues them or at the end of input. Leaf blocks that carry inline
//! content are remembered so the inline phase can process them once all
//! link reference definitions are known.

mod block_quote;
mod code;
mod document;
mod heading;
pub(crate) mod html;
mod list;
mod paragraph;
mod thematic_break;

use std::iter;

use crate::ast::{Document, NodeId, NodeValue};
use crate::chars::{columns_to_next_tab_stop, CODE_BLOCK_INDENT};
use crate::lexer::{strip_bom, Lexer, Line};
use crate::reference::{LinkReferenceDefinition, LinkReferenceMap};
use crate::span::{push_span, IncludeSourceSpans, SourceSpan};

pub use block_quote::BlockQuoteFactory;
pub use code::{FencedCodeFactory, IndentedCodeFactory};
pub use heading::{AtxHeadingFactory, SetextHeadingFactory};
pub use html::HtmlBlockFactory;
pub use list::ListFactory;
pub use thematic_break::ThematicBreakFactory;

use document::DocumentParser as RootParser;
use paragraph::ParagraphParser;

/// A line (or the rest of one) handed to a block parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub content: String,
    /// Where `content` came from, when inline spans are enabled.
    pub span: Option<SourceSpan>,
}

/// Lines accumulated by a leaf block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLines {
    lines: Vec<SourceLine>,
}

impl SourceLines {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: SourceLine) {
        self.lines.push(line);
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn lines(&self) -> &[SourceLine] {
        &self.lines
    }

    /// Lines joined with `\n`.
    pub fn content(&self) -> String {
        let mut out = String::new();
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&line.content);
        }
        out
    }

    pub fn spans(&self) -> impl Iterator<Item = SourceSpan> + '_ {
        self.lines.iter().filter_map(|line| line.span)
    }

    /// Split off the lines from `at` onwards.
    pub fn split_off(&mut self, at: usize) -> SourceLines {
        SourceLines {
            lines: self.lines.split_off(at),
        }
    }
}

impl From<Vec<SourceLine>> for SourceLines {
    fn from(lines: Vec<SourceLine>) -> Self {
        Self { lines }
    }
}

/// How a block accepted a line during the continuation walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockContinue {
    /// Continue, with the rest of the line starting at this byte index.
    AtIndex(usize),
    /// Continue, with the rest of the line starting at this column.
    AtColumn(usize),
    /// The line closes the block and is consumed by it (closing fences).
    Finished,
}

/// The result of a successful block start factory.
pub struct BlockStart {
    blocks: Vec<(NodeValue, Box<dyn BlockParser>)>,
    new_index: Option<usize>,
    new_column: Option<usize>,
    replace_active: bool,
}

impl BlockStart {
    /// Open one new block with its parser.
    pub fn of(value: NodeValue, parser: impl BlockParser + 'static) -> Self {
        Self {
            blocks: vec![(value, Box::new(parser))],
            new_index: None,
            new_column: None,
            replace_active: false,
        }
    }

    /// Open another block nested in the previous one.
    pub fn and(mut self, value: NodeValue, parser: impl BlockParser + 'static) -> Self {
        self.blocks.push((value, Box::new(parser)));
        self
    }

    /// Continue the line at byte `index`.
    pub fn at_index(mut self, index: usize) -> Self {
        self.new_index = Some(index);
        self
    }

    /// Continue the line at `column`, splitting tabs as needed.
    pub fn at_column(mut self, column: usize) -> Self {
        self.new_column = Some(column);
        self
    }

    /// The new block takes the place of the matched paragraph.
    pub fn replace_active_block_parser(mut self) -> Self {
        self.replace_active = true;
        self
    }
}

/// Parses one kind of block.
///
/// A parser lives as long as its block is open. The tree node is created by
/// the engine from the [`BlockStart`]; the parser only keeps what it needs
/// to accept lines and writes its final content in
/// [`close_block`](BlockParser::close_block).
pub trait BlockParser {
    /// Containers hold other blocks; leaves hold lines.
    fn is_container(&self) -> bool {
        false
    }

    fn can_have_lazy_continuation_lines(&self) -> bool {
        false
    }

    /// Whether a new child block with `child` value can go inside this one.
    /// Called right before the child is appended.
    fn can_contain(&mut self, child: &NodeValue) -> bool {
        let _ = child;
        false
    }

    /// Decide whether the current line continues this block.
    fn try_continue(&mut self, state: &ParserState<'_>) -> Option<BlockContinue>;

    fn add_line(&mut self, line: SourceLine) {
        let _ = line;
    }

    /// Called once when the block is closed.
    fn close_block(&mut self, ctx: &mut BlockContext<'_>) {
        let _ = ctx;
    }

    /// Content for the inline phase, taken once after the block is closed.
    fn inline_content(&mut self) -> Option<SourceLines> {
        None
    }

    /// For paragraphs: the lines that are not link reference definitions.
    fn paragraph_lines(&self) -> Option<SourceLines> {
        None
    }

    /// Whether [`paragraph_lines`](BlockParser::paragraph_lines) is
    /// non-empty.
    fn has_paragraph_content(&self) -> bool {
        self.paragraph_lines().is_some_and(|lines| !lines.is_empty())
    }
}

/// Tries to start a block on the current line.
pub trait BlockParserFactory: Send + Sync {
    fn try_start(&self, state: &ParserState<'_>, matched: &MatchedBlock<'_>) -> Option<BlockStart>;
}

/// Read-only view of the line being parsed.
pub struct ParserState<'a> {
    cursor: &'a LineCursor,
    active: &'a NodeValue,
    active_is_lazy: bool,
}

impl<'a> ParserState<'a> {
    /// The full current line.
    pub fn line(&self) -> &'a str {
        &self.cursor.line
    }

    pub fn line_index(&self) -> usize {
        self.cursor.line_index
    }

    /// Byte index up to which the line has been consumed.
    pub fn index(&self) -> usize {
        self.cursor.index
    }

    /// Byte index of the next character that is not a space or tab.
    pub fn next_non_space_index(&self) -> usize {
        self.cursor.next_non_space
    }

    /// Column of [`index`](Self::index), with tabs expanded.
    pub fn column(&self) -> usize {
        self.cursor.column
    }

    /// Columns between the current position and the next non-space.
    pub fn indent(&self) -> usize {
        self.cursor.indent
    }

    /// Whether the rest of the line is spaces and tabs only.
    pub fn is_blank(&self) -> bool {
        self.cursor.blank
    }

    /// The deepest open block, which may not have matched this line.
    pub fn active_block(&self) -> &'a NodeValue {
        self.active
    }

    pub fn active_block_can_have_lazy_continuation_lines(&self) -> bool {
        self.active_is_lazy
    }

    /// Source span of the byte range `start..end` of the current line.
    pub fn span(&self, start: usize, end: usize) -> SourceSpan {
        SourceSpan::new(
            self.cursor.line_index,
            start,
            self.cursor.line_offset + start,
            end.saturating_sub(start),
        )
    }
}

/// The deepest block that matched the current line.
pub struct MatchedBlock<'a> {
    value: &'a NodeValue,
    parser: &'a dyn BlockParser,
}

impl<'a> MatchedBlock<'a> {
    pub fn value(&self) -> &'a NodeValue {
        self.value
    }

    /// Paragraph lines after link reference definitions, if this is a
    /// paragraph.
    pub fn paragraph_lines(&self) -> Option<SourceLines> {
        self.parser.paragraph_lines()
    }

    /// Whether this is a paragraph with content that is not just
    /// definitions.
    pub fn has_paragraph_content(&self) -> bool {
        self.parser.has_paragraph_content()
    }
}

/// Mutable access to the tree for a block that is being closed.
pub struct BlockContext<'a> {
    doc: &'a mut Document,
    node: NodeId,
    definitions: &'a mut LinkReferenceMap,
}

impl BlockContext<'_> {
    /// The node of the block being closed.
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn value_mut(&mut self) -> &mut NodeValue {
        &mut self.doc.get_mut(self.node).value
    }

    pub fn document(&self) -> &Document {
        self.doc
    }

    pub fn document_mut(&mut self) -> &mut Document {
        self.doc
    }

    /// Register a link reference definition. Returns false if the label
    /// was already defined.
    pub fn define(&mut self, definition: LinkReferenceDefinition) -> bool {
        self.definitions.insert(definition)
    }
}

/// Position tracking within the current line.
#[derive(Debug, Default)]
pub(crate) struct LineCursor {
    line: String,
    line_index: usize,
    line_offset: usize,
    index: usize,
    column: usize,
    column_is_in_tab: bool,
    next_non_space: usize,
    next_non_space_column: usize,
    indent: usize,
    blank: bool,
}

impl LineCursor {
    fn set_line(&mut self, line: &Line<'_>) {
        self.line.clear();
        self.line.push_str(&line.text);
        self.line_index = line.index;
        self.line_offset = line.offset;
        self.index = 0;
        self.column = 0;
        self.column_is_in_tab = false;
    }

    fn find_next_non_space(&mut self) {
        let bytes = self.line.as_bytes();
        let mut i = self.index;
        let mut cols = self.column;
        self.blank = true;
        while i < bytes.len() {
            match bytes[i] {
                b' ' => cols += 1,
                b'\t' => cols += columns_to_next_tab_stop(cols),
                _ => {
                    self.blank = false;
                    break;
                }
            }
            i += 1;
        }
        self.next_non_space = i;
        self.next_non_space_column = cols;
        self.indent = cols - self.column;
    }

    fn set_new_index(&mut self, new_index: usize) {
        if new_index >= self.next_non_space {
            self.index = self.next_non_space;
            self.column = self.next_non_space_column;
        }
        while self.index < new_index && self.index != self.line.len() {
            self.advance();
        }
        self.column_is_in_tab = false;
    }

    fn set_new_column(&mut self, new_column: usize) {
        if new_column >= self.next_non_space_column {
            self.index = self.next_non_space;
            self.column = self.next_non_space_column;
        }
        while self.column < new_column && self.index != self.line.len() {
            self.advance();
        }
        if self.column > new_column {
            // Overshot inside a tab: step back onto it.
            self.index -= 1;
            self.column = new_column;
            self.column_is_in_tab = true;
        } else {
            self.column_is_in_tab = false;
        }
    }

    fn advance(&mut self) {
        match self.line[self.index..].chars().next() {
            Some('\t') => {
                self.index += 1;
                self.column += columns_to_next_tab_stop(self.column);
            }
            Some(c) => {
                self.index += c.len_utf8();
                self.column += 1;
            }
            None => {}
        }
    }

    /// The unconsumed rest of the line. A partially consumed tab becomes
    /// the spaces left until its tab stop.
    fn rest(&self) -> String {
        if self.column_is_in_tab {
            let after_tab = self.index + 1;
            let spaces = columns_to_next_tab_stop(self.column);
            let mut out = String::with_capacity(spaces + self.line.len() - after_tab);
            out.extend(iter::repeat(' ').take(spaces));
            out.push_str(&self.line[after_tab..]);
            out
        } else {
            self.line[self.index..].to_string()
        }
    }
}

struct OpenBlock {
    parser: Box<dyn BlockParser>,
    node: NodeId,
    /// Where this block's content starts on the current line.
    source_index: usize,
}

/// Output of the block phase.
pub(crate) struct BlockTree {
    pub document: Document,
    pub definitions: LinkReferenceMap,
    /// Blocks with inline content, in the order they were closed.
    pub inline_blocks: Vec<(NodeId, SourceLines)>,
}

/// The block phase engine.
pub(crate) struct BlockEngine<'p> {
    factories: &'p [Box<dyn BlockParserFactory>],
    letters_cannot_start_blocks: bool,
    spans: IncludeSourceSpans,
    max_depth: usize,
    cursor: LineCursor,
    doc: Document,
    definitions: LinkReferenceMap,
    open: Vec<OpenBlock>,
    inline_blocks: Vec<(NodeId, SourceLines)>,
}

impl<'p> BlockEngine<'p> {
    /// `factories` must hold the custom factories followed by the core ones;
    /// `custom_factories` says how many of them are custom.
    pub(crate) fn new(
        factories: &'p [Box<dyn BlockParserFactory>],
        custom_factories: usize,
        spans: IncludeSourceSpans,
        max_depth: usize,
    ) -> Self {
        let doc = Document::new();
        let root = OpenBlock {
            parser: Box::new(RootParser),
            node: doc.root(),
            source_index: 0,
        };
        Self {
            factories,
            letters_cannot_start_blocks: custom_factories == 0,
            spans,
            max_depth,
            cursor: LineCursor::default(),
            doc,
            definitions: LinkReferenceMap::new(),
            open: vec![root],
            inline_blocks: Vec::new(),
        }
    }

    pub(crate) fn parse(mut self, input: &str) -> BlockTree {
        let mut lines = 0usize;
        for line in Lexer::new(strip_bom(input)) {
            self.parse_line(&line);
            lines += 1;
        }
        let remaining = self.open.len() - 1;
        self.close_blocks(remaining);

        log::debug!(
            target: "commark::block",
            "parsed {lines} lines, {} definitions, {} inline blocks",
            self.definitions.len(),
            self.inline_blocks.len()
        );
        BlockTree {
            document: self.doc,
            definitions: self.definitions,
            inline_blocks: self.inline_blocks,
        }
    }

    fn active(&self) -> &OpenBlock {
        self.open.last().expect("document block is always open")
    }

    fn active_mut(&mut self) -> &mut OpenBlock {
        self.open.last_mut().expect("document block is always open")
    }

    fn parse_line(&mut self, line: &Line<'_>) {
        self.cursor.set_line(line);

        // Which open blocks does the line continue?
        let mut matches = 1;
        for i in 1..self.open.len() {
            self.cursor.find_next_non_space();
            let active = self.open.last().expect("document block is always open");
            let active_node = active.node;
            let active_is_lazy = active.parser.can_have_lazy_continuation_lines();
            let state = ParserState {
                cursor: &self.cursor,
                active: self.doc.value(active_node),
                active_is_lazy,
            };
            let Some(result) = self.open[i].parser.try_continue(&state) else {
                break;
            };
            self.open[i].source_index = self.cursor.index;
            match result {
                BlockContinue::Finished => {
                    self.add_source_spans();
                    let count = self.open.len() - i;
                    self.close_blocks(count);
                    return;
                }
                BlockContinue::AtIndex(index) => self.cursor.set_new_index(index),
                BlockContinue::AtColumn(column) => self.cursor.set_new_column(column),
            }
            matches += 1;
        }

        let mut unmatched = self.open.len() - matches;
        let mut current = matches - 1;
        let mut started_new_block = false;
        let mut last_index = self.cursor.index;

        let mut try_block_starts = {
            let block = &self.open[current];
            block.parser.is_container()
                || matches!(self.doc.value(block.node), NodeValue::Paragraph)
        };

        while try_block_starts {
            last_index = self.cursor.index;
            self.cursor.find_next_non_space();

            let next = self.cursor.line.as_bytes().get(self.cursor.next_non_space);
            if self.cursor.blank
                || (self.letters_cannot_start_blocks
                    && self.cursor.indent < CODE_BLOCK_INDENT
                    && next.is_some_and(u8::is_ascii_alphabetic))
            {
                self.cursor.set_new_index(self.cursor.next_non_space);
                break;
            }

            let Some(start) = self.find_block_start(current) else {
                self.cursor.set_new_index(self.cursor.next_non_space);
                break;
            };

            started_new_block = true;
            let source_index = self.cursor.index;

            if unmatched > 0 {
                self.close_blocks(unmatched);
                unmatched = 0;
            }

            if let Some(index) = start.new_index {
                self.cursor.set_new_index(index);
            } else if let Some(column) = start.new_column {
                self.cursor.set_new_column(column);
            }

            let replaced_spans = start.replace_active.then(|| self.replace_active());

            for (value, parser) in start.blocks {
                try_block_starts = parser.is_container();
                let node = self.add_child(value, parser, source_index);
                if let Some(spans) = &replaced_spans {
                    self.doc.get_mut(node).spans = spans.clone();
                }
                current = self.open.len() - 1;
            }
        }

        if !started_new_block
            && !self.cursor.blank
            && self.active().parser.can_have_lazy_continuation_lines()
        {
            // Paragraph continuation, possibly lazy.
            self.active_mut().source_index = last_index;
            self.add_line();
        } else {
            if unmatched > 0 {
                self.close_blocks(unmatched);
            }
            if !self.active().parser.is_container() {
                self.add_line();
            } else if !self.cursor.blank {
                self.add_child(NodeValue::Paragraph, Box::new(ParagraphParser::new()), last_index);
                self.add_line();
            } else {
                self.add_source_spans();
            }
        }
    }

    fn find_block_start(&self, current: usize) -> Option<BlockStart> {
        let active = self.active();
        let state = ParserState {
            cursor: &self.cursor,
            active: self.doc.value(active.node),
            active_is_lazy: active.parser.can_have_lazy_continuation_lines(),
        };
        let block = &self.open[current];
        let matched = MatchedBlock {
            value: self.doc.value(block.node),
            parser: block.parser.as_ref(),
        };
        // Only the innermost open block can be a leaf.
        let nesting = if block.parser.is_container() { current } else { current - 1 };
        let room = self.max_depth.saturating_sub(nesting);
        self.factories.iter().find_map(|factory| {
            let start = factory.try_start(&state, &matched)?;
            let containers = start.blocks.iter().filter(|(_, parser)| parser.is_container()).count();
            if containers > room {
                log::debug!(
                    target: "commark::block",
                    "nesting depth {} reached on line {}, skipping a container start",
                    self.max_depth,
                    self.cursor.line_index
                );
                return None;
            }
            Some(start)
        })
    }

    fn add_child(&mut self, value: NodeValue, parser: Box<dyn BlockParser>, source_index: usize) -> NodeId {
        while !self.active_mut().parser.can_contain(&value) {
            self.close_blocks(1);
        }
        let parent = self.active().node;
        let node = self.doc.new_node(value);
        self.doc.attach(parent, node);
        self.open.push(OpenBlock {
            parser,
            node,
            source_index,
        });
        node
    }

    fn add_line(&mut self) {
        let content = self.cursor.rest();
        let span = self.spans.inlines().then(|| {
            SourceSpan::new(
                self.cursor.line_index,
                self.cursor.index,
                self.cursor.line_offset + self.cursor.index,
                content.len(),
            )
        });
        self.active_mut().parser.add_line(SourceLine { content, span });
        self.add_source_spans();
    }

    fn add_source_spans(&mut self) {
        if !self.spans.blocks() {
            return;
        }
        let cursor = &self.cursor;
        // The document itself gets no spans.
        for block in &self.open[1..] {
            let length = cursor.line.len().saturating_sub(block.source_index);
            if length == 0 {
                continue;
            }
            let span = SourceSpan::new(
                cursor.line_index,
                block.source_index,
                cursor.line_offset + block.source_index,
                length,
            );
            push_span(&mut self.doc.get_mut(block.node).spans, span);
        }
    }

    /// Close the innermost `count` open blocks.
    fn close_blocks(&mut self, count: usize) {
        for _ in 0..count {
            let block = self.open.pop().expect("closing more blocks than are open");
            assert!(!self.open.is_empty(), "document block was closed");
            self.finalize(block, true);
        }
    }

    fn finalize(&mut self, mut block: OpenBlock, collect_inlines: bool) {
        let mut ctx = BlockContext {
            doc: &mut self.doc,
            node: block.node,
            definitions: &mut self.definitions,
        };
        block.parser.close_block(&mut ctx);
        if collect_inlines && !self.doc.is_removed(block.node) {
            if let Some(lines) = block.parser.inline_content() {
                self.inline_blocks.push((block.node, lines));
            }
        }
    }

    /// Close and drop the active block so a new block can take its place.
    /// Returns the block spans of the replaced block.
    fn replace_active(&mut self) -> Vec<SourceSpan> {
        let block = self.open.pop().expect("document block is always open");
        let node = block.node;
        let spans = std::mem::take(&mut self.doc.get_mut(node).spans);
        self.finalize(block, false);
        if !self.doc.is_removed(node) {
            self.doc.discard(node);
        }
        spans
    }
}

/// The core block start factories in the order they are tried.
pub(crate) fn core_factories() -> Vec<Box<dyn BlockParserFactory>> {
    vec![
        Box::new(ThematicBreakFactory),
        Box::new(AtxHeadingFactory),
        Box::new(FencedCodeFactory),
        Box::new(BlockQuoteFactory),
        Box::new(ListFactory),
        Box::new(HtmlBlockFactory),
        Box::new(IndentedCodeFactory),
        Box::new(SetextHeadingFactory),
    ]
}
