//! Inline phase.
//!
//! Each leaf block with inline content is parsed on its own. The content
//! is scanned forward once. Trigger characters are offered to the inline
//! content parsers, delimiter runs are pushed on the delimiter stack as text
//! nodes, and `[` / `![` are pushed on the bracket stack. A `]` resolves
//! the nearest bracket into a link or image, or leaves it as text. When the
//! scan ends, the remaining delimiters are matched into emphasis and
//! adjacent text nodes are merged.

pub mod content;
pub mod delimiter;
pub mod scanner;

use std::collections::{HashMap, HashSet};

use crate::ast::{Document, Link, NodeId, NodeValue};
use crate::block::SourceLines;
use crate::chars::{is_punctuation, is_whitespace};
use crate::error::ConfigError;
use crate::link::{parse_destination, parse_label, parse_title, MAX_LABEL_LENGTH};
use crate::reference::LinkReferenceMap;
use crate::span::{push_span, SourceSpan};

use content::{builtin_factories, InlineContentParser, InlineContentParserFactory, InlineNode, InlineParserState};
use delimiter::{Delimiter, DelimiterMatch, DelimiterProcessor, EmphasisDelimiterProcessor};
use scanner::Scanner;

/// Characters the engine handles before any trigger lookup.
const RESERVED: [char; 4] = ['[', ']', '!', '\n'];

/// Characters that interrupt a run of plain text.
#[derive(Debug)]
struct SpecialChars {
    ascii: [bool; 128],
    other: HashSet<char>,
}

impl Default for SpecialChars {
    fn default() -> Self {
        Self {
            ascii: [false; 128],
            other: HashSet::new(),
        }
    }
}

impl SpecialChars {
    fn insert(&mut self, c: char) {
        if c.is_ascii() {
            self.ascii[c as usize] = true;
        } else {
            self.other.insert(c);
        }
    }

    #[inline]
    fn contains(&self, c: char) -> bool {
        if c.is_ascii() {
            self.ascii[c as usize]
        } else {
            self.other.contains(&c)
        }
    }
}

/// Inline configuration, validated once when the parser is built.
pub(crate) struct InlineConfig {
    /// Custom factories first, then the built-ins.
    factories: Vec<Box<dyn InlineContentParserFactory>>,
    /// Factory indices per trigger character, in priority order.
    triggers: HashMap<char, Vec<usize>>,
    processors: Vec<Box<dyn DelimiterProcessor>>,
    /// Processor index per opening and closing character.
    processor_for: HashMap<char, usize>,
    special: SpecialChars,
}

impl InlineConfig {
    pub(crate) fn new(
        custom_factories: Vec<Box<dyn InlineContentParserFactory>>,
        custom_processors: Vec<Box<dyn DelimiterProcessor>>,
    ) -> Result<Self, ConfigError> {
        let mut processors: Vec<Box<dyn DelimiterProcessor>> = vec![
            Box::new(EmphasisDelimiterProcessor::new('*')),
            Box::new(EmphasisDelimiterProcessor::new('_')),
        ];
        processors.extend(custom_processors);

        let mut processor_for = HashMap::new();
        for (index, processor) in processors.iter().enumerate() {
            let opening = processor.opening_character();
            let closing = processor.closing_character();
            if processor.min_length() == 0 {
                return Err(ConfigError::InvalidMinLength(opening));
            }
            let mut chars = vec![opening];
            if closing != opening {
                chars.push(closing);
            }
            for c in chars {
                if processor_for.insert(c, index).is_some() {
                    return Err(ConfigError::DelimiterConflict {
                        opening,
                        closing,
                        existing: c,
                    });
                }
            }
        }

        let mut triggers: HashMap<char, Vec<usize>> = HashMap::new();
        for (index, factory) in custom_factories.iter().enumerate() {
            for c in factory.trigger_characters() {
                if RESERVED.contains(&c) {
                    return Err(ConfigError::ReservedTrigger(c));
                }
                if processor_for.contains_key(&c) {
                    return Err(ConfigError::TriggerDelimiterConflict(c));
                }
                let slot = triggers.entry(c).or_default();
                if !slot.is_empty() {
                    return Err(ConfigError::DuplicateTrigger(c));
                }
                slot.push(index);
            }
        }

        let mut factories = custom_factories;
        for factory in builtin_factories() {
            let index = factories.len();
            for c in factory.trigger_characters() {
                triggers.entry(c).or_default().push(index);
            }
            factories.push(factory);
        }

        let mut special = SpecialChars::default();
        for c in RESERVED
            .into_iter()
            .chain(triggers.keys().copied())
            .chain(processor_for.keys().copied())
        {
            special.insert(c);
        }

        log::debug!(
            target: "commark::inline",
            "{} inline content parsers, {} delimiter processors",
            factories.len(),
            processors.len()
        );
        Ok(Self {
            factories,
            triggers,
            processors,
            processor_for,
            special,
        })
    }
}

/// Parse the inline content of `block`, appending the nodes to it.
pub(crate) fn parse_inlines(
    config: &InlineConfig,
    doc: &mut Document,
    definitions: &LinkReferenceMap,
    block: NodeId,
    lines: &SourceLines,
    spans: bool,
) {
    let content = lines.content();
    let parser = InlineParser {
        config,
        doc,
        block,
        state: InlineParserState {
            scanner: Scanner::new(&content),
            definitions,
        },
        parsers: config.factories.iter().map(|factory| factory.create()).collect(),
        delimiters: Vec::new(),
        last_delimiter: None,
        brackets: Vec::new(),
        trailing_spaces: 0,
        lines: spans.then(|| LineMap::new(lines)),
    };
    parser.parse();
}

/// Maps content offsets back to source spans.
struct LineMap {
    starts: Vec<usize>,
    lengths: Vec<usize>,
    spans: Vec<Option<SourceSpan>>,
}

impl LineMap {
    fn new(lines: &SourceLines) -> Self {
        let mut starts = Vec::with_capacity(lines.len());
        let mut lengths = Vec::with_capacity(lines.len());
        let mut spans = Vec::with_capacity(lines.len());
        let mut offset = 0;
        for line in lines.lines() {
            starts.push(offset);
            lengths.push(line.content.len());
            spans.push(line.span);
            offset += line.content.len() + 1;
        }
        Self {
            starts,
            lengths,
            spans,
        }
    }

    fn spans(&self, start: usize, end: usize) -> Vec<SourceSpan> {
        let mut out = Vec::new();
        let first = self.starts.partition_point(|&s| s <= start).saturating_sub(1);
        for line in first..self.starts.len() {
            let line_start = self.starts[line];
            if line_start >= end {
                break;
            }
            let line_end = line_start + self.lengths[line];
            let from = start.max(line_start);
            let to = end.min(line_end);
            if let (Some(span), true) = (self.spans[line], from < to) {
                out.push(span.subspan(from - line_start, to - from));
            }
        }
        out
    }
}

#[derive(Debug, Clone, Copy)]
struct Bracket {
    /// Text node of `[` or `![`.
    node: NodeId,
    marker_position: usize,
    content_position: usize,
    image: bool,
    /// Cleared for links around a link that has been resolved.
    allowed: bool,
    /// Another bracket follows this one, so it cannot be a shortcut
    /// reference.
    bracket_after: bool,
    /// Top of the delimiter stack when the bracket was pushed.
    previous_delimiter: Option<usize>,
}

struct InlineParser<'a> {
    config: &'a InlineConfig,
    doc: &'a mut Document,
    block: NodeId,
    state: InlineParserState<'a>,
    parsers: Vec<Box<dyn InlineContentParser>>,
    delimiters: Vec<Delimiter>,
    last_delimiter: Option<usize>,
    brackets: Vec<Bracket>,
    trailing_spaces: usize,
    lines: Option<LineMap>,
}

impl<'a> InlineParser<'a> {
    fn parse(mut self) {
        while let Some(c) = self.state.scanner.peek() {
            if let Some(node) = self.parse_inline(c) {
                self.doc.attach(self.block, node);
            }
        }
        self.process_delimiters(None);
        self.merge_text_nodes();
    }

    fn parse_inline(&mut self, c: char) -> Option<NodeId> {
        if c != '\n' {
            self.trailing_spaces = 0;
        }
        match c {
            '[' => return Some(self.parse_open_bracket()),
            ']' => return Some(self.parse_close_bracket()),
            '!' => return Some(self.parse_bang()),
            '\n' => return Some(self.parse_line_break()),
            _ => {}
        }
        if !self.config.special.contains(c) {
            return self.parse_text();
        }
        if let Some(node) = self.try_content_parsers(c) {
            return Some(node);
        }
        let config = self.config;
        if let Some(&processor) = config.processor_for.get(&c) {
            if let Some(node) = self.parse_delimiters(processor, c) {
                return Some(node);
            }
        }
        self.parse_text()
    }

    fn set_spans(&mut self, node: NodeId, start: usize, end: usize) {
        if let Some(lines) = &self.lines {
            self.doc.get_mut(node).spans = lines.spans(start, end);
        }
    }

    fn text_node(&mut self, literal: &str, start: usize) -> NodeId {
        let node = self.doc.new_node(NodeValue::Text(literal.to_string()));
        self.set_spans(node, start, start + literal.len());
        node
    }

    fn try_content_parsers(&mut self, c: char) -> Option<NodeId> {
        let config = self.config;
        let indices = config.triggers.get(&c)?;
        let start = self.state.scanner.position();
        let len = self.state.scanner.content().len();
        for &index in indices {
            let Some(parsed) = self.parsers[index].try_parse(&mut self.state) else {
                self.state.scanner.set_position(start);
                continue;
            };
            let end = parsed.position;
            if end <= start || end > len || !self.state.scanner.content().is_char_boundary(end) {
                log::trace!(
                    target: "commark::inline",
                    "ignoring parse of {c:?} at {start} that ends at {end}"
                );
                self.state.scanner.set_position(start);
                continue;
            }
            self.state.scanner.set_position(end);
            let node = self.materialize(parsed.node);
            if self.doc.get(node).spans.is_empty() {
                self.set_spans(node, start, end);
            }
            return Some(node);
        }
        None
    }

    /// Allocate an inline node tree without recursion.
    fn materialize(&mut self, node: InlineNode) -> NodeId {
        let InlineNode { value, children } = node;
        let root = self.doc.new_node(value);
        let mut stack = vec![(root, children.into_iter())];
        loop {
            let Some((parent, children)) = stack.last_mut() else {
                break;
            };
            let parent = *parent;
            match children.next() {
                Some(child) => {
                    let id = self.doc.new_node(child.value);
                    self.doc.attach(parent, id);
                    stack.push((id, child.children.into_iter()));
                }
                None => {
                    stack.pop();
                }
            }
        }
        root
    }

    fn parse_text(&mut self) -> Option<NodeId> {
        let scanner = &mut self.state.scanner;
        let start = scanner.position();
        scanner.next();
        while let Some(c) = scanner.peek() {
            if self.config.special.contains(c) {
                break;
            }
            scanner.next();
        }
        let mut text = scanner.source(start, scanner.position());
        match scanner.peek() {
            Some('\n') => {
                // Trailing spaces decide between hard and soft breaks.
                let trimmed = text.trim_end_matches(' ');
                self.trailing_spaces = text.len() - trimmed.len();
                text = trimmed;
            }
            None => text = text.trim_end_matches([' ', '\t']),
            Some(_) => {}
        }
        if text.is_empty() {
            return None;
        }
        Some(self.text_node(text, start))
    }

    fn parse_line_break(&mut self) -> NodeId {
        let scanner = &mut self.state.scanner;
        let start = scanner.position();
        scanner.next();
        while let Some(' ' | '\t') = scanner.peek() {
            scanner.next();
        }
        let value = if self.trailing_spaces >= 2 {
            NodeValue::HardBreak
        } else {
            NodeValue::SoftBreak
        };
        self.trailing_spaces = 0;
        let node = self.doc.new_node(value);
        self.set_spans(node, start, start + 1);
        node
    }

    fn add_bracket(&mut self, bracket: Bracket) {
        if let Some(last) = self.brackets.last_mut() {
            last.bracket_after = true;
        }
        self.brackets.push(bracket);
    }

    fn parse_open_bracket(&mut self) -> NodeId {
        let start = self.state.scanner.position();
        self.state.scanner.next();
        let node = self.text_node("[", start);
        self.add_bracket(Bracket {
            node,
            marker_position: start,
            content_position: start + 1,
            image: false,
            allowed: true,
            bracket_after: false,
            previous_delimiter: self.last_delimiter,
        });
        node
    }

    fn parse_bang(&mut self) -> NodeId {
        let start = self.state.scanner.position();
        self.state.scanner.next();
        if !self.state.scanner.next_char('[') {
            return self.text_node("!", start);
        }
        let node = self.text_node("![", start);
        self.add_bracket(Bracket {
            node,
            marker_position: start,
            content_position: start + 2,
            image: true,
            allowed: true,
            bracket_after: false,
            previous_delimiter: self.last_delimiter,
        });
        node
    }

    fn parse_close_bracket(&mut self) -> NodeId {
        let before_close = self.state.scanner.position();
        self.state.scanner.next();
        let after_close = self.state.scanner.position();

        let Some(&opener) = self.brackets.last() else {
            return self.text_node("]", before_close);
        };
        if !opener.allowed {
            self.brackets.pop();
            return self.text_node("]", before_close);
        }

        let mut target = None;
        if self.state.scanner.next_char('(') {
            target = self.parse_inline_target();
            if target.is_none() {
                self.state.scanner.set_position(after_close);
            }
        }
        if target.is_none() {
            target = self.parse_reference_target(&opener, before_close, after_close);
        }

        let Some(link) = target else {
            self.brackets.pop();
            self.state.scanner.set_position(after_close);
            return self.text_node("]", before_close);
        };

        self.brackets.pop();
        let value = if opener.image {
            NodeValue::Image(link)
        } else {
            NodeValue::Link(link)
        };
        let node = self.doc.new_node(value);
        let mut next = self.doc.next_sibling(opener.node);
        while let Some(child) = next {
            next = self.doc.next_sibling(child);
            self.doc.unlink(child);
            self.doc.attach(node, child);
        }
        let end = self.state.scanner.position();
        self.set_spans(node, opener.marker_position, end);

        self.process_delimiters(opener.previous_delimiter);
        self.doc.discard(opener.node);

        // No links inside links.
        if !opener.image {
            for bracket in self.brackets.iter_mut().filter(|b| !b.image) {
                bracket.allowed = false;
            }
        }
        node
    }

    /// `(destination "title")` right after the closing bracket. The scanner
    /// is past the `(`.
    fn parse_inline_target(&mut self) -> Option<Link> {
        let scanner = &mut self.state.scanner;
        let content = scanner.content();
        scanner.whitespace();
        let (destination, end) = parse_destination(content, scanner.position())?;
        scanner.set_position(end);

        let mut title = None;
        if scanner.whitespace() >= 1 {
            if let Some((parsed, end)) = parse_title(content, scanner.position()) {
                scanner.set_position(end);
                title = Some(parsed);
            }
            scanner.whitespace();
        }
        scanner.next_char(')').then_some(Link { destination, title })
    }

    /// Full, collapsed and shortcut references. The scanner is right after
    /// the closing bracket.
    fn parse_reference_target(
        &mut self,
        opener: &Bracket,
        before_close: usize,
        after_close: usize,
    ) -> Option<Link> {
        let content = self.state.scanner.content();
        let mut label = match parse_label(content, after_close) {
            Some((label, end)) => {
                self.state.scanner.set_position(end);
                Some(label)
            }
            None => None,
        };
        // `[foo][]` and `[foo]` use the first label, unless it contains a
        // bracket, in which case it cannot match anything.
        if label.map_or(true, str::is_empty) && !opener.bracket_after {
            label = Some(&content[opener.content_position..before_close]);
        }
        let label = label.filter(|label| {
            label.chars().count() <= MAX_LABEL_LENGTH && !label.trim().is_empty()
        })?;
        let definition = self.state.definitions.get(label)?;
        Some(Link {
            destination: definition.destination.clone(),
            title: definition.title.clone(),
        })
    }

    fn parse_delimiters(&mut self, processor: usize, c: char) -> Option<NodeId> {
        let config = self.config;
        let processor = &config.processors[processor];
        let scanner = &mut self.state.scanner;
        let start = scanner.position();
        let before = scanner.peek_previous();
        let count = scanner.match_multiple(c);
        if count < processor.min_length() {
            scanner.set_position(start);
            return None;
        }
        let after = scanner.peek();
        let end = scanner.position();

        // Start and end of content count as whitespace and punctuation.
        let before_whitespace = before.map_or(true, is_whitespace);
        let before_punctuation = before.map_or(true, is_punctuation);
        let after_whitespace = after.map_or(true, is_whitespace);
        let after_punctuation = after.map_or(true, is_punctuation);

        let left_flanking =
            !after_whitespace && (!after_punctuation || before_whitespace || before_punctuation);
        let right_flanking =
            !before_whitespace && (!before_punctuation || after_whitespace || after_punctuation);

        let (can_open, can_close) = if c == '_' {
            (
                left_flanking && (!right_flanking || before_punctuation),
                right_flanking && (!left_flanking || after_punctuation),
            )
        } else {
            (
                left_flanking && c == processor.opening_character(),
                right_flanking && c == processor.closing_character(),
            )
        };

        let text = scanner.source(start, end);
        let node = self.text_node(text, start);
        let index = self.delimiters.len();
        self.delimiters.push(Delimiter {
            node,
            character: c,
            can_open,
            can_close,
            length: count,
            original_length: count,
            start,
            previous: self.last_delimiter,
            next: None,
        });
        if let Some(previous) = self.last_delimiter {
            self.delimiters[previous].next = Some(index);
        }
        self.last_delimiter = Some(index);
        Some(node)
    }

    /// Match delimiters above `stack_bottom` into emphasis-like nodes, then
    /// drop them from the stack.
    fn process_delimiters(&mut self, stack_bottom: Option<usize>) {
        if self.last_delimiter == stack_bottom {
            return;
        }
        let config = self.config;
        // Lowest opener worth looking at, per closing character.
        let mut openers_bottom: HashMap<char, Option<usize>> = HashMap::new();

        let mut closer = self.last_delimiter;
        while let Some(index) = closer {
            let previous = self.delimiters[index].previous;
            if previous == stack_bottom {
                break;
            }
            closer = previous;
        }

        while let Some(ci) = closer {
            let character = self.delimiters[ci].character;
            let processor = match config.processor_for.get(&character) {
                Some(&p) if self.delimiters[ci].can_close => &config.processors[p],
                _ => {
                    closer = self.delimiters[ci].next;
                    continue;
                }
            };
            let opening_character = processor.opening_character();
            let bottom = openers_bottom.get(&character).copied();

            let mut found: Option<(usize, DelimiterMatch)> = None;
            let mut potential_opener = false;
            let mut opener = self.delimiters[ci].previous;
            while let Some(oi) = opener {
                if Some(oi) == stack_bottom || bottom == Some(Some(oi)) {
                    break;
                }
                let candidate = &self.delimiters[oi];
                if candidate.can_open && candidate.character == opening_character {
                    potential_opener = true;
                    let closer_run = self.delimiters[ci].run();
                    if let Some(m) = processor.process(&candidate.run(), &closer_run) {
                        if m.used >= 1 && m.used <= candidate.length.min(closer_run.length) {
                            found = Some((oi, m));
                            break;
                        }
                        log::trace!(
                            target: "commark::inline",
                            "delimiter processor for {character:?} used {} characters, ignoring",
                            m.used
                        );
                    }
                }
                opener = candidate.previous;
            }

            let Some((oi, m)) = found else {
                if !potential_opener {
                    // Nothing below can ever match this character.
                    openers_bottom.insert(character, self.delimiters[ci].previous);
                    if !self.delimiters[ci].can_open {
                        self.remove_delimiter(ci);
                    }
                }
                closer = self.delimiters[ci].next;
                continue;
            };

            self.wrap(oi, ci, m);
            self.remove_delimiters_between(oi, ci);
            if self.delimiters[oi].length == 0 {
                self.remove_delimiter_and_node(oi);
            }
            if self.delimiters[ci].length == 0 {
                let next = self.delimiters[ci].next;
                self.remove_delimiter_and_node(ci);
                closer = next;
            }
        }

        while let Some(last) = self.last_delimiter {
            if Some(last) == stack_bottom {
                break;
            }
            self.remove_delimiter(last);
        }
    }

    /// Take `m.used` characters from both runs and wrap the nodes between
    /// them in a new node.
    fn wrap(&mut self, opener: usize, closer: usize, m: DelimiterMatch) {
        let width = self.delimiters[closer].character.len_utf8();
        self.delimiters[opener].length -= m.used;
        self.delimiters[closer].length -= m.used;
        self.delimiters[closer].start += m.used * width;
        self.refresh_delimiter(opener);
        self.refresh_delimiter(closer);

        let opener_node = self.delimiters[opener].node;
        let closer_node = self.delimiters[closer].node;
        let node = self.doc.new_node(m.value);
        let mut next = self.doc.next_sibling(opener_node);
        while let Some(child) = next {
            if child == closer_node {
                break;
            }
            next = self.doc.next_sibling(child);
            self.doc.unlink(child);
            self.doc.attach(node, child);
        }
        self.doc.attach_after(opener_node, node);

        let start = self.delimiters[opener].end();
        let end = self.delimiters[closer].start;
        self.set_spans(node, start, end);
    }

    /// Rewrite a delimiter's text node after characters were used.
    fn refresh_delimiter(&mut self, index: usize) {
        let delimiter = &self.delimiters[index];
        let (node, start, end) = (delimiter.node, delimiter.start, delimiter.end());
        let literal: String = std::iter::repeat(delimiter.character)
            .take(delimiter.length)
            .collect();
        self.doc.get_mut(node).value = NodeValue::Text(literal);
        self.set_spans(node, start, end);
    }

    fn remove_delimiters_between(&mut self, opener: usize, closer: usize) {
        let mut current = self.delimiters[closer].previous;
        while let Some(index) = current {
            if index == opener {
                break;
            }
            current = self.delimiters[index].previous;
            self.remove_delimiter(index);
        }
    }

    fn remove_delimiter_and_node(&mut self, index: usize) {
        let node = self.delimiters[index].node;
        self.doc.discard(node);
        self.remove_delimiter(index);
    }

    /// Unlink a delimiter from the stack. Its own links are left intact so
    /// iteration can continue from it.
    fn remove_delimiter(&mut self, index: usize) {
        let Delimiter { previous, next, .. } = self.delimiters[index];
        if let Some(previous) = previous {
            self.delimiters[previous].next = next;
        }
        match next {
            Some(next) => self.delimiters[next].previous = previous,
            None => self.last_delimiter = previous,
        }
    }

    fn is_text(&self, node: NodeId) -> bool {
        matches!(self.doc.value(node), NodeValue::Text(_))
    }

    /// Merge runs of adjacent text nodes anywhere below the block.
    fn merge_text_nodes(&mut self) {
        let parents: Vec<NodeId> = self
            .doc
            .descendants(self.block)
            .filter(|&node| !self.is_text(node))
            .collect();
        for parent in parents {
            let mut child = self.doc.first_child(parent);
            while let Some(first) = child {
                let mut next = self.doc.next_sibling(first);
                if self.is_text(first) {
                    while let Some(following) = next.filter(|&n| self.is_text(n)) {
                        next = self.doc.next_sibling(following);
                        let merged = self.doc.get(following);
                        let literal = merged.value.literal().unwrap_or_default().to_string();
                        let spans = merged.spans.clone();
                        let target = self.doc.get_mut(first);
                        if let NodeValue::Text(text) = &mut target.value {
                            text.push_str(&literal);
                        }
                        for span in spans {
                            push_span(&mut target.spans, span);
                        }
                        self.doc.discard(following);
                    }
                }
                child = next;
            }
        }
    }
}
