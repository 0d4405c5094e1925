//! Inline content parsers: the extension point for inline syntax that starts
//! with a trigger character, and the built-in parsers for escapes, code
//! spans, entities, autolinks and raw HTML.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::{Link, NodeValue};
use crate::block::html::{close_tag, open_tag};
use crate::chars::{decode_entity, is_escapable};
use crate::reference::{LinkReferenceDefinition, LinkReferenceMap};

use super::scanner::Scanner;

/// A node produced by an inline content parser, with its children.
#[derive(Debug)]
pub struct InlineNode {
    pub value: NodeValue,
    pub children: Vec<InlineNode>,
}

impl InlineNode {
    pub fn new(value: NodeValue) -> Self {
        Self {
            value,
            children: Vec::new(),
        }
    }

    pub fn text(literal: impl Into<String>) -> Self {
        Self::new(NodeValue::Text(literal.into()))
    }

    pub fn with_child(mut self, child: InlineNode) -> Self {
        self.children.push(child);
        self
    }
}

/// A successful parse: the node and the position after it.
#[derive(Debug)]
pub struct ParsedInline {
    pub(crate) node: InlineNode,
    pub(crate) position: usize,
}

impl ParsedInline {
    pub fn of(node: InlineNode, position: usize) -> Self {
        Self { node, position }
    }
}

/// What an inline content parser can see.
pub struct InlineParserState<'a> {
    pub(crate) scanner: Scanner<'a>,
    pub(crate) definitions: &'a LinkReferenceMap,
}

impl<'a> InlineParserState<'a> {
    /// The scanner, positioned at the trigger character.
    pub fn scanner(&mut self) -> &mut Scanner<'a> {
        &mut self.scanner
    }

    /// Look up a link reference definition by (unnormalized) label.
    pub fn definition(&self, label: &str) -> Option<&'a LinkReferenceDefinition> {
        self.definitions.get(label)
    }
}

/// Parses inline syntax starting at a trigger character.
///
/// On `None` the engine resets the scanner and tries the next parser for
/// the character; if none succeeds the character is treated as text.
pub trait InlineContentParser {
    fn try_parse(&mut self, state: &mut InlineParserState<'_>) -> Option<ParsedInline>;
}

/// Creates inline content parsers. `create` is called once per inline
/// snippet, so parsers may keep state while a snippet is parsed.
pub trait InlineContentParserFactory: Send + Sync {
    fn trigger_characters(&self) -> Vec<char>;

    fn create(&self) -> Box<dyn InlineContentParser>;
}

/// Backslash escapes and backslash hard line breaks.
pub struct BackslashParser;

impl InlineContentParser for BackslashParser {
    fn try_parse(&mut self, state: &mut InlineParserState<'_>) -> Option<ParsedInline> {
        let scanner = state.scanner();
        scanner.next();
        let node = match scanner.peek() {
            Some('\n') => {
                scanner.next();
                InlineNode::new(NodeValue::HardBreak)
            }
            Some(c) if is_escapable(c) => {
                scanner.next();
                InlineNode::text(c)
            }
            _ => InlineNode::text("\\"),
        };
        Some(ParsedInline::of(node, scanner.position()))
    }
}

/// Code spans delimited by backtick runs of equal length.
pub struct BackticksParser;

impl InlineContentParser for BackticksParser {
    fn try_parse(&mut self, state: &mut InlineParserState<'_>) -> Option<ParsedInline> {
        let scanner = state.scanner();
        let start = scanner.position();
        let opening = scanner.match_multiple('`');
        let after_opening = scanner.position();

        while scanner.find('`').is_some() {
            let before_closing = scanner.position();
            if scanner.match_multiple('`') != opening {
                continue;
            }
            let mut literal = scanner.source(after_opening, before_closing).replace('\n', " ");
            if literal.len() >= 3
                && literal.starts_with(' ')
                && literal.ends_with(' ')
                && literal.bytes().any(|b| b != b' ')
            {
                literal = literal[1..literal.len() - 1].to_string();
            }
            return Some(ParsedInline::of(
                InlineNode::new(NodeValue::Code(literal)),
                scanner.position(),
            ));
        }

        // No closer: the opening run is literal text.
        let text = scanner.source(start, after_opening);
        Some(ParsedInline::of(InlineNode::text(text), after_opening))
    }
}

/// Named and numeric character references.
pub struct EntityParser;

impl InlineContentParser for EntityParser {
    fn try_parse(&mut self, state: &mut InlineParserState<'_>) -> Option<ParsedInline> {
        let scanner = state.scanner();
        let (decoded, len) = decode_entity(scanner.rest())?;
        let end = scanner.position() + len;
        Some(ParsedInline::of(InlineNode::text(decoded), end))
    }
}

static URI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z][a-zA-Z0-9.+-]{1,31}:[^<>\x00-\x20]*$").expect("valid uri pattern")
});

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("valid email pattern")
});

/// `<scheme:...>` and `<user@host>` autolinks.
pub struct AutolinkParser;

impl InlineContentParser for AutolinkParser {
    fn try_parse(&mut self, state: &mut InlineParserState<'_>) -> Option<ParsedInline> {
        let scanner = state.scanner();
        scanner.next();
        let rest = scanner.rest();
        // Neither form allows spaces, `<` or control characters, so the
        // search stops at the first one.
        let end = rest.find(|c: char| matches!(c, '>' | '<' | ' ') || c.is_ascii_control())?;
        if !rest[end..].starts_with('>') {
            return None;
        }
        let text = &rest[..end];
        scanner.set_position(scanner.position() + end + 1);

        let destination = if URI.is_match(text) {
            text.to_string()
        } else if EMAIL.is_match(text) {
            format!("mailto:{text}")
        } else {
            return None;
        };
        let link = InlineNode::new(NodeValue::Link(Link {
            destination,
            title: None,
        }))
        .with_child(InlineNode::text(text));
        Some(ParsedInline::of(link, scanner.position()))
    }
}

static HTML_INLINE: Lazy<Regex> = Lazy::new(|| {
    let comment = r"<!-->|<!--->|<!--[\s\S]*?-->";
    let processing = r"<\?[\s\S]*?\?>";
    let declaration = r"<![A-Za-z][^>]*>";
    let cdata = r"<!\[CDATA\[[\s\S]*?\]\]>";
    Regex::new(&format!(
        "^(?:{}|{}|{comment}|{processing}|{declaration}|{cdata})",
        open_tag(),
        close_tag()
    ))
    .expect("valid inline html pattern")
});

/// Raw inline HTML: tags, comments, processing instructions, declarations
/// and CDATA sections.
pub struct HtmlInlineParser;

impl InlineContentParser for HtmlInlineParser {
    fn try_parse(&mut self, state: &mut InlineParserState<'_>) -> Option<ParsedInline> {
        let scanner = state.scanner();
        let m = HTML_INLINE.find(scanner.rest())?;
        let end = scanner.position() + m.end();
        Some(ParsedInline::of(
            InlineNode::new(NodeValue::HtmlInline(m.as_str().to_string())),
            end,
        ))
    }
}

macro_rules! builtin_factory {
    ($factory:ident, $parser:ident, [$($trigger:literal),+]) => {
        pub(crate) struct $factory;

        impl InlineContentParserFactory for $factory {
            fn trigger_characters(&self) -> Vec<char> {
                vec![$($trigger),+]
            }

            fn create(&self) -> Box<dyn InlineContentParser> {
                Box::new($parser)
            }
        }
    };
}

builtin_factory!(BackslashFactory, BackslashParser, ['\\']);
builtin_factory!(BackticksFactory, BackticksParser, ['`']);
builtin_factory!(EntityFactory, EntityParser, ['&']);
builtin_factory!(AutolinkFactory, AutolinkParser, ['<']);
builtin_factory!(HtmlInlineFactory, HtmlInlineParser, ['<']);

/// Built-in factories in the order they are tried for a shared trigger.
pub(crate) fn builtin_factories() -> Vec<Box<dyn InlineContentParserFactory>> {
    vec![
        Box::new(BackslashFactory),
        Box::new(BackticksFactory),
        Box::new(EntityFactory),
        Box::new(AutolinkFactory),
        Box::new(HtmlInlineFactory),
    ]
}
