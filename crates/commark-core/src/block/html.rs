use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::NodeValue;
use crate::chars::CODE_BLOCK_INDENT;

use super::{BlockContext, BlockContinue, BlockParser, BlockParserFactory, BlockStart, MatchedBlock, ParserState, SourceLine};

pub(crate) const TAG_NAME: &str = "[A-Za-z][A-Za-z0-9-]*";
const ATTRIBUTE: &str = r#"(?:[ \t\n\r\x0b\x0c]+[a-zA-Z_:][a-zA-Z0-9_.:-]*(?:[ \t\n\r\x0b\x0c]*=[ \t\n\r\x0b\x0c]*(?:[^"'=<>`\x00-\x20]+|'[^']*'|"[^"]*"))?)"#;

/// `<tag attr="v">` or `<tag/>`.
pub(crate) fn open_tag() -> String {
    format!(r"<{TAG_NAME}{ATTRIBUTE}*[ \t\n\r\x0b\x0c]*/?>")
}

/// `</tag>`.
pub(crate) fn close_tag() -> String {
    format!(r"</{TAG_NAME}[ \t\n\r\x0b\x0c]*>")
}

struct Condition {
    opener: Regex,
    closer: Option<Regex>,
}

fn condition(opener: &str, closer: Option<&str>) -> Condition {
    Condition {
        opener: Regex::new(opener).expect("valid html block opener"),
        closer: closer.map(|c| Regex::new(c).expect("valid html block closer")),
    }
}

/// The seven kinds of HTML block start conditions, in order.
static CONDITIONS: Lazy<[Condition; 7]> = Lazy::new(|| {
    [
        condition(
            r"(?i)^<(?:script|pre|style|textarea)(?:[ \t\n\x0b\x0c\r]|>|$)",
            Some(r"(?i)</(?:script|pre|style|textarea)>"),
        ),
        condition(r"^<!--", Some(r"-->")),
        condition(r"^<[?]", Some(r"\?>")),
        condition(r"^<![A-Za-z]", Some(r">")),
        condition(r"^<!\[CDATA\[", Some(r"\]\]>")),
        condition(
            concat!(
                r"(?i)^</?(?:address|article|aside|base|basefont|blockquote|body|caption|center|col|colgroup|dd|details|dialog|dir|div|dl|dt|",
                r"fieldset|figcaption|figure|footer|form|frame|frameset|h1|h2|h3|h4|h5|h6|head|header|hr|html|iframe|legend|li|link|",
                r"main|menu|menuitem|nav|noframes|ol|optgroup|option|p|param|search|section|summary|table|tbody|td|tfoot|th|thead|",
                r"title|tr|track|ul)(?:[ \t\n\x0b\x0c\r]|/?>|$)"
            ),
            None,
        ),
        condition(
            &format!(r"(?i)^(?:{}|{})[ \t\x0b\x0c]*$", open_tag(), close_tag()),
            None,
        ),
    ]
});

/// Index into [`CONDITIONS`] of the "any complete tag" kind.
const ANY_TAG: usize = 6;

struct HtmlBlockParser {
    closer: Option<&'static Regex>,
    finished: bool,
    literal: String,
}

impl BlockParser for HtmlBlockParser {
    fn try_continue(&mut self, state: &ParserState<'_>) -> Option<BlockContinue> {
        if self.finished {
            return None;
        }
        // Kinds 6 and 7 end at a blank line.
        if state.is_blank() && self.closer.is_none() {
            return None;
        }
        Some(BlockContinue::AtIndex(state.index()))
    }

    fn add_line(&mut self, line: SourceLine) {
        if !self.literal.is_empty() {
            self.literal.push('\n');
        }
        self.literal.push_str(&line.content);
        if self.closer.is_some_and(|closer| closer.is_match(&line.content)) {
            self.finished = true;
        }
    }

    fn close_block(&mut self, ctx: &mut BlockContext<'_>) {
        if let NodeValue::HtmlBlock(literal) = ctx.value_mut() {
            *literal = std::mem::take(&mut self.literal);
        }
    }
}

/// Starts raw HTML blocks.
pub struct HtmlBlockFactory;

impl BlockParserFactory for HtmlBlockFactory {
    fn try_start(&self, state: &ParserState<'_>, matched: &MatchedBlock<'_>) -> Option<BlockStart> {
        let line = state.line();
        let nns = state.next_non_space_index();
        if state.indent() >= CODE_BLOCK_INDENT || line.as_bytes().get(nns) != Some(&b'<') {
            return None;
        }
        let rest = &line[nns..];
        let conditions: &'static [Condition; 7] = &CONDITIONS;
        for (kind, condition) in conditions.iter().enumerate() {
            // A lone tag cannot interrupt a paragraph.
            if kind == ANY_TAG
                && (matches!(matched.value(), NodeValue::Paragraph)
                    || state.active_block_can_have_lazy_continuation_lines())
            {
                continue;
            }
            if condition.opener.is_match(rest) {
                let parser = HtmlBlockParser {
                    closer: condition.closer.as_ref(),
                    finished: false,
                    literal: String::new(),
                };
                return Some(BlockStart::of(NodeValue::HtmlBlock(String::new()), parser).at_index(state.index()));
            }
        }
        None
    }
}
