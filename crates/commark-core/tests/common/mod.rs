//! Helpers shared by the integration tests.

#![allow(dead_code)]

use commark_core::{Document, ListKind, NodeEdge, NodeId, NodeValue, Parser};

/// Parse with the default parser and dump the tree.
pub fn parse(input: &str) -> String {
    dump(&Parser::new().parse(input))
}

/// One line per node, indented by depth.
pub fn dump(doc: &Document) -> String {
    let mut out = String::new();
    let mut depth = 0usize;
    for edge in doc.traverse(doc.root()) {
        match edge {
            NodeEdge::Start(id) => {
                out.push_str(&"  ".repeat(depth));
                out.push_str(&describe(doc.value(id)));
                out.push('\n');
                depth += 1;
            }
            NodeEdge::End(_) => depth -= 1,
        }
    }
    out
}

pub fn describe(value: &NodeValue) -> String {
    match value {
        NodeValue::Document => "document".to_string(),
        NodeValue::BlockQuote => "block_quote".to_string(),
        NodeValue::List(list) => {
            let kind = match list.kind {
                ListKind::Bullet(c) => format!("bullet {c}"),
                ListKind::Ordered { start, delimiter } => format!("ordered {start}{delimiter}"),
            };
            let spacing = if list.tight { "tight" } else { "loose" };
            format!("list {kind} {spacing}")
        }
        NodeValue::Item(_) => "item".to_string(),
        NodeValue::CodeBlock(code) => match code.fence {
            Some(_) => format!("fenced_code {:?} {:?}", code.info, code.literal),
            None => format!("indented_code {:?}", code.literal),
        },
        NodeValue::HtmlBlock(html) => format!("html_block {html:?}"),
        NodeValue::Paragraph => "paragraph".to_string(),
        NodeValue::Heading(heading) => format!("heading {}", heading.level),
        NodeValue::ThematicBreak => "thematic_break".to_string(),
        NodeValue::LinkReferenceDefinition(def) => format!("definition {:?}", def.label),
        NodeValue::CustomBlock(node) | NodeValue::CustomInline(node) => match node.literal() {
            Some(literal) => format!("{} {literal:?}", node.kind()),
            None => node.kind().to_string(),
        },
        NodeValue::Text(text) => format!("text {text:?}"),
        NodeValue::SoftBreak => "soft_break".to_string(),
        NodeValue::HardBreak => "hard_break".to_string(),
        NodeValue::Code(code) => format!("code {code:?}"),
        NodeValue::Emphasis(_) => "emphasis".to_string(),
        NodeValue::Strong(_) => "strong".to_string(),
        NodeValue::Link(link) => format!("link {:?}{}", link.destination, title(&link.title)),
        NodeValue::Image(link) => format!("image {:?}{}", link.destination, title(&link.title)),
        NodeValue::HtmlInline(html) => format!("html_inline {html:?}"),
    }
}

fn title(title: &Option<String>) -> String {
    title.as_ref().map(|t| format!(" {t:?}")).unwrap_or_default()
}

/// The nth child of the root.
pub fn block(doc: &Document, n: usize) -> NodeId {
    doc.children(doc.root()).nth(n).expect("block exists")
}
