//! Integration tests for the CommonMark parser

mod common;

use commark_core::{IncludeSourceSpans, NodeValue, Parser, SourceSpan};
use common::{block, dump, parse};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn tree(lines: &[&str]) -> String {
    let mut out = String::new();
    for line in lines {
        out.push_str(line);
        out.push('\n');
    }
    out
}

// ============================================================================
// Leaf Block Tests
// ============================================================================

#[test]
fn test_parse_atx_headings() {
    assert_eq!(
        parse("# One\n## Two ##\n###### Six"),
        tree(&[
            "document",
            "  heading 1",
            "    text \"One\"",
            "  heading 2",
            "    text \"Two\"",
            "  heading 6",
            "    text \"Six\"",
        ])
    );
}

#[test]
fn test_seven_hashes_is_a_paragraph() {
    assert_eq!(
        parse("####### no"),
        tree(&["document", "  paragraph", "    text \"####### no\""])
    );
}

#[test]
fn test_parse_setext_headings() {
    assert_eq!(
        parse("Title\n=====\n\nSub\n---"),
        tree(&[
            "document",
            "  heading 1",
            "    text \"Title\"",
            "  heading 2",
            "    text \"Sub\"",
        ])
    );
}

#[test]
fn test_setext_heading_is_marked() {
    let doc = Parser::new().parse("Title\n===");
    let NodeValue::Heading(heading) = doc.value(block(&doc, 0)) else {
        panic!("expected a heading");
    };
    assert!(heading.setext);
    assert_eq!(heading.level, 1);
}

#[test]
fn test_thematic_breaks() {
    assert_eq!(
        parse("***\n- - -\n\npara\n\n___"),
        tree(&[
            "document",
            "  thematic_break",
            "  thematic_break",
            "  paragraph",
            "    text \"para\"",
            "  thematic_break",
        ])
    );
}

#[test]
fn test_fenced_code_block() {
    assert_eq!(
        parse("```rust\nfn main() {}\n```\nafter"),
        tree(&[
            "document",
            "  fenced_code \"rust\" \"fn main() {}\\n\"",
            "  paragraph",
            "    text \"after\"",
        ])
    );
}

#[test]
fn test_fenced_code_runs_to_end_of_document() {
    let doc = Parser::new().parse("~~~\nopen\n");
    let NodeValue::CodeBlock(code) = doc.value(block(&doc, 0)) else {
        panic!("expected a code block");
    };
    let fence = code.fence.expect("fenced");
    assert_eq!(fence.character, '~');
    assert_eq!(fence.closing_length, None);
    assert_eq!(code.literal, "open\n");
}

#[test]
fn test_backtick_fence_rejects_backtick_info() {
    assert_eq!(
        parse("``` a`b\n"),
        tree(&["document", "  paragraph", "    text \"``` a`b\""])
    );
}

#[test]
fn test_indented_code_block() {
    assert_eq!(
        parse("    let x;\n\n    y\n\n\npara"),
        tree(&[
            "document",
            "  indented_code \"let x;\\n\\ny\\n\"",
            "  paragraph",
            "    text \"para\"",
        ])
    );
}

#[test]
fn test_tab_indents_code() {
    assert_eq!(parse("\tfoo"), tree(&["document", "  indented_code \"foo\\n\""]));
}

#[test]
fn test_indented_code_cannot_interrupt_paragraph() {
    assert_eq!(
        parse("para\n    more"),
        tree(&[
            "document",
            "  paragraph",
            "    text \"para\"",
            "    soft_break",
            "    text \"more\"",
        ])
    );
}

#[test]
fn test_html_block() {
    assert_eq!(
        parse("<div>\n*hi*\n</div>\n\n*after*"),
        tree(&[
            "document",
            "  html_block \"<div>\\n*hi*\\n</div>\"",
            "  paragraph",
            "    emphasis",
            "      text \"after\"",
        ])
    );
}

// ============================================================================
// Container Block Tests
// ============================================================================

#[test]
fn test_block_quote_with_lazy_continuation() {
    assert_eq!(
        parse("> a\nb\n\nc"),
        tree(&[
            "document",
            "  block_quote",
            "    paragraph",
            "      text \"a\"",
            "      soft_break",
            "      text \"b\"",
            "  paragraph",
            "    text \"c\"",
        ])
    );
}

#[test]
fn test_nested_containers_open_on_one_line() {
    assert_eq!(
        parse("> - item"),
        tree(&[
            "document",
            "  block_quote",
            "    list bullet - tight",
            "      item",
            "        paragraph",
            "          text \"item\"",
        ])
    );
}

#[test]
fn test_tight_list() {
    assert_eq!(
        parse("- a\n- b"),
        tree(&[
            "document",
            "  list bullet - tight",
            "    item",
            "      paragraph",
            "        text \"a\"",
            "    item",
            "      paragraph",
            "        text \"b\"",
        ])
    );
}

#[test]
fn test_blank_line_between_items_makes_list_loose() {
    assert_eq!(
        parse("- a\n\n- b"),
        tree(&[
            "document",
            "  list bullet - loose",
            "    item",
            "      paragraph",
            "        text \"a\"",
            "    item",
            "      paragraph",
            "        text \"b\"",
        ])
    );
}

#[test]
fn test_blank_line_inside_item_makes_list_loose() {
    assert_eq!(
        parse("- a\n\n  b\n- c"),
        tree(&[
            "document",
            "  list bullet - loose",
            "    item",
            "      paragraph",
            "        text \"a\"",
            "      paragraph",
            "        text \"b\"",
            "    item",
            "      paragraph",
            "        text \"c\"",
        ])
    );
}

#[test]
fn test_changing_bullet_starts_new_list() {
    assert_eq!(
        parse("- a\n+ b"),
        tree(&[
            "document",
            "  list bullet - tight",
            "    item",
            "      paragraph",
            "        text \"a\"",
            "  list bullet + tight",
            "    item",
            "      paragraph",
            "        text \"b\"",
        ])
    );
}

#[test]
fn test_ordered_list_start() {
    assert_eq!(
        parse("3. a\n4. b"),
        tree(&[
            "document",
            "  list ordered 3. tight",
            "    item",
            "      paragraph",
            "        text \"a\"",
            "    item",
            "      paragraph",
            "        text \"b\"",
        ])
    );
}

#[test]
fn test_only_one_can_interrupt_paragraph() {
    assert_eq!(
        parse("para\n2. no"),
        tree(&[
            "document",
            "  paragraph",
            "    text \"para\"",
            "    soft_break",
            "    text \"2. no\"",
        ])
    );
    assert_eq!(
        parse("para\n1. yes"),
        tree(&[
            "document",
            "  paragraph",
            "    text \"para\"",
            "  list ordered 1. tight",
            "    item",
            "      paragraph",
            "        text \"yes\"",
        ])
    );
}

#[test]
fn test_empty_item_cannot_interrupt_paragraph() {
    assert_eq!(
        parse("para\n-"),
        tree(&["document", "  heading 2", "    text \"para\""])
    );
    assert_eq!(
        parse("para\n*"),
        tree(&[
            "document",
            "  paragraph",
            "    text \"para\"",
            "    soft_break",
            "    text \"*\"",
        ])
    );
}

// ============================================================================
// Link Reference Definition Tests
// ============================================================================

#[test]
fn test_shortcut_reference_with_title() {
    assert_eq!(
        parse("[foo]\n\n[foo]: /url \"t\""),
        tree(&[
            "document",
            "  paragraph",
            "    link \"/url\" \"t\"",
            "      text \"foo\"",
            "  definition \"foo\"",
        ])
    );
}

#[test]
fn test_unmatched_reference_stays_literal() {
    assert_eq!(
        parse("[bar]"),
        tree(&["document", "  paragraph", "    text \"[bar]\""])
    );
}

#[test]
fn test_first_definition_wins() {
    assert_eq!(
        parse("[x]: /a\n[x]: /b\n\n[x]"),
        tree(&[
            "document",
            "  definition \"x\"",
            "  definition \"x\"",
            "  paragraph",
            "    link \"/a\"",
            "      text \"x\"",
        ])
    );
}

#[test]
fn test_definition_labels_are_normalized() {
    assert_eq!(
        parse("[Foo  Bar]: /u\n\n[foo bar][] and [FOO BAR]"),
        tree(&[
            "document",
            "  definition \"Foo  Bar\"",
            "  paragraph",
            "    link \"/u\"",
            "      text \"foo bar\"",
            "    text \" and \"",
            "    link \"/u\"",
            "      text \"FOO BAR\"",
        ])
    );
}

#[test]
fn test_definitions_leave_remaining_paragraph() {
    assert_eq!(
        parse("[a]: /a\ntext [a]"),
        tree(&[
            "document",
            "  definition \"a\"",
            "  paragraph",
            "    text \"text \"",
            "    link \"/a\"",
            "      text \"a\"",
        ])
    );
}

#[test]
fn test_full_reference() {
    assert_eq!(
        parse("[text][ref]\n\n[ref]: /r"),
        tree(&[
            "document",
            "  paragraph",
            "    link \"/r\"",
            "      text \"text\"",
            "  definition \"ref\"",
        ])
    );
}

#[test]
fn test_setext_heading_keeps_definitions() {
    assert_eq!(
        parse("[a]: /a\nHeading\n===\n\n[a]"),
        tree(&[
            "document",
            "  definition \"a\"",
            "  heading 1",
            "    text \"Heading\"",
            "  paragraph",
            "    link \"/a\"",
            "      text \"a\"",
        ])
    );
}

#[test]
fn test_label_limit_counts_characters() {
    // 900 characters, 1800 bytes.
    let label = "é".repeat(900);
    let doc = Parser::new().parse(&format!("[{label}]\n\n[{label}]: /wide\n"));
    let destination = doc.descendants(doc.root()).find_map(|node| match doc.value(node) {
        NodeValue::Link(link) => Some(link.destination.clone()),
        _ => None,
    });
    assert_eq!(destination.as_deref(), Some("/wide"));
}

// ============================================================================
// Emphasis Tests
// ============================================================================

#[rstest]
#[case("*a*", &["emphasis", "  text \"a\""])]
#[case("**a**", &["strong", "  text \"a\""])]
#[case("***a***", &["emphasis", "  strong", "    text \"a\""])]
#[case("_a_", &["emphasis", "  text \"a\""])]
#[case("__a__", &["strong", "  text \"a\""])]
#[case("*foo**bar*", &["emphasis", "  text \"foo**bar\""])]
#[case("foo_bar_", &["text \"foo_bar_\""])]
#[case("**a*", &["text \"*\"", "emphasis", "  text \"a\""])]
#[case("a * b *", &["text \"a * b *\""])]
fn test_emphasis_shapes(#[case] input: &str, #[case] inlines: &[&str]) {
    let mut expected = vec!["document".to_string(), "  paragraph".to_string()];
    expected.extend(inlines.iter().map(|line| format!("    {line}")));
    let expected: Vec<&str> = expected.iter().map(String::as_str).collect();
    assert_eq!(parse(input), tree(&expected));
}

#[test]
fn test_nested_emphasis() {
    assert_eq!(
        parse("*a **b** c*"),
        tree(&[
            "document",
            "  paragraph",
            "    emphasis",
            "      text \"a \"",
            "      strong",
            "        text \"b\"",
            "      text \" c\"",
        ])
    );
}

#[test]
fn test_emphasis_keeps_delimiter_character() {
    let doc = Parser::new().parse("_a_ *b*");
    let paragraph = block(&doc, 0);
    let chars: Vec<char> = doc
        .children(paragraph)
        .filter_map(|node| match doc.value(node) {
            NodeValue::Emphasis(c) => Some(*c),
            _ => None,
        })
        .collect();
    assert_eq!(chars, vec!['_', '*']);
}

// ============================================================================
// Link and Image Tests
// ============================================================================

#[test]
fn test_inline_link_with_title() {
    assert_eq!(
        parse("[a](/b \"t\")"),
        tree(&["document", "  paragraph", "    link \"/b\" \"t\"", "      text \"a\""])
    );
}

#[test]
fn test_inline_link_with_empty_destination() {
    assert_eq!(
        parse("[a]()"),
        tree(&["document", "  paragraph", "    link \"\"", "      text \"a\""])
    );
}

#[test]
fn test_image() {
    assert_eq!(
        parse("![alt *x*](/i.png)"),
        tree(&[
            "document",
            "  paragraph",
            "    image \"/i.png\"",
            "      text \"alt \"",
            "      emphasis",
            "        text \"x\"",
        ])
    );
}

#[test]
fn test_emphasis_inside_link() {
    assert_eq!(
        parse("[*a*](/u)"),
        tree(&[
            "document",
            "  paragraph",
            "    link \"/u\"",
            "      emphasis",
            "        text \"a\"",
        ])
    );
}

#[test]
fn test_links_do_not_nest() {
    assert_eq!(
        parse("[a [b](/c)](/d)"),
        tree(&[
            "document",
            "  paragraph",
            "    text \"[a \"",
            "    link \"/c\"",
            "      text \"b\"",
            "    text \"](/d)\"",
        ])
    );
}

#[test]
fn test_lone_bang_is_text() {
    assert_eq!(
        parse("hi! [x]"),
        tree(&["document", "  paragraph", "    text \"hi! [x]\""])
    );
}

#[test]
fn test_autolinks() {
    assert_eq!(
        parse("<https://example.com> <me@example.com>"),
        tree(&[
            "document",
            "  paragraph",
            "    link \"https://example.com\"",
            "      text \"https://example.com\"",
            "    text \" \"",
            "    link \"mailto:me@example.com\"",
            "      text \"me@example.com\"",
        ])
    );
}

// ============================================================================
// Other Inline Tests
// ============================================================================

#[test]
fn test_code_spans() {
    assert_eq!(
        parse("`a` `` b`c `` `d\ne`"),
        tree(&[
            "document",
            "  paragraph",
            "    code \"a\"",
            "    text \" \"",
            "    code \"b`c\"",
            "    text \" \"",
            "    code \"d e\"",
        ])
    );
}

#[test]
fn test_unclosed_code_span_is_text() {
    assert_eq!(
        parse("``a`"),
        tree(&["document", "  paragraph", "    text \"``a`\""])
    );
}

#[test]
fn test_backslash_escapes() {
    assert_eq!(
        parse("\\*not emphasis\\* \\a"),
        tree(&["document", "  paragraph", "    text \"*not emphasis* \\\\a\""])
    );
}

#[test]
fn test_entities() {
    assert_eq!(
        parse("&amp; &copy; &#35; &#x41; &nope;"),
        tree(&["document", "  paragraph", "    text \"& © # A &nope;\""])
    );
}

#[test]
fn test_entities_with_two_code_points() {
    let doc = Parser::new().parse("&ngE; &nvlt;");
    assert_eq!(doc.text_content(doc.root()), "\u{2267}\u{338} <\u{20d2}");
}

#[test]
fn test_inline_html() {
    assert_eq!(
        parse("a <b>c</b>"),
        tree(&[
            "document",
            "  paragraph",
            "    text \"a \"",
            "    html_inline \"<b>\"",
            "    text \"c\"",
            "    html_inline \"</b>\"",
        ])
    );
}

#[test]
fn test_line_breaks() {
    assert_eq!(
        parse("a  \nb\\\nc\nd"),
        tree(&[
            "document",
            "  paragraph",
            "    text \"a\"",
            "    hard_break",
            "    text \"b\"",
            "    hard_break",
            "    text \"c\"",
            "    soft_break",
            "    text \"d\"",
        ])
    );
}

#[test]
fn test_trailing_spaces_at_end_are_dropped() {
    assert_eq!(
        parse("a  "),
        tree(&["document", "  paragraph", "    text \"a\""])
    );
}

// ============================================================================
// Source Span Tests
// ============================================================================

#[test]
fn test_block_spans() {
    let parser = Parser::builder()
        .include_source_spans(IncludeSourceSpans::Blocks)
        .build()
        .unwrap();
    let doc = parser.parse("# Hi\n\npara\nmore");
    assert_eq!(doc.get(block(&doc, 0)).spans, vec![SourceSpan::new(0, 0, 0, 4)]);
    assert_eq!(
        doc.get(block(&doc, 1)).spans,
        vec![SourceSpan::new(2, 0, 6, 4), SourceSpan::new(3, 0, 11, 4)]
    );
    // Inline nodes only get spans when asked for.
    let text = doc.first_child(block(&doc, 1)).unwrap();
    assert!(doc.get(text).spans.is_empty());
}

#[test]
fn test_inline_spans() {
    let parser = Parser::builder()
        .include_source_spans(IncludeSourceSpans::BlocksAndInlines)
        .build()
        .unwrap();
    let doc = parser.parse("a *b*");
    let paragraph = block(&doc, 0);
    let children: Vec<_> = doc.children(paragraph).collect();
    assert_eq!(children.len(), 2);
    assert_eq!(doc.get(children[0]).spans, vec![SourceSpan::new(0, 0, 0, 2)]);
    assert_eq!(doc.get(children[1]).spans, vec![SourceSpan::new(0, 2, 2, 3)]);
    let inner = doc.first_child(children[1]).unwrap();
    assert_eq!(doc.get(inner).spans, vec![SourceSpan::new(0, 3, 3, 1)]);
}

#[test]
fn test_container_spans_skip_markers() {
    let parser = Parser::builder()
        .include_source_spans(IncludeSourceSpans::Blocks)
        .build()
        .unwrap();
    let doc = parser.parse("> a\n> b");
    let quote = block(&doc, 0);
    let paragraph = doc.first_child(quote).unwrap();
    assert_eq!(
        doc.get(quote).spans,
        vec![SourceSpan::new(0, 0, 0, 3), SourceSpan::new(1, 0, 4, 3)]
    );
    assert_eq!(
        doc.get(paragraph).spans,
        vec![SourceSpan::new(0, 2, 2, 1), SourceSpan::new(1, 2, 6, 1)]
    );
}

// ============================================================================
// Whole Document Properties
// ============================================================================

#[test]
fn test_parse_is_deterministic() {
    let input = "# T\n\n> *a* [b][c]\n\n- x\n- y\n\n[c]: /d\n";
    let parser = Parser::new();
    assert_eq!(dump(&parser.parse(input)), dump(&parser.parse(input)));
}

#[test]
fn test_non_markup_characters_are_kept() {
    let doc = Parser::new().parse("Some *emphasis* and `code` with [a link](/u) and_snake_case");
    assert_eq!(
        doc.text_content(doc.root()),
        "Some emphasis and code with a link and_snake_case"
    );
}

#[test]
fn test_bom_and_line_endings() {
    assert_eq!(
        parse("\u{feff}a\r\nb\rc"),
        tree(&[
            "document",
            "  paragraph",
            "    text \"a\"",
            "    soft_break",
            "    text \"b\"",
            "    soft_break",
            "    text \"c\"",
        ])
    );
}

#[test]
fn test_nul_is_replaced() {
    assert_eq!(
        parse("a\0b"),
        tree(&["document", "  paragraph", "    text \"a\u{fffd}b\""])
    );
}

#[test]
fn test_empty_input() {
    assert_eq!(parse(""), tree(&["document"]));
    assert_eq!(parse("\n\n  \n"), tree(&["document"]));
}
