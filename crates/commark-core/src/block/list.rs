use crate::ast::{List, ListItem, ListKind, NodeValue};
use crate::chars::{columns_to_next_tab_stop, CODE_BLOCK_INDENT};

use super::{BlockContext, BlockContinue, BlockParser, BlockParserFactory, BlockStart, MatchedBlock, ParserState};

/// Ordered list numbers longer than this are not list markers.
const MAX_ORDERED_DIGITS: usize = 9;

struct ListMarker {
    kind: ListKind,
    /// Byte index right after the marker.
    end: usize,
}

#[inline]
fn is_space_tab_or_end(line: &[u8], i: usize) -> bool {
    matches!(line.get(i), None | Some(b' ') | Some(b'\t'))
}

fn parse_marker(line: &str, index: usize) -> Option<ListMarker> {
    let bytes = line.as_bytes();
    match *bytes.get(index)? {
        c @ (b'-' | b'+' | b'*') => is_space_tab_or_end(bytes, index + 1).then_some(ListMarker {
            kind: ListKind::Bullet(c as char),
            end: index + 1,
        }),
        _ => parse_ordered_marker(line, index),
    }
}

fn parse_ordered_marker(line: &str, index: usize) -> Option<ListMarker> {
    let bytes = line.as_bytes();
    for (offset, &b) in bytes[index..].iter().enumerate() {
        let i = index + offset;
        match b {
            b'0'..=b'9' if offset < MAX_ORDERED_DIGITS => {}
            b'.' | b')' if offset >= 1 && is_space_tab_or_end(bytes, i + 1) => {
                let start = line[index..i].parse().ok()?;
                return Some(ListMarker {
                    kind: ListKind::Ordered {
                        start,
                        delimiter: b as char,
                    },
                    end: i + 1,
                });
            }
            _ => return None,
        }
    }
    None
}

/// Whether an item with `kind` continues a list of `list` kind.
fn same_list(list: ListKind, kind: ListKind) -> bool {
    match (list, kind) {
        (ListKind::Bullet(a), ListKind::Bullet(b)) => a == b,
        (ListKind::Ordered { delimiter: a, .. }, ListKind::Ordered { delimiter: b, .. }) => a == b,
        _ => false,
    }
}

struct ListParser {
    tight: bool,
    had_blank_line: bool,
    lines_after_blank: usize,
}

impl BlockParser for ListParser {
    fn is_container(&self) -> bool {
        true
    }

    fn can_contain(&mut self, child: &NodeValue) -> bool {
        if !matches!(child, NodeValue::Item(_)) {
            return false;
        }
        // A new item right after a blank line makes the list loose.
        if self.had_blank_line && self.lines_after_blank == 1 {
            self.tight = false;
            self.had_blank_line = false;
        }
        true
    }

    fn try_continue(&mut self, state: &ParserState<'_>) -> Option<BlockContinue> {
        if state.is_blank() {
            self.had_blank_line = true;
            self.lines_after_blank = 0;
        } else if self.had_blank_line {
            self.lines_after_blank += 1;
        }
        // Only items have markers; a non-item start closes the list through
        // `can_contain`.
        Some(BlockContinue::AtIndex(state.index()))
    }

    fn close_block(&mut self, ctx: &mut BlockContext<'_>) {
        if self.tight {
            return;
        }
        if let NodeValue::List(list) = ctx.value_mut() {
            list.tight = false;
        }
    }
}

struct ItemParser {
    content_indent: usize,
    has_children: bool,
    had_blank_line: bool,
    loose: bool,
}

impl BlockParser for ItemParser {
    fn is_container(&self) -> bool {
        true
    }

    fn can_contain(&mut self, _child: &NodeValue) -> bool {
        if self.had_blank_line {
            self.loose = true;
        }
        self.has_children = true;
        true
    }

    fn try_continue(&mut self, state: &ParserState<'_>) -> Option<BlockContinue> {
        if state.is_blank() {
            // An item can begin with at most one blank line.
            if !self.has_children {
                return None;
            }
            self.had_blank_line = matches!(
                state.active_block(),
                NodeValue::Paragraph | NodeValue::Item(_)
            );
            return Some(BlockContinue::AtIndex(state.next_non_space_index()));
        }
        if state.indent() >= self.content_indent {
            return Some(BlockContinue::AtColumn(state.column() + self.content_indent));
        }
        None
    }

    fn close_block(&mut self, ctx: &mut BlockContext<'_>) {
        if !self.loose {
            return;
        }
        let node = ctx.node();
        let Some(parent) = ctx.document().parent(node) else {
            return;
        };
        if let NodeValue::List(list) = &mut ctx.document_mut().get_mut(parent).value {
            list.tight = false;
        }
    }
}

/// Starts list items, and the list around them when needed.
pub struct ListFactory;

impl BlockParserFactory for ListFactory {
    fn try_start(&self, state: &ParserState<'_>, matched: &MatchedBlock<'_>) -> Option<BlockStart> {
        if state.indent() >= CODE_BLOCK_INDENT {
            return None;
        }
        let line = state.line();
        let marker_index = state.next_non_space_index();
        let marker_column = state.column() + state.indent();
        let marker = parse_marker(line, marker_index)?;

        // Markers contain no tabs, so their byte length is their width.
        let column_after_marker = marker_column + (marker.end - marker_index);
        let mut content_column = column_after_marker;
        let mut has_content = false;
        for &b in &line.as_bytes()[marker.end..] {
            match b {
                b'\t' => content_column += columns_to_next_tab_stop(content_column),
                b' ' => content_column += 1,
                _ => {
                    has_content = true;
                    break;
                }
            }
        }

        // Only non-empty items starting at 1 may interrupt a paragraph.
        let starts_at_one = match marker.kind {
            ListKind::Ordered { start, .. } => start == 1,
            ListKind::Bullet(_) => true,
        };
        if (!starts_at_one || !has_content) && matched.has_paragraph_content() {
            return None;
        }

        if !has_content || content_column - column_after_marker > CODE_BLOCK_INDENT {
            content_column = column_after_marker + 1;
        }

        let item = NodeValue::Item(ListItem {
            marker_indent: state.indent(),
            content_indent: content_column - state.column(),
        });
        let item_parser = ItemParser {
            content_indent: content_column - state.column(),
            has_children: false,
            had_blank_line: false,
            loose: false,
        };

        let continues_list = match matched.value() {
            NodeValue::List(list) => same_list(list.kind, marker.kind),
            _ => false,
        };
        let start = if continues_list {
            BlockStart::of(item, item_parser)
        } else {
            let list = NodeValue::List(List {
                kind: marker.kind,
                tight: true,
            });
            let list_parser = ListParser {
                tight: true,
                had_blank_line: false,
                lines_after_blank: 0,
            };
            BlockStart::of(list, list_parser).and(item, item_parser)
        };
        Some(start.at_column(content_column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bullet_markers_need_following_space() {
        assert!(parse_marker("- a", 0).is_some());
        assert!(parse_marker("-", 0).is_some());
        assert!(parse_marker("-a", 0).is_none());
        assert!(parse_marker("+\tb", 0).is_some());
    }

    #[test]
    fn ordered_markers() {
        let marker = parse_marker("12) x", 0).unwrap();
        assert_eq!(
            marker.kind,
            ListKind::Ordered {
                start: 12,
                delimiter: ')'
            }
        );
        assert_eq!(marker.end, 3);
        assert!(parse_marker("123456789. x", 0).is_some());
        assert!(parse_marker("1234567890. x", 0).is_none());
        assert!(parse_marker(". x", 0).is_none());
        assert!(parse_marker("1.x", 0).is_none());
    }
}
