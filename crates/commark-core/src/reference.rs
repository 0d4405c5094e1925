//! Link reference definitions and the table they are collected into.
//!
//! Definitions are recognised at the start of paragraphs when the
//! paragraph is closed. The table maps normalized labels to destinations and
//! is consulted by the inline parser for reference links.

use std::collections::HashMap;

use crate::link::{parse_destination, parse_label, parse_title, skip_whitespace};

/// A `[label]: destination "title"` definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkReferenceDefinition {
    /// Label as written in the source (not normalized).
    pub label: String,
    pub destination: String,
    pub title: Option<String>,
}

/// Normalize a link label for matching.
///
/// Trims, case folds, and collapses internal whitespace runs to a single
/// space. Normalizing an already normalized label returns it unchanged.
///
/// ```rust
/// use commark_core::reference::normalize_label;
///
/// assert_eq!(normalize_label("  Foo \n  BAR "), "FOO BAR");
/// ```
pub fn normalize_label(label: &str) -> String {
    let folded = label.trim().to_lowercase().to_uppercase();
    let mut out = String::with_capacity(folded.len());
    for word in folded.split(|c: char| matches!(c, ' ' | '\t' | '\n' | '\r' | '\u{0c}')) {
        if word.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// Label to definition lookup. The first definition of a label wins.
#[derive(Debug, Clone, Default)]
pub struct LinkReferenceMap {
    definitions: HashMap<String, LinkReferenceDefinition>,
}

impl LinkReferenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a definition unless its label is already defined.
    ///
    /// Returns whether the definition was added.
    pub fn insert(&mut self, definition: LinkReferenceDefinition) -> bool {
        let key = normalize_label(&definition.label);
        if self.definitions.contains_key(&key) {
            log::trace!(target: "commark::reference", "ignoring duplicate definition for {key:?}");
            return false;
        }
        self.definitions.insert(key, definition);
        true
    }

    /// Look up a label; normalization happens here.
    pub fn get(&self, label: &str) -> Option<&LinkReferenceDefinition> {
        self.definitions.get(&normalize_label(label))
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// A definition found in paragraph content, with its byte range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ScannedDefinition {
    pub definition: LinkReferenceDefinition,
    pub start: usize,
    pub end: usize,
}

/// Scan consecutive definitions from the start of paragraph content.
///
/// `content` is the paragraph's lines joined with `\n`. Every definition
/// ends at a line boundary, so `end` of the last definition is where the
/// remaining paragraph text starts.
pub(crate) fn scan_definitions(content: &str) -> Vec<ScannedDefinition> {
    let mut found = Vec::new();
    let mut pos = 0;
    while pos < content.len() {
        match scan_definition(content, pos) {
            Some((definition, end)) => {
                found.push(ScannedDefinition {
                    definition,
                    start: pos,
                    end,
                });
                pos = end;
            }
            None => break,
        }
    }
    found
}

/// Offset after the line ending if only spaces and tabs remain on the line.
fn line_end_after(s: &str, from: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = from;
    while i < bytes.len() && matches!(bytes[i], b' ' | b'\t') {
        i += 1;
    }
    match bytes.get(i) {
        None => Some(i),
        Some(b'\n') => Some(i + 1),
        Some(_) => None,
    }
}

/// Skip spaces and tabs plus at most one line ending.
fn skip_to_next_token(s: &str, from: usize) -> usize {
    let bytes = s.as_bytes();
    let mut i = from;
    while i < bytes.len() && matches!(bytes[i], b' ' | b'\t') {
        i += 1;
    }
    if bytes.get(i) == Some(&b'\n') {
        i += 1;
        while i < bytes.len() && matches!(bytes[i], b' ' | b'\t') {
            i += 1;
        }
    }
    i
}

fn scan_definition(s: &str, from: usize) -> Option<(LinkReferenceDefinition, usize)> {
    let bytes = s.as_bytes();
    let start = skip_to_next_token_on_line(s, from);
    let (label, after_label) = parse_label(s, start)?;
    if label.trim().is_empty() || bytes.get(after_label) != Some(&b':') {
        return None;
    }

    let dest_start = skip_to_next_token(s, after_label + 1);
    let (destination, dest_end) = parse_destination(s, dest_start)?;
    if dest_end == dest_start {
        return None;
    }

    let title_start = skip_to_next_token(s, dest_end);
    if title_start > dest_end {
        if let Some((title, title_end)) = parse_title(s, title_start) {
            if let Some(end) = line_end_after(s, title_end) {
                return Some((
                    LinkReferenceDefinition {
                        label: label.to_string(),
                        destination,
                        title: Some(title),
                    },
                    end,
                ));
            }
        }
    }

    let end = line_end_after(s, dest_end)?;
    Some((
        LinkReferenceDefinition {
            label: label.to_string(),
            destination,
            title: None,
        },
        end,
    ))
}

fn skip_to_next_token_on_line(s: &str, from: usize) -> usize {
    let end = skip_whitespace(s, from);
    // Never cross a line here: the definition must start on this line.
    match s[from..end].find('\n') {
        Some(nl) => from + nl,
        None => end,
    }
}
