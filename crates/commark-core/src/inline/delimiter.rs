//! Delimiter runs and the processors that turn matched runs into nodes.

use crate::ast::NodeId;
use crate::ast::NodeValue;

/// A run of delimiter characters as seen by a [`DelimiterProcessor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelimiterRun {
    pub character: char,
    /// Characters not yet used by a match.
    pub length: usize,
    /// Characters in the run as written.
    pub original_length: usize,
    pub can_open: bool,
    pub can_close: bool,
}

/// A match decided by a [`DelimiterProcessor`]: how many characters to
/// take from each run, and the node that wraps the content between them.
#[derive(Debug)]
pub struct DelimiterMatch {
    pub used: usize,
    pub value: NodeValue,
}

/// Handles runs of a delimiter character, like `*` and `_` for emphasis.
///
/// The engine calls [`process`](DelimiterProcessor::process) with a closer
/// and each candidate opener, nearest first. Returning `None` rejects the
/// pair and the engine keeps looking further back.
pub trait DelimiterProcessor: Send + Sync {
    fn opening_character(&self) -> char;

    fn closing_character(&self) -> char;

    /// Shorter runs are plain text.
    fn min_length(&self) -> usize {
        1
    }

    fn process(&self, opener: &DelimiterRun, closer: &DelimiterRun) -> Option<DelimiterMatch>;
}

/// `*` and `_` emphasis and strong emphasis.
#[derive(Debug, Clone, Copy)]
pub struct EmphasisDelimiterProcessor {
    character: char,
}

impl EmphasisDelimiterProcessor {
    pub fn new(character: char) -> Self {
        Self { character }
    }
}

impl DelimiterProcessor for EmphasisDelimiterProcessor {
    fn opening_character(&self) -> char {
        self.character
    }

    fn closing_character(&self) -> char {
        self.character
    }

    fn process(&self, opener: &DelimiterRun, closer: &DelimiterRun) -> Option<DelimiterMatch> {
        // Rule of three: a run that can both open and close only matches
        // when the combined length is not a multiple of three, unless both
        // are.
        if (opener.can_close || closer.can_open)
            && closer.original_length % 3 != 0
            && (opener.original_length + closer.original_length) % 3 == 0
        {
            return None;
        }

        Some(if opener.length >= 2 && closer.length >= 2 {
            DelimiterMatch {
                used: 2,
                value: NodeValue::Strong(self.character),
            }
        } else {
            DelimiterMatch {
                used: 1,
                value: NodeValue::Emphasis(self.character),
            }
        })
    }
}

/// Entry of the delimiter stack, a doubly linked list over a vector.
#[derive(Debug)]
pub(crate) struct Delimiter {
    /// Text node holding the remaining delimiter characters.
    pub node: NodeId,
    pub character: char,
    pub can_open: bool,
    pub can_close: bool,
    pub length: usize,
    pub original_length: usize,
    /// Byte offset of the remaining characters in the snippet content.
    /// Closers lose characters at the start, openers at the end.
    pub start: usize,
    pub previous: Option<usize>,
    pub next: Option<usize>,
}

impl Delimiter {
    pub(crate) fn run(&self) -> DelimiterRun {
        DelimiterRun {
            character: self.character,
            length: self.length,
            original_length: self.original_length,
            can_open: self.can_open,
            can_close: self.can_close,
        }
    }

    /// Byte offset one past the remaining characters.
    pub(crate) fn end(&self) -> usize {
        self.start + self.length * self.character.len_utf8()
    }
}
