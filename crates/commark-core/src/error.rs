//! Error types.
//!
//! Parsing itself never fails: every string is a valid CommonMark document.
//! Errors only come from assembling a configuration with conflicting
//! extensions, from structural edits that would corrupt the tree, and from
//! the output a renderer writes to.

use std::{fmt, io};

use indextree::NodeError;
use thiserror::Error;

/// A conflict detected while building a [`Parser`](crate::Parser).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Two inline content parser factories claim the same trigger character.
    #[error("inline trigger character {0:?} is claimed by more than one extension")]
    DuplicateTrigger(char),
    /// A delimiter character is already handled by another processor.
    #[error("delimiter processor for ({opening:?}, {closing:?}) conflicts with an existing processor for {existing:?}")]
    DelimiterConflict {
        opening: char,
        closing: char,
        existing: char,
    },
    /// Brackets, `!` and line endings are handled by the engine itself.
    #[error("character {0:?} is reserved and cannot be an inline trigger")]
    ReservedTrigger(char),
    /// A custom trigger character is also a delimiter character.
    #[error("character {0:?} is registered both as an inline trigger and as a delimiter")]
    TriggerDelimiterConflict(char),
    /// Delimiter processors must consume at least one character.
    #[error("delimiter processor for {0:?} declares a minimum length of 0")]
    InvalidMinLength(char),
    /// At least one level of container nesting is required.
    #[error("maximum nesting depth must be at least 1, got {0}")]
    InvalidNestingDepth(usize),
}

/// A structural edit that was refused because it would break a tree
/// invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TreeError {
    /// The node must be detached before it can be attached elsewhere.
    #[error("node is already attached; detach it first")]
    AlreadyAttached,
    /// The edit would make a node its own ancestor.
    #[error("node cannot become its own ancestor")]
    Cycle,
    /// The document root cannot be moved, detached or replaced.
    #[error("the document root cannot be moved")]
    Root,
    /// The node was removed from the arena.
    #[error("node has been removed")]
    Removed,
    /// The edit needs a node that has a parent.
    #[error("node has no parent")]
    NotAttached,
}

impl From<NodeError> for TreeError {
    fn from(err: NodeError) -> Self {
        match err {
            NodeError::Removed => TreeError::Removed,
            _ => TreeError::Cycle,
        }
    }
}

/// A render handler failed to write its output.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to format output")]
    Fmt(#[from] fmt::Error),
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
    /// Raised by a handler that cannot render the node it was given.
    #[error("cannot render node: {0}")]
    Unsupported(String),
}
