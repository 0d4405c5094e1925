//! # commark core
//!
//! A CommonMark parser that produces a mutable document tree.
//!
//! Parsing runs in two phases. The block phase reads the input line by line
//! and builds the tree of blocks (paragraphs, lists, quotes, code...). Link
//! reference definitions are collected as paragraphs are closed. The inline
//! phase then parses the text of each leaf block into emphasis, links, code
//! spans and so on, using the collected definitions.
//!
//! ## Quick Start
//!
//! ```rust
//! use commark_core::{NodeValue, Parser};
//!
//! let parser = Parser::new();
//! let doc = parser.parse("Hello *world*\n\n[link]: /url\n");
//!
//! let paragraph = doc.first_child(doc.root()).unwrap();
//! assert!(matches!(doc.value(paragraph), NodeValue::Paragraph));
//! assert_eq!(doc.text_content(paragraph), "Hello world");
//! ```
//!
//! ## Extensions
//!
//! A [`ParserBuilder`] accepts block parser factories, inline content
//! parser factories keyed by trigger character, and delimiter processors.
//! Conflicting registrations are reported by [`ParserBuilder::build`]
//! rather than at parse time:
//!
//! ```rust
//! use commark_core::{ConfigError, EmphasisDelimiterProcessor, Parser};
//!
//! let err = Parser::builder()
//!     .delimiter_processor(EmphasisDelimiterProcessor::new('*'))
//!     .build()
//!     .err();
//! assert!(matches!(err, Some(ConfigError::DelimiterConflict { .. })));
//! ```
//!
//! Rendering is left to the caller; [`render`] provides the dispatch
//! machinery output formats are built on.

pub mod ast;
pub mod block;
pub mod chars;
pub mod error;
pub mod inline;
pub mod lexer;
pub mod link;
pub mod parser;
pub mod reference;
pub mod render;
pub mod span;

pub use ast::{
    CodeBlock, CustomNode, Document, Fence, Heading, Link, List, ListItem, ListKind, Node, NodeEdge,
    NodeId, NodeKind, NodeValue, Visitor, Walk,
};
pub use block::{
    BlockContext, BlockContinue, BlockParser, BlockParserFactory, BlockStart, MatchedBlock, ParserState,
    SourceLine, SourceLines,
};
pub use error::{ConfigError, RenderError, TreeError};
pub use inline::content::{
    InlineContentParser, InlineContentParserFactory, InlineNode, InlineParserState, ParsedInline,
};
pub use inline::delimiter::{DelimiterMatch, DelimiterProcessor, DelimiterRun, EmphasisDelimiterProcessor};
pub use inline::scanner::Scanner;
pub use parser::{Parser, ParserBuilder, ParserExtension, DEFAULT_MAX_NESTING_DEPTH};
pub use reference::{normalize_label, LinkReferenceDefinition, LinkReferenceMap};
pub use render::{AttributeProvider, Attributes, RenderContext, Renderer, RendererBuilder, RendererExtension};
pub use span::{IncludeSourceSpans, SourceSpan};
