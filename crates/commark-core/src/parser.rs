//! Parser configuration and the parse entry point.
//!
//! A [`Parser`] is assembled once through a [`ParserBuilder`], which checks
//! the registered extensions for conflicts, and can then be shared between
//! threads. Each call to [`Parser::parse`] owns all of its working state.

use crate::ast::Document;
use crate::block::{core_factories, BlockEngine, BlockParserFactory, BlockTree};
use crate::error::ConfigError;
use crate::inline::content::InlineContentParserFactory;
use crate::inline::delimiter::DelimiterProcessor;
use crate::inline::{parse_inlines, InlineConfig};
use crate::span::IncludeSourceSpans;

/// Default cap on the number of nested container blocks.
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 64;

/// A bundle of parser capabilities registered in one go.
///
/// # Example
///
/// ```rust
/// use commark_core::{Parser, ParserBuilder, ParserExtension};
///
/// struct Nothing;
///
/// impl ParserExtension for Nothing {
///     fn extend(&self, _builder: &mut ParserBuilder) {}
/// }
///
/// let parser = Parser::builder().extension(Nothing).build().unwrap();
/// let doc = parser.parse("hi");
/// assert_eq!(doc.text_content(doc.root()), "hi");
/// ```
pub trait ParserExtension {
    fn extend(&self, builder: &mut ParserBuilder);
}

/// Collects extensions and options for a [`Parser`].
///
/// Registration methods return the builder for chaining. [`build`] moves
/// the registrations into the parser, leaving the builder empty.
///
/// [`build`]: ParserBuilder::build
pub struct ParserBuilder {
    block_factories: Vec<Box<dyn BlockParserFactory>>,
    inline_factories: Vec<Box<dyn InlineContentParserFactory>>,
    delimiter_processors: Vec<Box<dyn DelimiterProcessor>>,
    spans: IncludeSourceSpans,
    max_depth: usize,
}

impl Default for ParserBuilder {
    fn default() -> Self {
        Self {
            block_factories: Vec::new(),
            inline_factories: Vec::new(),
            delimiter_processors: Vec::new(),
            spans: IncludeSourceSpans::None,
            max_depth: DEFAULT_MAX_NESTING_DEPTH,
        }
    }
}

impl ParserBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extension(&mut self, extension: impl ParserExtension) -> &mut Self {
        extension.extend(self);
        self
    }

    pub fn extensions<I>(&mut self, extensions: I) -> &mut Self
    where
        I: IntoIterator<Item = Box<dyn ParserExtension>>,
    {
        for extension in extensions {
            extension.extend(self);
        }
        self
    }

    /// Custom block factories are tried before the core ones, in
    /// registration order.
    pub fn block_parser_factory(&mut self, factory: impl BlockParserFactory + 'static) -> &mut Self {
        self.block_factories.push(Box::new(factory));
        self
    }

    /// Custom inline parsers are tried before the built-in parsers for the
    /// same trigger character.
    pub fn inline_content_parser_factory(
        &mut self,
        factory: impl InlineContentParserFactory + 'static,
    ) -> &mut Self {
        self.inline_factories.push(Box::new(factory));
        self
    }

    pub fn delimiter_processor(&mut self, processor: impl DelimiterProcessor + 'static) -> &mut Self {
        self.delimiter_processors.push(Box::new(processor));
        self
    }

    pub fn include_source_spans(&mut self, spans: IncludeSourceSpans) -> &mut Self {
        self.spans = spans;
        self
    }

    /// Maximum number of nested container blocks (block quotes, lists, list
    /// items and custom containers). Starts that would open a container
    /// beyond it are skipped, so the text is kept as content of the
    /// innermost block. Leaf starts such as headings and thematic breaks
    /// still apply at the cap.
    pub fn max_nesting_depth(&mut self, depth: usize) -> &mut Self {
        self.max_depth = depth;
        self
    }

    /// Validate the configuration and build the parser.
    pub fn build(&mut self) -> Result<Parser, ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::InvalidNestingDepth(self.max_depth));
        }
        let inline = InlineConfig::new(
            std::mem::take(&mut self.inline_factories),
            std::mem::take(&mut self.delimiter_processors),
        )?;

        let mut block_factories = std::mem::take(&mut self.block_factories);
        let custom_block_factories = block_factories.len();
        block_factories.extend(core_factories());

        log::debug!(
            target: "commark::parser",
            "built parser: {custom_block_factories} custom block factories, spans {:?}, max nesting depth {}",
            self.spans,
            self.max_depth
        );
        Ok(Parser {
            block_factories,
            custom_block_factories,
            inline,
            spans: self.spans,
            max_depth: self.max_depth,
        })
    }
}

/// CommonMark parser.
///
/// # Example
///
/// ```rust
/// use commark_core::{NodeValue, Parser};
///
/// let parser = Parser::new();
/// let doc = parser.parse("# Hello *world*\n");
///
/// let heading = doc.first_child(doc.root()).unwrap();
/// assert!(matches!(doc.value(heading), NodeValue::Heading(h) if h.level == 1));
/// assert_eq!(doc.text_content(heading), "Hello world");
/// ```
pub struct Parser {
    /// Custom factories followed by the core ones.
    block_factories: Vec<Box<dyn BlockParserFactory>>,
    custom_block_factories: usize,
    inline: InlineConfig,
    spans: IncludeSourceSpans,
    max_depth: usize,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    /// A parser without extensions or source spans.
    pub fn new() -> Self {
        Self::builder()
            .build()
            .expect("default parser configuration is valid")
    }

    pub fn builder() -> ParserBuilder {
        ParserBuilder::new()
    }

    /// Parse `input` into a document. Every input produces a document.
    pub fn parse(&self, input: &str) -> Document {
        let BlockTree {
            mut document,
            definitions,
            inline_blocks,
        } = BlockEngine::new(
            &self.block_factories,
            self.custom_block_factories,
            self.spans,
            self.max_depth,
        )
        .parse(input);

        let inline_spans = self.spans.inlines();
        for (block, lines) in &inline_blocks {
            parse_inlines(&self.inline, &mut document, &definitions, *block, lines, inline_spans);
        }
        document
    }
}
