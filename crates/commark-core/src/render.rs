//! Render dispatch.
//!
//! The crate ships no concrete output format. A [`Renderer`] is a map from
//! [`NodeKind`] to handler functions that write into an output of type `W`,
//! plus attribute providers that can decorate any node. Extensions add
//! handlers for their own node kinds, or override core ones, without the
//! renderer knowing about them.
//!
//! # Example
//!
//! ```rust
//! use std::fmt::Write;
//!
//! use commark_core::render::{RenderContext, Renderer};
//! use commark_core::{NodeId, NodeKind, NodeValue, Parser};
//!
//! let mut builder = Renderer::<String>::builder();
//! builder
//!     .node_renderer(NodeKind::Text, |ctx: &mut RenderContext<'_, String>, node: NodeId| {
//!         if let NodeValue::Text(text) = ctx.document().value(node) {
//!             let text = text.to_uppercase();
//!             ctx.output().push_str(&text);
//!         }
//!         Ok(())
//!     })
//!     .node_renderer(NodeKind::Emphasis, |ctx: &mut RenderContext<'_, String>, node: NodeId| {
//!         write!(ctx.output(), "_")?;
//!         ctx.render_children(node)?;
//!         write!(ctx.output(), "_")?;
//!         Ok(())
//!     });
//! let renderer = builder.build();
//!
//! let doc = Parser::new().parse("a *b* c");
//! let mut out = String::new();
//! renderer.render(&doc, &mut out).unwrap();
//! assert_eq!(out, "A _B_ C");
//! ```

use std::collections::{BTreeMap, HashMap};

use crate::ast::{Document, NodeId, NodeKind};
use crate::error::RenderError;

/// Attributes of an output element, ordered by name.
pub type Attributes = BTreeMap<String, String>;

/// A render handler for one node kind.
pub type NodeRenderer<W> =
    dyn Fn(&mut RenderContext<'_, W>, NodeId) -> Result<(), RenderError> + Send + Sync;

/// Adds to the attributes a handler is about to write for a node.
pub trait AttributeProvider: Send + Sync {
    /// `tag` names the element the handler emits for `node`, which lets one
    /// provider tell apart, say, the `pre` and `code` of a code block.
    fn set_attributes(&self, doc: &Document, node: NodeId, tag: &str, attributes: &mut Attributes);
}

/// A bundle of handlers and attribute providers registered in one go.
pub trait RendererExtension<W> {
    fn extend(&self, builder: &mut RendererBuilder<W>);
}

/// Handed to render handlers.
pub struct RenderContext<'a, W> {
    renderer: &'a Renderer<W>,
    doc: &'a Document,
    out: &'a mut W,
}

impl<'a, W> RenderContext<'a, W> {
    pub fn document(&self) -> &'a Document {
        self.doc
    }

    pub fn output(&mut self) -> &mut W {
        self.out
    }

    /// Render `node` with the handler registered for its kind. Nodes
    /// without a handler render their children.
    pub fn render(&mut self, node: NodeId) -> Result<(), RenderError> {
        let renderer = self.renderer;
        match renderer.handlers.get(&self.doc.kind(node)) {
            Some(handler) => handler(self, node),
            None => self.render_children(node),
        }
    }

    pub fn render_children(&mut self, node: NodeId) -> Result<(), RenderError> {
        let mut child = self.doc.first_child(node);
        while let Some(current) = child {
            child = self.doc.next_sibling(current);
            self.render(current)?;
        }
        Ok(())
    }

    /// Let every attribute provider add to `attributes`, in registration
    /// order.
    pub fn extend_attributes(&self, node: NodeId, tag: &str, attributes: &mut Attributes) {
        for provider in &self.renderer.providers {
            provider.set_attributes(self.doc, node, tag, attributes);
        }
    }
}

/// A configured renderer writing into `W`.
pub struct Renderer<W> {
    handlers: HashMap<NodeKind, Box<NodeRenderer<W>>>,
    providers: Vec<Box<dyn AttributeProvider>>,
}

impl<W> Renderer<W> {
    pub fn builder() -> RendererBuilder<W> {
        RendererBuilder::default()
    }

    /// Render the whole document.
    pub fn render(&self, doc: &Document, out: &mut W) -> Result<(), RenderError> {
        self.render_node(doc, doc.root(), out)
    }

    /// Render `node` and its descendants.
    pub fn render_node(&self, doc: &Document, node: NodeId, out: &mut W) -> Result<(), RenderError> {
        let mut ctx = RenderContext {
            renderer: self,
            doc,
            out,
        };
        ctx.render(node)
    }

    pub fn handles(&self, kind: NodeKind) -> bool {
        self.handlers.contains_key(&kind)
    }
}

/// Collects handlers, attribute providers and extensions for a
/// [`Renderer`].
pub struct RendererBuilder<W> {
    handlers: HashMap<NodeKind, Box<NodeRenderer<W>>>,
    providers: Vec<Box<dyn AttributeProvider>>,
}

impl<W> Default for RendererBuilder<W> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
            providers: Vec::new(),
        }
    }
}

impl<W> RendererBuilder<W> {
    /// Register the handler for `kind`, replacing any earlier one.
    pub fn node_renderer<F>(&mut self, kind: NodeKind, handler: F) -> &mut Self
    where
        F: Fn(&mut RenderContext<'_, W>, NodeId) -> Result<(), RenderError> + Send + Sync + 'static,
    {
        if self.handlers.insert(kind, Box::new(handler)).is_some() {
            log::trace!(target: "commark::render", "replaced handler for {kind:?}");
        }
        self
    }

    pub fn attribute_provider(&mut self, provider: impl AttributeProvider + 'static) -> &mut Self {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn extension(&mut self, extension: impl RendererExtension<W>) -> &mut Self {
        extension.extend(self);
        self
    }

    /// Build the renderer, leaving the builder empty.
    pub fn build(&mut self) -> Renderer<W> {
        Renderer {
            handlers: std::mem::take(&mut self.handlers),
            providers: std::mem::take(&mut self.providers),
        }
    }
}
