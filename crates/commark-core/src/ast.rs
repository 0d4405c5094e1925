//! The document tree produced by the parser.
//!
//! Nodes live in an index arena owned by [`Document`]. Each node owns its
//! children in order and knows its parent and siblings through indices, so
//! there are no reference-counted cycles. After parsing, the tree is freely
//! mutable through explicit edit operations that keep it a tree: a node must
//! be detached before it is attached elsewhere, and no node can become its
//! own ancestor.

use std::any::Any;
use std::fmt;

use indextree::{Arena, NodeEdge as ArenaEdge};

pub use indextree::NodeId;

use crate::error::TreeError;
use crate::reference::LinkReferenceDefinition;
use crate::span::SourceSpan;

/// A tree node: its value plus the source spans it was parsed from.
#[derive(Debug)]
pub struct Node {
    pub value: NodeValue,
    /// Empty unless source spans were enabled on the parser.
    pub spans: Vec<SourceSpan>,
}

impl Node {
    pub fn new(value: NodeValue) -> Self {
        Self {
            value,
            spans: Vec::new(),
        }
    }
}

/// What a node is, with its variant-specific fields.
#[derive(Debug)]
pub enum NodeValue {
    /// The root. Exactly one per tree.
    Document,
    BlockQuote,
    List(List),
    Item(ListItem),
    /// Fenced or indented code.
    CodeBlock(CodeBlock),
    /// Raw HTML block, lines joined with `\n`.
    HtmlBlock(String),
    Paragraph,
    Heading(Heading),
    ThematicBreak,
    /// Left in the tree where a definition was stripped from a paragraph.
    LinkReferenceDefinition(LinkReferenceDefinition),
    /// A block contributed by an extension.
    CustomBlock(Box<dyn CustomNode>),

    Text(String),
    SoftBreak,
    HardBreak,
    /// Code span content.
    Code(String),
    /// Regular emphasis, with the delimiter character used.
    Emphasis(char),
    /// Strong emphasis, with the delimiter character used.
    Strong(char),
    Link(Link),
    Image(Link),
    HtmlInline(String),
    /// An inline contributed by an extension.
    CustomInline(Box<dyn CustomNode>),
}

/// Variant tag of a [`NodeValue`], used as a dispatch key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    BlockQuote,
    List,
    Item,
    CodeBlock,
    HtmlBlock,
    Paragraph,
    Heading,
    ThematicBreak,
    LinkReferenceDefinition,
    Text,
    SoftBreak,
    HardBreak,
    Code,
    Emphasis,
    Strong,
    Link,
    Image,
    HtmlInline,
    /// Extension node, keyed by [`CustomNode::kind`].
    Custom(&'static str),
}

impl NodeValue {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeValue::Document => NodeKind::Document,
            NodeValue::BlockQuote => NodeKind::BlockQuote,
            NodeValue::List(_) => NodeKind::List,
            NodeValue::Item(_) => NodeKind::Item,
            NodeValue::CodeBlock(_) => NodeKind::CodeBlock,
            NodeValue::HtmlBlock(_) => NodeKind::HtmlBlock,
            NodeValue::Paragraph => NodeKind::Paragraph,
            NodeValue::Heading(_) => NodeKind::Heading,
            NodeValue::ThematicBreak => NodeKind::ThematicBreak,
            NodeValue::LinkReferenceDefinition(_) => NodeKind::LinkReferenceDefinition,
            NodeValue::CustomBlock(node) | NodeValue::CustomInline(node) => {
                NodeKind::Custom(node.kind())
            }
            NodeValue::Text(_) => NodeKind::Text,
            NodeValue::SoftBreak => NodeKind::SoftBreak,
            NodeValue::HardBreak => NodeKind::HardBreak,
            NodeValue::Code(_) => NodeKind::Code,
            NodeValue::Emphasis(_) => NodeKind::Emphasis,
            NodeValue::Strong(_) => NodeKind::Strong,
            NodeValue::Link(_) => NodeKind::Link,
            NodeValue::Image(_) => NodeKind::Image,
            NodeValue::HtmlInline(_) => NodeKind::HtmlInline,
        }
    }

    /// Whether this is a block-level node.
    pub fn is_block(&self) -> bool {
        matches!(
            self,
            NodeValue::Document
                | NodeValue::BlockQuote
                | NodeValue::List(_)
                | NodeValue::Item(_)
                | NodeValue::CodeBlock(_)
                | NodeValue::HtmlBlock(_)
                | NodeValue::Paragraph
                | NodeValue::Heading(_)
                | NodeValue::ThematicBreak
                | NodeValue::LinkReferenceDefinition(_)
                | NodeValue::CustomBlock(_)
        )
    }

    /// The literal text carried by leaf nodes (text, code, raw HTML).
    pub fn literal(&self) -> Option<&str> {
        match self {
            NodeValue::Text(s) | NodeValue::Code(s) | NodeValue::HtmlInline(s) => Some(s),
            NodeValue::HtmlBlock(s) => Some(s),
            NodeValue::CodeBlock(code) => Some(&code.literal),
            NodeValue::CustomBlock(node) | NodeValue::CustomInline(node) => node.literal(),
            _ => None,
        }
    }

    /// The extension node, if this is a custom block or inline.
    pub fn custom(&self) -> Option<&(dyn CustomNode + 'static)> {
        match self {
            NodeValue::CustomBlock(node) | NodeValue::CustomInline(node) => Some(node.as_ref()),
            _ => None,
        }
    }

    pub fn custom_mut(&mut self) -> Option<&mut (dyn CustomNode + 'static)> {
        match self {
            NodeValue::CustomBlock(node) | NodeValue::CustomInline(node) => Some(node.as_mut()),
            _ => None,
        }
    }
}

/// List ordering and marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    /// `-`, `+` or `*`.
    Bullet(char),
    /// `1.` or `1)`.
    Ordered { start: u32, delimiter: char },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct List {
    pub kind: ListKind,
    /// A list is tight when no blank lines separate its items or their
    /// direct children.
    pub tight: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListItem {
    /// Columns before the marker.
    pub marker_indent: usize,
    /// Columns from the marker to the item content.
    pub content_indent: usize,
}

/// Code fence details; absent for indented code blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fence {
    /// `` ` `` or `~`.
    pub character: char,
    pub length: usize,
    /// Indentation of the opening fence, stripped from content lines.
    pub indent: usize,
    /// Length of the closing fence, `None` if the block ran to the end of
    /// its container.
    pub closing_length: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub fence: Option<Fence>,
    /// Info string after the opening fence, unescaped.
    pub info: String,
    pub literal: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heading {
    /// 1 to 6.
    pub level: u8,
    /// Underlined with `=` or `-` rather than prefixed with `#`.
    pub setext: bool,
}

/// Destination and title of a link or image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub destination: String,
    pub title: Option<String>,
}

/// Upcasting helper so extension nodes can be downcast.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A node type defined outside the core.
///
/// Renderers see custom nodes through their [`kind`](CustomNode::kind) tag,
/// their children and [`literal`](CustomNode::literal); extensions recover
/// their concrete type with [`downcast_ref`](trait.CustomNode.html#method.downcast_ref).
pub trait CustomNode: AsAny + fmt::Debug + Send + Sync {
    /// Stable name of the node type, unique per extension.
    fn kind(&self) -> &'static str;

    fn literal(&self) -> Option<&str> {
        None
    }
}

impl dyn CustomNode {
    pub fn downcast_ref<T: CustomNode>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: CustomNode>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

/// One step of a depth-first traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeEdge {
    /// Entering a node, before its children.
    Start(NodeId),
    /// Leaving a node, after its children.
    End(NodeId),
}

/// Whether a [`Visitor`] wants to see the children of the node it entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    Continue,
    SkipChildren,
}

/// Callbacks for [`Document::walk`].
///
/// Implementations match on the node's [`NodeValue`] to handle the
/// variants they care about. The walk is iterative, so arbitrarily deep
/// trees do not grow the call stack.
pub trait Visitor {
    fn enter(&mut self, doc: &Document, node: NodeId) -> Walk {
        let _ = (doc, node);
        Walk::Continue
    }

    fn leave(&mut self, doc: &Document, node: NodeId) {
        let _ = (doc, node);
    }
}

/// A parsed document: the node arena and its root.
pub struct Document {
    arena: Arena<Node>,
    root: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut depth = 0usize;
        for edge in self.traverse(self.root) {
            match edge {
                NodeEdge::Start(id) => {
                    writeln!(f, "{:indent$}{:?}", "", self.get(id).value, indent = depth * 2)?;
                    depth += 1;
                }
                NodeEdge::End(_) => depth -= 1,
            }
        }
        Ok(())
    }
}

impl Document {
    /// An empty document containing only the root.
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(Node::new(NodeValue::Document));
        Self { arena, root }
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Allocate a detached node.
    pub fn new_node(&mut self, value: NodeValue) -> NodeId {
        self.arena.new_node(Node::new(value))
    }

    /// # Panics
    ///
    /// Panics if `id` was removed or belongs to another document.
    #[inline]
    pub fn get(&self, id: NodeId) -> &Node {
        self.arena[id].get()
    }

    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        self.arena[id].get_mut()
    }

    #[inline]
    pub fn value(&self, id: NodeId) -> &NodeValue {
        &self.get(id).value
    }

    #[inline]
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.get(id).value.kind()
    }

    pub fn is_removed(&self, id: NodeId) -> bool {
        id.is_removed(&self.arena)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].parent()
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].first_child()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].last_child()
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].next_sibling()
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].previous_sibling()
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.children(&self.arena)
    }

    /// `id` and all nodes below it, in document order.
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.descendants(&self.arena)
    }

    /// `id` and its ancestors up to the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.ancestors(&self.arena)
    }

    /// Depth-first start/end edges of the subtree at `id`.
    pub fn traverse(&self, id: NodeId) -> impl Iterator<Item = NodeEdge> + '_ {
        id.traverse(&self.arena).map(|edge| match edge {
            ArenaEdge::Start(id) => NodeEdge::Start(id),
            ArenaEdge::End(id) => NodeEdge::End(id),
        })
    }

    /// Visit the subtree at `from` depth first.
    pub fn walk<V: Visitor + ?Sized>(&self, from: NodeId, visitor: &mut V) {
        let mut skipping: Option<NodeId> = None;
        for edge in self.traverse(from) {
            match (edge, skipping) {
                (NodeEdge::End(id), Some(skip)) if id == skip => {
                    skipping = None;
                    visitor.leave(self, id);
                }
                (_, Some(_)) => {}
                (NodeEdge::Start(id), None) => {
                    if visitor.enter(self, id) == Walk::SkipChildren {
                        skipping = Some(id);
                    }
                }
                (NodeEdge::End(id), None) => visitor.leave(self, id),
            }
        }
    }

    /// Concatenated literal text of all text and code descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for node in self.descendants(id) {
            match &self.get(node).value {
                NodeValue::Text(s) | NodeValue::Code(s) => out.push_str(s),
                NodeValue::SoftBreak | NodeValue::HardBreak => out.push('\n'),
                _ => {}
            }
        }
        out
    }

    fn check_detached(&self, id: NodeId) -> Result<(), TreeError> {
        if self.is_removed(id) {
            return Err(TreeError::Removed);
        }
        if id == self.root {
            return Err(TreeError::Root);
        }
        if self.arena[id].parent().is_some() {
            return Err(TreeError::AlreadyAttached);
        }
        Ok(())
    }

    fn check_attached_sibling(&self, id: NodeId) -> Result<(), TreeError> {
        if self.is_removed(id) {
            return Err(TreeError::Removed);
        }
        if id == self.root {
            return Err(TreeError::Root);
        }
        if self.arena[id].parent().is_none() {
            return Err(TreeError::NotAttached);
        }
        Ok(())
    }

    /// Append a detached node as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.check_detached(child)?;
        if self.is_removed(parent) {
            return Err(TreeError::Removed);
        }
        parent.checked_append(child, &mut self.arena)?;
        Ok(())
    }

    /// Insert a detached node as the first child of `parent`.
    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.check_detached(child)?;
        if self.is_removed(parent) {
            return Err(TreeError::Removed);
        }
        parent.checked_prepend(child, &mut self.arena)?;
        Ok(())
    }

    /// Insert a detached node right before `sibling`.
    pub fn insert_before(&mut self, sibling: NodeId, node: NodeId) -> Result<(), TreeError> {
        self.check_detached(node)?;
        self.check_attached_sibling(sibling)?;
        if self.ancestors(sibling).any(|a| a == node) {
            return Err(TreeError::Cycle);
        }
        sibling.checked_insert_before(node, &mut self.arena)?;
        Ok(())
    }

    /// Insert a detached node right after `sibling`.
    pub fn insert_after(&mut self, sibling: NodeId, node: NodeId) -> Result<(), TreeError> {
        self.check_detached(node)?;
        self.check_attached_sibling(sibling)?;
        if self.ancestors(sibling).any(|a| a == node) {
            return Err(TreeError::Cycle);
        }
        sibling.checked_insert_after(node, &mut self.arena)?;
        Ok(())
    }

    /// Detach a node (with its subtree) from its parent and siblings.
    ///
    /// The node stays allocated and can be attached again.
    pub fn detach(&mut self, id: NodeId) -> Result<(), TreeError> {
        if self.is_removed(id) {
            return Err(TreeError::Removed);
        }
        if id == self.root {
            return Err(TreeError::Root);
        }
        id.detach(&mut self.arena);
        Ok(())
    }

    /// Put the detached node `replacement` where `old` is, detaching `old`.
    pub fn replace(&mut self, old: NodeId, replacement: NodeId) -> Result<(), TreeError> {
        self.insert_after(old, replacement)?;
        old.detach(&mut self.arena);
        Ok(())
    }

    /// Detach and free a node and its whole subtree.
    pub fn remove(&mut self, id: NodeId) -> Result<(), TreeError> {
        self.detach(id)?;
        id.remove_subtree(&mut self.arena);
        Ok(())
    }

    /// Append a freshly allocated node. Used by the parsing engines, which
    /// only ever attach nodes they just created.
    pub(crate) fn attach(&mut self, parent: NodeId, child: NodeId) {
        parent.append(child, &mut self.arena);
    }

    pub(crate) fn attach_before(&mut self, sibling: NodeId, node: NodeId) {
        sibling.insert_before(node, &mut self.arena);
    }

    pub(crate) fn attach_after(&mut self, sibling: NodeId, node: NodeId) {
        sibling.insert_after(node, &mut self.arena);
    }

    pub(crate) fn unlink(&mut self, id: NodeId) {
        id.detach(&mut self.arena);
    }

    pub(crate) fn discard(&mut self, id: NodeId) {
        id.remove_subtree(&mut self.arena);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(doc: &mut Document, s: &str) -> NodeId {
        doc.new_node(NodeValue::Text(s.to_string()))
    }

    #[test]
    fn attach_requires_detached_node() {
        let mut doc = Document::new();
        let root = doc.root();
        let para = doc.new_node(NodeValue::Paragraph);
        let a = text(&mut doc, "a");
        doc.append_child(root, para).unwrap();
        doc.append_child(para, a).unwrap();

        assert_eq!(doc.append_child(root, a), Err(TreeError::AlreadyAttached));
        doc.detach(a).unwrap();
        doc.append_child(root, a).unwrap();
        assert_eq!(doc.children(root).count(), 2);
    }

    #[test]
    fn cycles_are_refused() {
        let mut doc = Document::new();
        let quote = doc.new_node(NodeValue::BlockQuote);
        let para = doc.new_node(NodeValue::Paragraph);
        doc.append_child(quote, para).unwrap();

        assert_eq!(doc.append_child(quote, quote), Err(TreeError::Cycle));
        assert_eq!(doc.append_child(para, quote), Err(TreeError::Cycle));
    }

    #[test]
    fn root_cannot_move() {
        let mut doc = Document::new();
        let root = doc.root();
        let para = doc.new_node(NodeValue::Paragraph);
        assert_eq!(doc.append_child(para, root), Err(TreeError::Root));
        assert_eq!(doc.detach(root), Err(TreeError::Root));
    }

    #[test]
    fn replace_keeps_position() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = text(&mut doc, "a");
        let b = text(&mut doc, "b");
        let c = text(&mut doc, "c");
        doc.append_child(root, a).unwrap();
        doc.append_child(root, b).unwrap();
        doc.replace(a, c).unwrap();

        let order: Vec<_> = doc.children(root).collect();
        assert_eq!(order, vec![c, b]);
        assert_eq!(doc.parent(a), None);
        assert_eq!(doc.text_content(root), "cb");
    }

    #[test]
    fn removed_nodes_are_reported() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = text(&mut doc, "a");
        doc.append_child(root, a).unwrap();
        doc.remove(a).unwrap();
        assert!(doc.is_removed(a));
        assert_eq!(doc.detach(a), Err(TreeError::Removed));
    }

    #[test]
    fn walk_can_skip_children() {
        struct Collect(Vec<NodeKind>);
        impl Visitor for Collect {
            fn enter(&mut self, doc: &Document, node: NodeId) -> Walk {
                self.0.push(doc.kind(node));
                if doc.kind(node) == NodeKind::Emphasis {
                    Walk::SkipChildren
                } else {
                    Walk::Continue
                }
            }
        }

        let mut doc = Document::new();
        let root = doc.root();
        let para = doc.new_node(NodeValue::Paragraph);
        let emph = doc.new_node(NodeValue::Emphasis('*'));
        let inner = text(&mut doc, "hidden");
        let after = text(&mut doc, "shown");
        doc.append_child(root, para).unwrap();
        doc.append_child(para, emph).unwrap();
        doc.append_child(emph, inner).unwrap();
        doc.append_child(para, after).unwrap();

        let mut visitor = Collect(Vec::new());
        doc.walk(root, &mut visitor);
        assert_eq!(
            visitor.0,
            vec![
                NodeKind::Document,
                NodeKind::Paragraph,
                NodeKind::Emphasis,
                NodeKind::Text
            ]
        );
    }
}
