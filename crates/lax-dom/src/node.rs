//! Node model: handles, payloads and source metadata.

use std::ops::Range;
use std::sync::OnceLock;

use strum_macros::Display;

use crate::attribute::AttributeList;

/// A type-safe index into the document arena.
///
/// `NodeId` provides O(1) access to any node in the tree without borrowing
/// issues. Parent, sibling and attribute-owner relations are all expressed as
/// `NodeId`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl NodeId {
    /// The root document node is always at index 0.
    pub const ROOT: Self = Self(0);
}

/// Where a node or attribute starts in the parsed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourcePosition {
    /// 1-based line number.
    pub line: usize,
    /// 1-based column number, counted in characters.
    pub column: usize,
    /// 0-based byte offset from the start of the input.
    pub offset: usize,
}

/// A byte range of the parsed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// First byte of the span.
    pub start: usize,
    /// Length of the span in bytes.
    pub len: usize,
}

impl Span {
    /// Span covering `start..end`.
    #[must_use]
    pub const fn between(start: usize, end: usize) -> Self {
        Self {
            start,
            len: end.saturating_sub(start),
        }
    }

    /// One past the last byte.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.start + self.len
    }

    /// The span as a slice range.
    #[must_use]
    pub const fn range(&self) -> Range<usize> {
        self.start..self.end()
    }
}

/// The variant tag of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum NodeKind {
    /// The document root.
    Document,
    /// An element with a name, attributes and children.
    Element,
    /// A comment or any other `<!...>` markup declaration.
    Comment,
    /// Character data.
    Text,
}

/// Node payload.
#[derive(Debug, Clone)]
pub enum NodeType {
    /// The document root. Exactly one per tree, at [`NodeId::ROOT`].
    Document,
    /// An element.
    Element(ElementData),
    /// Character data, kept exactly as it appeared in the source.
    Text(String),
    /// The full raw text of a markup declaration, delimiters included
    /// (`<!-- x -->`, `<!DOCTYPE html>`).
    Comment(String),
}

impl NodeType {
    /// The variant tag of this payload.
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        match self {
            Self::Document => NodeKind::Document,
            Self::Element(_) => NodeKind::Element,
            Self::Text(_) => NodeKind::Text,
            Self::Comment(_) => NodeKind::Comment,
        }
    }
}

/// Element-specific data.
#[derive(Debug, Clone)]
pub struct ElementData {
    /// Lowercase tag name, used for every name comparison.
    pub tag_name: String,
    /// The tag name exactly as written in the source.
    pub original_name: String,
    /// Attributes in source order, duplicates included.
    pub attrs: AttributeList,
}

impl ElementData {
    /// Create element data for `name`, keeping the original case aside.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            tag_name: name.to_lowercase(),
            original_name: name.to_string(),
            attrs: AttributeList::new(),
        }
    }

    /// Returns the element's id attribute value if present.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.attrs.value("id")
    }
}

/// An arena entry.
///
/// Relationships are stored as indices so traversal in any direction is O(1).
/// Source metadata is only present for nodes produced by the parser; nodes
/// created, cloned or imported afterwards are "not from source".
#[derive(Debug, Clone)]
pub struct Node {
    /// Payload and variant.
    pub node_type: NodeType,
    /// Parent node, `None` for the root and for detached nodes.
    pub parent: Option<NodeId>,
    /// Ordered children.
    pub children: Vec<NodeId>,
    /// The node immediately following this one in the parent's children.
    pub next_sibling: Option<NodeId>,
    /// The node immediately preceding this one in the parent's children.
    pub prev_sibling: Option<NodeId>,
    pub(crate) position: Option<SourcePosition>,
    pub(crate) outer: Option<Span>,
    pub(crate) inner: Option<Span>,
    pub(crate) closed: bool,
    pub(crate) changed: bool,
    pub(crate) inner_html: OnceLock<String>,
    pub(crate) outer_html: OnceLock<String>,
}

impl Node {
    pub(crate) fn new(node_type: NodeType) -> Self {
        // Only elements wait for an end construct.
        let closed = !matches!(node_type, NodeType::Element(_));
        Self {
            node_type,
            parent: None,
            children: Vec::new(),
            next_sibling: None,
            prev_sibling: None,
            position: None,
            outer: None,
            inner: None,
            closed,
            changed: false,
            inner_html: OnceLock::new(),
            outer_html: OnceLock::new(),
        }
    }

    /// The variant tag of this node.
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        self.node_type.kind()
    }

    /// Element payload, if this is an element.
    #[must_use]
    pub const fn element(&self) -> Option<&ElementData> {
        match &self.node_type {
            NodeType::Element(data) => Some(data),
            _ => None,
        }
    }

    /// Lowercase element name; `#text`, `#comment` or `#document` otherwise.
    #[must_use]
    pub fn name(&self) -> &str {
        match &self.node_type {
            NodeType::Element(data) => &data.tag_name,
            NodeType::Text(_) => "#text",
            NodeType::Comment(_) => "#comment",
            NodeType::Document => "#document",
        }
    }

    /// Where the node started in the parsed text.
    #[must_use]
    pub const fn position(&self) -> Option<SourcePosition> {
        self.position
    }

    /// Span from the start tag through the end tag inclusive.
    #[must_use]
    pub const fn outer_span(&self) -> Option<Span> {
        self.outer
    }

    /// Span of the content between the start and end tags.
    #[must_use]
    pub const fn inner_span(&self) -> Option<Span> {
        self.inner
    }

    /// Whether the node's end construct has been located.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whether the node was mutated after parsing.
    #[must_use]
    pub const fn is_changed(&self) -> bool {
        self.changed
    }

    pub(crate) fn invalidate(&mut self) {
        self.changed = true;
        let _ = self.inner_html.take();
        let _ = self.outer_html.take();
    }
}
