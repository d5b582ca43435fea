//! Read-only cursor over a tree.
//!
//! A [`Navigator`] sits either on a node or on one attribute of an element.
//! Every `move_to_*` method returns whether it moved; a failed move leaves
//! the cursor where it was.

use strum_macros::Display;

use crate::NodeId;
use crate::attribute::Attribute;
use crate::error::DomError;
use crate::node::NodeType;
use crate::path;
use crate::tree::DomTree;

/// What the cursor is currently positioned on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum NavigatorNodeKind {
    /// The Document node.
    Root,
    /// An element.
    Element,
    /// A text node.
    Text,
    /// A comment or other markup declaration.
    Comment,
    /// An attribute of the current element.
    Attribute,
}

/// Cursor over a [`DomTree`].
#[derive(Debug, Clone, Copy)]
pub struct Navigator<'a> {
    tree: &'a DomTree,
    node: NodeId,
    attribute: Option<usize>,
}

impl<'a> Navigator<'a> {
    /// A cursor positioned on `node`.
    ///
    /// # Errors
    ///
    /// Returns [`DomError::InvalidNode`] when `node` is not part of `tree`.
    pub fn new(tree: &'a DomTree, node: NodeId) -> Result<Self, DomError> {
        let _ = tree.node(node)?;
        Ok(Self {
            tree,
            node,
            attribute: None,
        })
    }

    /// A cursor positioned on the Document node.
    #[must_use]
    pub const fn root(tree: &'a DomTree) -> Self {
        Self {
            tree,
            node: NodeId::ROOT,
            attribute: None,
        }
    }

    /// The node under the cursor (the owner element when on an attribute).
    #[must_use]
    pub const fn node(&self) -> NodeId {
        self.node
    }

    /// The attribute under the cursor, if any.
    #[must_use]
    pub fn attribute(&self) -> Option<&'a Attribute> {
        let index = self.attribute?;
        self.tree.attributes(self.node)?.get_index(index)
    }

    /// What the cursor is on.
    #[must_use]
    pub fn kind(&self) -> NavigatorNodeKind {
        if self.attribute.is_some() {
            return NavigatorNodeKind::Attribute;
        }
        match self.tree.get(self.node).map(|n| &n.node_type) {
            Some(NodeType::Element(_)) => NavigatorNodeKind::Element,
            Some(NodeType::Text(_)) => NavigatorNodeKind::Text,
            Some(NodeType::Comment(_)) => NavigatorNodeKind::Comment,
            Some(NodeType::Document) | None => NavigatorNodeKind::Root,
        }
    }

    /// Attribute name, element name, or `#text` / `#comment` / `#document`.
    #[must_use]
    pub fn name(&self) -> &'a str {
        if let Some(attribute) = self.attribute() {
            return &attribute.name;
        }
        self.tree.name(self.node).unwrap_or_default()
    }

    /// Attribute value, text, comment markup, or the inner text of an element.
    #[must_use]
    pub fn value(&self) -> String {
        if let Some(attribute) = self.attribute() {
            return attribute.value.clone();
        }
        match self.tree.get(self.node).map(|n| &n.node_type) {
            Some(NodeType::Comment(raw)) => raw.clone(),
            _ => self.tree.inner_text(self.node),
        }
    }

    /// Whether the current element has attributes.
    #[must_use]
    pub fn has_attributes(&self) -> bool {
        self.attribute.is_none()
            && self
                .tree
                .attributes(self.node)
                .is_some_and(|a| !a.is_empty())
    }

    /// Whether the current node has children.
    #[must_use]
    pub fn has_children(&self) -> bool {
        self.attribute.is_none() && self.tree.has_children(self.node)
    }

    fn go(&mut self, target: Option<NodeId>) -> bool {
        match target {
            Some(node) => {
                self.node = node;
                self.attribute = None;
                true
            }
            None => false,
        }
    }

    /// Move to the parent, or from an attribute back to its element.
    pub fn move_to_parent(&mut self) -> bool {
        if self.attribute.take().is_some() {
            return true;
        }
        self.go(self.tree.parent(self.node))
    }

    /// Move to the first child.
    pub fn move_to_first_child(&mut self) -> bool {
        self.attribute.is_none() && self.go(self.tree.first_child(self.node))
    }

    /// Move to the next sibling.
    pub fn move_to_next(&mut self) -> bool {
        self.attribute.is_none() && self.go(self.tree.next_sibling(self.node))
    }

    /// Move to the previous sibling.
    pub fn move_to_previous(&mut self) -> bool {
        self.attribute.is_none() && self.go(self.tree.prev_sibling(self.node))
    }

    /// Move to the first sibling.
    pub fn move_to_first(&mut self) -> bool {
        if self.attribute.is_some() {
            return false;
        }
        let first = self.tree.parent(self.node).and_then(|p| self.tree.first_child(p));
        self.go(first)
    }

    /// Move to the Document node.
    pub fn move_to_root(&mut self) {
        self.node = NodeId::ROOT;
        self.attribute = None;
    }

    /// Move onto the first attribute of the current element.
    pub fn move_to_first_attribute(&mut self) -> bool {
        if self.attribute.is_some() || !self.has_attributes() {
            return false;
        }
        self.attribute = Some(0);
        true
    }

    /// Move onto the next attribute of the same element.
    pub fn move_to_next_attribute(&mut self) -> bool {
        let Some(index) = self.attribute else {
            return false;
        };
        let count = self.tree.attributes(self.node).map_or(0, |a| a.len());
        if index + 1 < count {
            self.attribute = Some(index + 1);
            true
        } else {
            false
        }
    }

    /// Move to the element whose `id` attribute is `id`.
    ///
    /// # Errors
    ///
    /// Returns [`DomError::IdIndexDisabled`] when the tree has no id index.
    pub fn move_to_id(&mut self, id: &str) -> Result<bool, DomError> {
        Ok(self.go(self.tree.get_element_by_id(id)?))
    }

    /// Whether both cursors sit on the same node and attribute.
    #[must_use]
    pub fn is_same_position(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree)
            && self.node == other.node
            && self.attribute == other.attribute
    }

    /// Evaluate a path expression from the current node.
    ///
    /// # Errors
    ///
    /// Returns [`DomError::InvalidPath`] for malformed expressions.
    pub fn select(&self, expression: &str) -> Result<Vec<NodeId>, DomError> {
        path::select(self.tree, self.node, expression)
    }

    /// First node matched by a path expression from the current node.
    ///
    /// # Errors
    ///
    /// Returns [`DomError::InvalidPath`] for malformed expressions.
    pub fn select_single(&self, expression: &str) -> Result<Option<NodeId>, DomError> {
        path::select_single(self.tree, self.node, expression)
    }
}
