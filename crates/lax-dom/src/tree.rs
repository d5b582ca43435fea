//! Arena document tree.
//!
//! All nodes live in one vector and refer to each other by [`NodeId`]. The
//! tree also owns the text it was parsed from, so unchanged parsed nodes can
//! answer `inner_html`/`outer_html` straight from their source spans.

use std::borrow::Cow;
use std::collections::HashMap;

use crate::attribute::{Attribute, AttributeList};
use crate::element_flags::ElementTable;
use crate::error::DomError;
use crate::iter::{
    AncestorIterator, DescendantIterator, FollowingSiblingIterator, PrecedingSiblingIterator,
};
use crate::NodeId;
use crate::navigator::Navigator;
use crate::node::{ElementData, Node, NodeKind, NodeType, SourcePosition, Span};
use crate::path;
use crate::serialize::{self, WriteOptions};

/// Arena-based document tree with O(1) node access and traversal.
///
/// The `Document` node is always at index 0 ([`NodeId::ROOT`]). Nodes that are
/// removed from the tree stay allocated and can be re-inserted; they are
/// simply detached.
#[derive(Debug, Clone)]
pub struct DomTree {
    nodes: Vec<Node>,
    source: String,
    id_index: Option<HashMap<String, NodeId>>,
    elements: Cow<'static, ElementTable>,
    write_options: WriteOptions,
}

impl DomTree {
    /// Create a tree holding only the Document node, with id indexing on.
    #[must_use]
    pub fn new() -> Self {
        let mut document = Node::new(NodeType::Document);
        document.closed = true;
        Self {
            nodes: vec![document],
            source: String::new(),
            id_index: Some(HashMap::new()),
            elements: Cow::Borrowed(ElementTable::html()),
            write_options: WriteOptions::default(),
        }
    }

    /// Get the root document node ID.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a node by its ID.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Get a mutable reference to a node by its ID.
    ///
    /// Writing through this reference bypasses change tracking and link
    /// maintenance; prefer the mutation methods.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    /// Get a node, failing on unknown ids.
    ///
    /// # Errors
    ///
    /// Returns [`DomError::InvalidNode`] when `id` is not part of this tree.
    pub fn node(&self, id: NodeId) -> Result<&Node, DomError> {
        self.nodes.get(id.0).ok_or(DomError::InvalidNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, DomError> {
        self.nodes.get_mut(id.0).ok_or(DomError::InvalidNode(id))
    }

    /// Get the number of nodes in the arena, detached ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: the Document node is allocated on creation.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // ---------------------------------------------------------------------
    // Document-level state
    // ---------------------------------------------------------------------

    /// The text this tree was parsed from (empty for hand-built trees).
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Replace the backing source text. Spans recorded on nodes index into it.
    pub fn set_source(&mut self, source: String) {
        self.source = source;
    }

    /// Classification table used when serializing.
    #[must_use]
    pub fn element_table(&self) -> &ElementTable {
        &self.elements
    }

    /// Use a custom classification table.
    pub fn set_element_table(&mut self, elements: ElementTable) {
        self.elements = Cow::Owned(elements);
    }

    /// Options used by `inner_html`, `outer_html` and [`DomTree::serialize`].
    #[must_use]
    pub const fn write_options(&self) -> &WriteOptions {
        &self.write_options
    }

    /// Replace the output options. Cached serializations are dropped.
    pub fn set_write_options(&mut self, options: WriteOptions) {
        self.write_options = options;
        for node in &mut self.nodes {
            let _ = node.inner_html.take();
            let _ = node.outer_html.take();
        }
    }

    /// Whether `id` attribute values are indexed.
    #[must_use]
    pub const fn id_indexing(&self) -> bool {
        self.id_index.is_some()
    }

    /// Turn id indexing on (rebuilding the index) or off.
    pub fn set_id_indexing(&mut self, enabled: bool) {
        if !enabled {
            self.id_index = None;
            return;
        }
        self.id_index = Some(HashMap::new());
        self.index_subtree(NodeId::ROOT);
    }

    /// Look up an element by its `id` attribute (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`DomError::IdIndexDisabled`] when the tree was built without
    /// id indexing.
    pub fn get_element_by_id(&self, id: &str) -> Result<Option<NodeId>, DomError> {
        let index = self.id_index.as_ref().ok_or(DomError::IdIndexDisabled)?;
        Ok(index.get(&id.to_lowercase()).copied())
    }

    /// Forget every change mark and cached serialization.
    ///
    /// Parsers call this once the tree is complete so that untouched nodes
    /// serialize from their source spans.
    pub fn accept_changes(&mut self) {
        for node in &mut self.nodes {
            node.changed = false;
            let _ = node.inner_html.take();
            let _ = node.outer_html.take();
        }
    }

    // ---------------------------------------------------------------------
    // Node creation
    // ---------------------------------------------------------------------

    /// Allocate a new node and return its ID.
    /// The node is not yet attached to the tree.
    pub fn alloc(&mut self, node_type: NodeType) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(node_type));
        if let Some(attrs) = self.attrs_mut(id) {
            attrs.set_owner(Some(id));
        }
        id
    }

    /// Allocate a detached, closed element named `name`.
    pub fn create_element(&mut self, name: &str) -> NodeId {
        let id = self.alloc(NodeType::Element(ElementData::new(name)));
        self.nodes[id.0].closed = true;
        id
    }

    /// Allocate a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeType::Text(text.to_string()))
    }

    /// Allocate a detached comment; `<!--`/`-->` are added when missing.
    pub fn create_comment(&mut self, comment: &str) -> NodeId {
        let raw = if comment.starts_with("<!") {
            comment.to_string()
        } else {
            format!("<!--{comment}-->")
        };
        self.alloc(NodeType::Comment(raw))
    }

    // ---------------------------------------------------------------------
    // Source metadata (set by parsers)
    // ---------------------------------------------------------------------

    /// Record where `id` started in the source.
    pub fn set_position(&mut self, id: NodeId, position: SourcePosition) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.position = Some(position);
        }
    }

    /// Record the outer and inner spans of `id`.
    pub fn set_spans(&mut self, id: NodeId, outer: Option<Span>, inner: Option<Span>) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.outer = outer;
            node.inner = inner;
        }
    }

    /// Mark whether the end construct of `id` has been located.
    pub fn set_closed(&mut self, id: NodeId, closed: bool) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.closed = closed;
        }
    }

    /// Whether the end construct of `id` has been located.
    #[must_use]
    pub fn is_closed(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(Node::is_closed)
    }

    // ---------------------------------------------------------------------
    // Navigation
    // ---------------------------------------------------------------------

    /// The variant tag of `id`.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.get(id).map(Node::kind)
    }

    /// Lowercase element name, or `#text` / `#comment` / `#document`.
    #[must_use]
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.get(id).map(Node::name)
    }

    /// Get the parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Get all children of a node.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Whether `id` has any children.
    #[must_use]
    pub fn has_children(&self, id: NodeId) -> bool {
        !self.children(id).is_empty()
    }

    /// Get the first child of a node.
    #[must_use]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.children.first().copied())
    }

    /// Get the last child of a node.
    #[must_use]
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.children.last().copied())
    }

    /// Get the next sibling of a node.
    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.next_sibling)
    }

    /// Get the previous sibling of a node.
    #[must_use]
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.prev_sibling)
    }

    /// Check if `descendant` is a descendant of `ancestor`.
    #[must_use]
    pub fn is_descendant_of(&self, descendant: NodeId, ancestor: NodeId) -> bool {
        self.ancestors(descendant).any(|id| id == ancestor)
    }

    /// Iterate over all ancestors of a node, from parent to root.
    #[must_use]
    pub fn ancestors(&self, id: NodeId) -> AncestorIterator<'_> {
        AncestorIterator::new(self, self.parent(id))
    }

    /// Iterate over the node itself, then its ancestors.
    #[must_use]
    pub fn ancestors_and_self(&self, id: NodeId) -> AncestorIterator<'_> {
        AncestorIterator::new(self, self.get(id).map(|_| id))
    }

    /// Ancestor elements named `name`, nearest first.
    pub fn ancestors_named<'a>(
        &'a self,
        id: NodeId,
        name: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.ancestors(id).filter(move |&a| self.is_element_named(a, name))
    }

    /// Iterate over preceding siblings (from immediately before to first child).
    #[must_use]
    pub fn preceding_siblings(&self, id: NodeId) -> PrecedingSiblingIterator<'_> {
        PrecedingSiblingIterator::new(self, self.prev_sibling(id))
    }

    /// Iterate over following siblings (from immediately after to last child).
    #[must_use]
    pub fn following_siblings(&self, id: NodeId) -> FollowingSiblingIterator<'_> {
        FollowingSiblingIterator::new(self, self.next_sibling(id))
    }

    /// Every node below `id`, in document order.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> DescendantIterator<'_> {
        DescendantIterator::new(self, id)
    }

    /// Descendant elements named `name`, in document order.
    pub fn descendants_named<'a>(
        &'a self,
        id: NodeId,
        name: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.descendants(id)
            .filter(move |&d| self.is_element_named(d, name))
    }

    /// First child element named `name`.
    #[must_use]
    pub fn element(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|&c| self.is_element_named(c, name))
    }

    /// Every child element named `name`.
    #[must_use]
    pub fn elements(&self, parent: NodeId, name: &str) -> Vec<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .filter(|&c| self.is_element_named(c, name))
            .collect()
    }

    /// Whether `id` is an element named `name` (case-insensitive).
    #[must_use]
    pub fn is_element_named(&self, id: NodeId, name: &str) -> bool {
        self.as_element(id)
            .is_some_and(|e| e.tag_name.eq_ignore_ascii_case(name))
    }

    /// Get element data if this node is an element.
    #[must_use]
    pub fn as_element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id).and_then(Node::element)
    }

    /// Get text content if this node is a text node.
    #[must_use]
    pub fn as_text(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.node_type {
            NodeType::Text(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// Get the raw markup of a comment node.
    #[must_use]
    pub fn as_comment(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.node_type {
            NodeType::Comment(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// The first element child of the Document node.
    #[must_use]
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(NodeId::ROOT)
            .iter()
            .copied()
            .find(|&id| self.as_element(id).is_some())
    }

    /// The first `body` element in the document.
    #[must_use]
    pub fn body(&self) -> Option<NodeId> {
        self.descendants_named(NodeId::ROOT, "body").next()
    }

    /// Concatenated text of every text node below `id` (or the text itself).
    #[must_use]
    pub fn inner_text(&self, id: NodeId) -> String {
        match self.get(id).map(|n| &n.node_type) {
            Some(NodeType::Text(text)) => text.clone(),
            Some(NodeType::Comment(_)) | None => String::new(),
            Some(_) => self
                .descendants(id)
                .filter_map(|d| self.as_text(d))
                .collect(),
        }
    }

    /// Nodes matched by a path expression evaluated from `context`.
    ///
    /// # Errors
    ///
    /// Returns [`DomError::InvalidPath`] for malformed expressions.
    pub fn select(&self, context: NodeId, expression: &str) -> Result<Vec<NodeId>, DomError> {
        path::select(self, context, expression)
    }

    /// First node matched by a path expression evaluated from `context`.
    ///
    /// # Errors
    ///
    /// Returns [`DomError::InvalidPath`] for malformed expressions.
    pub fn select_single(
        &self,
        context: NodeId,
        expression: &str,
    ) -> Result<Option<NodeId>, DomError> {
        path::select_single(self, context, expression)
    }

    /// A read-only cursor positioned on `id`.
    ///
    /// # Errors
    ///
    /// Returns [`DomError::InvalidNode`] for unknown ids.
    pub fn navigator(&self, id: NodeId) -> Result<Navigator<'_>, DomError> {
        Navigator::new(self, id)
    }

    // ---------------------------------------------------------------------
    // Serialization
    // ---------------------------------------------------------------------

    /// Markup of the node including its own tags.
    ///
    /// Unchanged parsed nodes answer from the source text; others are
    /// serialized once and cached until the node changes. Only the node's own
    /// cache is tracked: a change below `id` does not refresh it.
    #[must_use]
    pub fn outer_html(&self, id: NodeId) -> &str {
        let Some(node) = self.get(id) else {
            return "";
        };
        if !node.changed
            && let Some(text) = node.outer.and_then(|s| self.source.get(s.range()))
        {
            return text;
        }
        node.outer_html
            .get_or_init(|| serialize::write(self, id, &self.write_options))
    }

    /// Markup of the node's content, without its own tags.
    #[must_use]
    pub fn inner_html(&self, id: NodeId) -> &str {
        let Some(node) = self.get(id) else {
            return "";
        };
        if !node.changed
            && let Some(text) = node.inner.and_then(|s| self.source.get(s.range()))
        {
            return text;
        }
        node.inner_html
            .get_or_init(|| serialize::write_children(self, id, &self.write_options))
    }

    /// Serialize `id` with the tree's write options, ignoring caches.
    #[must_use]
    pub fn serialize(&self, id: NodeId) -> String {
        serialize::write(self, id, &self.write_options)
    }

    // ---------------------------------------------------------------------
    // Attributes
    // ---------------------------------------------------------------------

    fn attrs_mut(&mut self, id: NodeId) -> Option<&mut AttributeList> {
        match &mut self.nodes.get_mut(id.0)?.node_type {
            NodeType::Element(data) => Some(&mut data.attrs),
            _ => None,
        }
    }

    /// Attributes of an element.
    #[must_use]
    pub fn attributes(&self, id: NodeId) -> Option<&AttributeList> {
        self.as_element(id).map(|e| &e.attrs)
    }

    /// Value of the first attribute named `name`.
    #[must_use]
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id).and_then(|a| a.value(name))
    }

    /// Value of the first attribute named `name`, or `default`.
    #[must_use]
    pub fn attribute_or<'a>(&'a self, id: NodeId, name: &str, default: &'a str) -> &'a str {
        self.attribute(id, name).unwrap_or(default)
    }

    /// Set the first attribute named `name`, creating it when absent.
    ///
    /// # Errors
    ///
    /// Fails for unknown ids, non-elements and empty names.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        if name.is_empty() {
            return Err(DomError::EmptyAttributeName);
        }
        let _ = self.node(id)?;
        let attrs = self.attrs_mut(id).ok_or(DomError::NotAnElement(id))?;
        let previous = match attrs.get_mut(name) {
            Some(existing) => Some(std::mem::replace(&mut existing.value, value.to_string())),
            None => {
                let mut attribute = Attribute::new(name, value);
                attribute.owner = Some(id);
                attrs.push(attribute);
                None
            }
        };
        if name.eq_ignore_ascii_case("id") {
            let dropped = self.unindex_id(previous.as_deref(), id);
            self.resolve_ids(dropped.as_slice());
            self.index_ids_of(id);
        }
        self.nodes[id.0].invalidate();
        Ok(())
    }

    /// Append `attribute` to an element, keeping existing same-name entries.
    ///
    /// # Errors
    ///
    /// Fails for unknown ids, non-elements and empty names.
    pub fn push_attribute(&mut self, id: NodeId, mut attribute: Attribute) -> Result<(), DomError> {
        if attribute.name.is_empty() {
            return Err(DomError::EmptyAttributeName);
        }
        let _ = self.node(id)?;
        attribute.owner = Some(id);
        let is_id = attribute.is_named("id");
        self.attrs_mut(id)
            .ok_or(DomError::NotAnElement(id))?
            .push(attribute);
        if is_id {
            self.index_ids_of(id);
        }
        self.nodes[id.0].invalidate();
        Ok(())
    }

    /// Remove every attribute named `name`; returns how many were removed.
    ///
    /// # Errors
    ///
    /// Fails for unknown ids and non-elements.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<usize, DomError> {
        let _ = self.node(id)?;
        let previous = self.attribute(id, "id").map(str::to_string);
        let removed = self
            .attrs_mut(id)
            .ok_or(DomError::NotAnElement(id))?
            .remove(name);
        if removed > 0 {
            if name.eq_ignore_ascii_case("id") {
                let dropped = self.unindex_id(previous.as_deref(), id);
                self.resolve_ids(dropped.as_slice());
            }
            self.nodes[id.0].invalidate();
        }
        Ok(removed)
    }

    /// Whether `id` is the Document node or hangs below it.
    #[must_use]
    pub fn is_attached(&self, id: NodeId) -> bool {
        id == NodeId::ROOT || self.is_descendant_of(id, NodeId::ROOT)
    }

    /// Index the id of `id` itself. Detached nodes are never indexed.
    fn index_ids_of(&mut self, id: NodeId) {
        if self.id_index.is_none() || !self.is_attached(id) {
            return;
        }
        let Some(value) = self.as_element(id).and_then(ElementData::id) else {
            return;
        };
        let key = value.to_lowercase();
        if let Some(index) = self.id_index.as_mut() {
            let _ = index.insert(key, id);
        }
    }

    /// Index `id` and everything below it.
    fn index_subtree(&mut self, id: NodeId) {
        if self.id_index.is_none() || !self.is_attached(id) {
            return;
        }
        let nodes: Vec<NodeId> = std::iter::once(id).chain(self.descendants(id)).collect();
        for node in nodes {
            self.index_ids_of(node);
        }
    }

    /// Drop the index entries of `id` and everything below it; returns the
    /// keys that were dropped.
    fn unindex_subtree(&mut self, id: NodeId) -> Vec<String> {
        if self.id_index.is_none() || !self.is_attached(id) {
            return Vec::new();
        }
        let entries: Vec<(String, NodeId)> = std::iter::once(id)
            .chain(self.descendants(id))
            .filter_map(|node| {
                self.as_element(node)
                    .and_then(ElementData::id)
                    .map(|value| (value.to_string(), node))
            })
            .collect();
        entries
            .into_iter()
            .filter_map(|(value, node)| self.unindex_id(Some(value.as_str()), node))
            .collect()
    }

    /// Drop the entry for `value` if it points at `id`; returns the key.
    fn unindex_id(&mut self, value: Option<&str>, id: NodeId) -> Option<String> {
        let (value, index) = (value?, self.id_index.as_mut()?);
        let key = value.to_lowercase();
        if index.get(&key) != Some(&id) {
            return None;
        }
        let _ = index.remove(&key);
        Some(key)
    }

    /// Point each dropped key at the last attached element still carrying
    /// it, so a duplicate id resurfaces once the shadowing element is gone.
    fn resolve_ids(&mut self, keys: &[String]) {
        if keys.is_empty() || self.id_index.is_none() {
            return;
        }
        let found: Vec<(String, NodeId)> = self
            .descendants(NodeId::ROOT)
            .filter_map(|node| {
                let key = self.as_element(node)?.id()?.to_lowercase();
                keys.contains(&key).then_some((key, node))
            })
            .collect();
        if let Some(index) = self.id_index.as_mut() {
            index.extend(found);
        }
    }

    // ---------------------------------------------------------------------
    // Character data
    // ---------------------------------------------------------------------

    /// Replace the data of a text or comment node.
    ///
    /// # Errors
    ///
    /// Fails for unknown ids and for elements or the document.
    pub fn set_text(&mut self, id: NodeId, text: &str) -> Result<(), DomError> {
        let node = self.node_mut(id)?;
        match &mut node.node_type {
            NodeType::Text(data) | NodeType::Comment(data) => {
                text.clone_into(data);
            }
            _ => return Err(DomError::NotCharacterData(id)),
        }
        node.invalidate();
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------------

    fn check_insert(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let _ = self.node(parent)?;
        let _ = self.node(child)?;
        if child == NodeId::ROOT || child == parent || self.is_descendant_of(parent, child) {
            return Err(DomError::HierarchyCycle { parent, child });
        }
        Ok(())
    }

    fn index_of(&self, parent: NodeId, reference: NodeId) -> Result<usize, DomError> {
        self.node(parent)?
            .children
            .iter()
            .position(|&c| c == reference)
            .ok_or(DomError::ReferenceNotChild { parent, reference })
    }

    /// Unlink `id` from its parent, if any.
    fn unlink(&mut self, id: NodeId) {
        let (parent, prev, next) = {
            let node = &self.nodes[id.0];
            (node.parent, node.prev_sibling, node.next_sibling)
        };
        let Some(parent) = parent else {
            return;
        };
        let dropped = self.unindex_subtree(id);
        self.nodes[parent.0].children.retain(|&c| c != id);
        if let Some(prev) = prev {
            self.nodes[prev.0].next_sibling = next;
        }
        if let Some(next) = next {
            self.nodes[next.0].prev_sibling = prev;
        }
        let node = &mut self.nodes[id.0];
        node.parent = None;
        node.prev_sibling = None;
        node.next_sibling = None;
        self.nodes[parent.0].invalidate();
        self.resolve_ids(&dropped);
    }

    /// Link a detached `child` into `parent` at `index`.
    fn link_at(&mut self, parent: NodeId, index: usize, child: NodeId) {
        let index = index.min(self.nodes[parent.0].children.len());
        self.nodes[parent.0].children.insert(index, child);
        let children = &self.nodes[parent.0].children;
        let prev = index.checked_sub(1).map(|i| children[i]);
        let next = children.get(index + 1).copied();

        let node = &mut self.nodes[child.0];
        node.parent = Some(parent);
        node.prev_sibling = prev;
        node.next_sibling = next;
        if let Some(prev) = prev {
            self.nodes[prev.0].next_sibling = Some(child);
        }
        if let Some(next) = next {
            self.nodes[next.0].prev_sibling = Some(child);
        }
        self.nodes[parent.0].invalidate();
        self.index_subtree(child);
    }

    /// Detach `id` from its parent. Detached nodes can be inserted again.
    ///
    /// # Errors
    ///
    /// Returns [`DomError::InvalidNode`] for unknown ids.
    pub fn detach(&mut self, id: NodeId) -> Result<(), DomError> {
        let _ = self.node(id)?;
        self.unlink(id);
        Ok(())
    }

    /// Appends `child` as the last child of `parent`, updating all
    /// relationships. `child` is first detached from any previous parent.
    ///
    /// # Errors
    ///
    /// Fails for unknown ids and when `child` is `parent` or one of its
    /// ancestors.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.check_insert(parent, child)?;
        self.unlink(child);
        let end = self.nodes[parent.0].children.len();
        self.link_at(parent, end, child);
        Ok(())
    }

    /// Inserts `child` as the first child of `parent`.
    ///
    /// # Errors
    ///
    /// Same conditions as [`DomTree::append_child`].
    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.check_insert(parent, child)?;
        self.unlink(child);
        self.link_at(parent, 0, child);
        Ok(())
    }

    /// Inserts `new_child` immediately before `reference` in `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`DomError::ReferenceNotChild`] when `reference` is not a child
    /// of `parent`, plus the [`DomTree::append_child`] conditions.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        new_child: NodeId,
        reference: NodeId,
    ) -> Result<(), DomError> {
        self.check_insert(parent, new_child)?;
        let _ = self.index_of(parent, reference)?;
        if new_child == reference {
            return Ok(());
        }
        self.unlink(new_child);
        let index = self.index_of(parent, reference)?;
        self.link_at(parent, index, new_child);
        Ok(())
    }

    /// Inserts `new_child` immediately after `reference` in `parent`.
    ///
    /// # Errors
    ///
    /// Same conditions as [`DomTree::insert_before`].
    pub fn insert_after(
        &mut self,
        parent: NodeId,
        new_child: NodeId,
        reference: NodeId,
    ) -> Result<(), DomError> {
        self.check_insert(parent, new_child)?;
        let _ = self.index_of(parent, reference)?;
        if new_child == reference {
            return Ok(());
        }
        self.unlink(new_child);
        let index = self.index_of(parent, reference)?;
        self.link_at(parent, index + 1, new_child);
        Ok(())
    }

    /// Removes `child` from `parent`; the removed node keeps its own subtree.
    ///
    /// # Errors
    ///
    /// Returns [`DomError::ReferenceNotChild`] when `child` is not a child of
    /// `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<NodeId, DomError> {
        let _ = self.index_of(parent, child)?;
        self.unlink(child);
        Ok(child)
    }

    /// Removes `child` from `parent` and promotes its children into its place.
    ///
    /// # Errors
    ///
    /// Same conditions as [`DomTree::remove_child`].
    pub fn remove_child_keep_grandchildren(
        &mut self,
        parent: NodeId,
        child: NodeId,
    ) -> Result<NodeId, DomError> {
        let index = self.index_of(parent, child)?;
        let grandchildren = self.nodes[child.0].children.clone();
        self.unlink(child);
        for (offset, grandchild) in grandchildren.into_iter().enumerate() {
            self.unlink(grandchild);
            self.link_at(parent, index + offset, grandchild);
        }
        Ok(child)
    }

    /// Puts `new_child` where `old_child` was; returns `old_child`.
    ///
    /// # Errors
    ///
    /// Returns [`DomError::ReferenceNotChild`] when `old_child` is not a child
    /// of `parent`, plus the [`DomTree::append_child`] conditions.
    pub fn replace_child(
        &mut self,
        parent: NodeId,
        new_child: NodeId,
        old_child: NodeId,
    ) -> Result<NodeId, DomError> {
        self.check_insert(parent, new_child)?;
        let _ = self.index_of(parent, old_child)?;
        if new_child == old_child {
            return Ok(old_child);
        }
        self.unlink(new_child);
        let index = self.index_of(parent, old_child)?;
        self.unlink(old_child);
        self.link_at(parent, index, new_child);
        Ok(old_child)
    }

    /// Detaches every child of `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`DomError::InvalidNode`] for unknown ids.
    pub fn remove_all_children(&mut self, parent: NodeId) -> Result<(), DomError> {
        for child in self.node(parent)?.children.clone() {
            self.unlink(child);
        }
        self.nodes[parent.0].invalidate();
        Ok(())
    }

    /// Moves every child of `from` to the end of `to`, keeping their order.
    ///
    /// # Errors
    ///
    /// Fails for unknown ids and when `to` lies inside `from`'s subtree.
    pub fn move_children(&mut self, from: NodeId, to: NodeId) -> Result<(), DomError> {
        let _ = self.node(from)?;
        let _ = self.node(to)?;
        if to == from || self.is_descendant_of(to, from) {
            return Err(DomError::HierarchyCycle {
                parent: to,
                child: from,
            });
        }
        for child in self.nodes[from.0].children.clone() {
            self.unlink(child);
            let end = self.nodes[to.0].children.len();
            self.link_at(to, end, child);
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Copies
    // ---------------------------------------------------------------------

    /// Copy `id` (and with `deep`, its whole subtree) into a detached node.
    ///
    /// Copies carry no source position and serialize from content.
    ///
    /// # Errors
    ///
    /// Returns [`DomError::InvalidNode`] for unknown ids.
    pub fn clone_node(&mut self, id: NodeId, deep: bool) -> Result<NodeId, DomError> {
        let snapshot = self.snapshot(id, deep)?;
        Ok(self.instantiate(snapshot))
    }

    /// Deep-copy `id` from another tree into this one, detached.
    ///
    /// # Errors
    ///
    /// Returns [`DomError::InvalidNode`] when `id` is not part of `other`.
    pub fn import(&mut self, other: &Self, id: NodeId) -> Result<NodeId, DomError> {
        let snapshot = other.snapshot(id, true)?;
        Ok(self.instantiate(snapshot))
    }

    /// Pre-order copy of payloads with parent indices into the snapshot.
    fn snapshot(&self, id: NodeId, deep: bool) -> Result<Vec<(NodeType, Option<usize>)>, DomError> {
        let root = self.node(id)?;
        let mut out = vec![(root.node_type.clone(), None)];
        if deep {
            let mut stack: Vec<(NodeId, usize)> = root
                .children
                .iter()
                .rev()
                .map(|&c| (c, 0))
                .collect();
            while let Some((node, parent_slot)) = stack.pop() {
                let slot = out.len();
                out.push((self.nodes[node.0].node_type.clone(), Some(parent_slot)));
                stack.extend(self.nodes[node.0].children.iter().rev().map(|&c| (c, slot)));
            }
        }
        Ok(out)
    }

    fn instantiate(&mut self, snapshot: Vec<(NodeType, Option<usize>)>) -> NodeId {
        let mut ids: Vec<NodeId> = Vec::with_capacity(snapshot.len());
        for (node_type, parent_slot) in snapshot {
            let id = self.alloc(node_type);
            self.nodes[id.0].closed = true;
            if let Some(parent) = parent_slot.map(|slot| ids[slot]) {
                let end = self.nodes[parent.0].children.len();
                self.link_at(parent, end, id);
            }
            ids.push(id);
        }
        ids[0]
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}
