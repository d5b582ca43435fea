//! Tree walking iterators.

use crate::NodeId;
use crate::tree::DomTree;

/// Iterator over ancestors of a node.
pub struct AncestorIterator<'a> {
    tree: &'a DomTree,
    current: Option<NodeId>,
}

impl<'a> AncestorIterator<'a> {
    pub(crate) const fn new(tree: &'a DomTree, start: Option<NodeId>) -> Self {
        Self {
            tree,
            current: start,
        }
    }
}

impl Iterator for AncestorIterator<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        self.current = self.tree.parent(id);
        Some(id)
    }
}

/// Iterator over preceding siblings of a node.
pub struct PrecedingSiblingIterator<'a> {
    tree: &'a DomTree,
    current: Option<NodeId>,
}

impl<'a> PrecedingSiblingIterator<'a> {
    pub(crate) const fn new(tree: &'a DomTree, start: Option<NodeId>) -> Self {
        Self {
            tree,
            current: start,
        }
    }
}

impl Iterator for PrecedingSiblingIterator<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        self.current = self.tree.prev_sibling(id);
        Some(id)
    }
}

/// Iterator over following siblings of a node.
pub struct FollowingSiblingIterator<'a> {
    tree: &'a DomTree,
    current: Option<NodeId>,
}

impl<'a> FollowingSiblingIterator<'a> {
    pub(crate) const fn new(tree: &'a DomTree, start: Option<NodeId>) -> Self {
        Self {
            tree,
            current: start,
        }
    }
}

impl Iterator for FollowingSiblingIterator<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        self.current = self.tree.next_sibling(id);
        Some(id)
    }
}

/// Pre-order walk of everything below a node, the node itself excluded.
pub struct DescendantIterator<'a> {
    tree: &'a DomTree,
    root: NodeId,
    next: Option<NodeId>,
}

impl<'a> DescendantIterator<'a> {
    pub(crate) fn new(tree: &'a DomTree, root: NodeId) -> Self {
        Self {
            tree,
            root,
            next: tree.first_child(root),
        }
    }

    fn successor(&self, id: NodeId) -> Option<NodeId> {
        if let Some(child) = self.tree.first_child(id) {
            return Some(child);
        }
        let mut current = id;
        loop {
            if current == self.root {
                return None;
            }
            if let Some(sibling) = self.tree.next_sibling(current) {
                return Some(sibling);
            }
            current = self.tree.parent(current)?;
        }
    }
}

impl Iterator for DescendantIterator<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        self.next = self.successor(id);
        Some(id)
    }
}
