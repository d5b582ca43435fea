//! Hard failures of the tree API.
//!
//! These represent programmer misuse (bad handles, impossible insertions,
//! features used without their prerequisite) rather than malformed markup,
//! which never fails and is reported through parse errors instead.

use thiserror::Error;

use crate::NodeId;

/// Errors returned by tree mutation, lookup and query operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    /// The id does not address a node of this tree.
    #[error("node {0:?} does not exist in this tree")]
    InvalidNode(NodeId),

    /// An insertion or removal referenced a node that is not a child of the
    /// node being modified.
    #[error("reference node {reference:?} must be a child of {parent:?}")]
    ReferenceNotChild {
        /// The node whose child list was being modified.
        parent: NodeId,
        /// The node that was expected among its children.
        reference: NodeId,
    },

    /// The insertion would make a node its own ancestor.
    #[error("cannot insert {child:?} under {parent:?}: it is the node itself or one of its ancestors")]
    HierarchyCycle {
        /// The intended parent.
        parent: NodeId,
        /// The node being inserted.
        child: NodeId,
    },

    /// The operation only applies to element nodes.
    #[error("node {0:?} is not an element")]
    NotAnElement(NodeId),

    /// The operation only applies to text or comment nodes.
    #[error("node {0:?} has no character data")]
    NotCharacterData(NodeId),

    /// Id lookup was requested on a tree built without id indexing.
    #[error("id lookup requires the use-id-attribute option")]
    IdIndexDisabled,

    /// Attribute names must contain at least one character.
    #[error("attribute name must not be empty")]
    EmptyAttributeName,

    /// A classification table entry combined the void and raw-text facets.
    #[error("element <{0}> cannot be both void and raw-text")]
    ConflictingElementFlags(String),

    /// A path expression could not be parsed.
    #[error("invalid path expression at offset {offset}: {reason}")]
    InvalidPath {
        /// Byte offset of the offending token inside the expression.
        offset: usize,
        /// What was wrong.
        reason: String,
    },
}
