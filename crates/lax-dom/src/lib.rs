//! Document tree for the lax HTML parser.
//!
//! This crate provides an arena-based tree of `Document`, `Element`, `Text`
//! and `Comment` nodes, the element classification table that drives
//! parsing, an HTML/XML serializer, a read-only [`Navigator`] cursor and a
//! small XPath-style query engine.
//!
//! # Design
//!
//! The tree uses arena allocation with [`NodeId`] indices for all
//! relationships, providing O(1) access and traversal without borrow checker
//! issues. Nodes built by the parser remember where they came from in the
//! source text; until they are mutated, their markup is served straight from
//! that text.

pub mod attribute;
pub mod element_flags;
pub mod error;
pub mod iter;
pub mod navigator;
pub mod node;
pub mod path;
pub mod serialize;
pub mod tree;

pub use attribute::{Attribute, AttributeList, QuoteStyle};
pub use element_flags::{ElementFlags, ElementTable};
pub use error::DomError;
pub use navigator::{Navigator, NavigatorNodeKind};
pub use node::{ElementData, Node, NodeId, NodeKind, NodeType, SourcePosition, Span};
pub use path::{Axis, Path};
pub use serialize::{OutputMode, WriteOptions};
pub use tree::DomTree;
