//! Attributes and the per-element attribute collection.
//!
//! The collection is an ordered sequence rather than a map: legacy markup
//! often repeats attribute names, and the parser keeps every occurrence in
//! source order. Name lookups are ASCII case-insensitive and return the first
//! match.

use std::slice;

use crate::node::{NodeId, SourcePosition};

/// Quote character used when the attribute value is written back out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuoteStyle {
    /// `name='value'`
    Single,
    /// `name="value"`
    #[default]
    Double,
}

impl QuoteStyle {
    /// The quote character itself.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Single => '\'',
            Self::Double => '"',
        }
    }
}

/// A single attribute of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Lowercase name, used for lookups.
    pub name: String,
    /// The name exactly as written.
    pub original_name: String,
    /// The value; empty for attributes written without `=`.
    pub value: String,
    /// Preferred quote character for output.
    pub quote: QuoteStyle,
    /// Element that owns this attribute, once attached.
    pub owner: Option<NodeId>,
    /// Where the attribute name started in the parsed text.
    pub position: Option<SourcePosition>,
}

impl Attribute {
    /// Create a detached attribute with double-quote output.
    #[must_use]
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_lowercase(),
            original_name: name.to_string(),
            value: value.to_string(),
            quote: QuoteStyle::Double,
            owner: None,
            position: None,
        }
    }

    /// Builder-style quote selection.
    #[must_use]
    pub const fn with_quote(mut self, quote: QuoteStyle) -> Self {
        self.quote = quote;
        self
    }

    /// Builder-style source position.
    #[must_use]
    pub const fn with_position(mut self, position: SourcePosition) -> Self {
        self.position = Some(position);
        self
    }

    /// Whether this attribute carries `name` (case-insensitive).
    #[must_use]
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Whether the name is an embedded server-code block (`<% ... %>`).
    #[must_use]
    pub fn is_server_code(&self) -> bool {
        self.original_name.starts_with("<%") && self.original_name.ends_with("%>")
    }
}

/// Ordered attributes of one element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeList {
    items: Vec<Attribute>,
}

impl AttributeList {
    /// An empty collection.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Number of attributes, duplicates included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether there are no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Attributes in order.
    pub fn iter(&self) -> slice::Iter<'_, Attribute> {
        self.items.iter()
    }

    /// Attribute at `index`.
    #[must_use]
    pub fn get_index(&self, index: usize) -> Option<&Attribute> {
        self.items.get(index)
    }

    /// First attribute named `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.items.iter().find(|a| a.is_named(name))
    }

    /// First attribute named `name`, mutably.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Attribute> {
        self.items.iter_mut().find(|a| a.is_named(name))
    }

    /// Value of the first attribute named `name`.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&str> {
        self.get(name).map(|a| a.value.as_str())
    }

    /// Every attribute named `name`, in order.
    pub fn all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Attribute> + 'a {
        self.items.iter().filter(move |a| a.is_named(name))
    }

    /// Whether any attribute is named `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Position of the first attribute named `name`.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.items.iter().position(|a| a.is_named(name))
    }

    /// Append an attribute, keeping any existing ones with the same name.
    pub fn push(&mut self, attribute: Attribute) {
        self.items.push(attribute);
    }

    /// Insert an attribute at `index` (clamped to the end).
    pub fn insert(&mut self, index: usize, attribute: Attribute) {
        let index = index.min(self.items.len());
        self.items.insert(index, attribute);
    }

    /// Remove every attribute named `name`; returns how many were removed.
    pub fn remove(&mut self, name: &str) -> usize {
        let before = self.items.len();
        self.items.retain(|a| !a.is_named(name));
        before - self.items.len()
    }

    /// Remove and return the attribute at `index`.
    pub fn remove_at(&mut self, index: usize) -> Option<Attribute> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    /// Drop every attribute.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub(crate) fn set_owner(&mut self, owner: Option<NodeId>) {
        for attribute in &mut self.items {
            attribute.owner = owner;
        }
    }
}

impl<'a> IntoIterator for &'a AttributeList {
    type Item = &'a Attribute;
    type IntoIter = slice::Iter<'a, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
