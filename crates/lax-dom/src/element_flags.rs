//! Element classification table.
//!
//! Every parsing decision about a tag (does it have content, is the content
//! markup, may its end tag be omitted, may a stray end tag be tolerated) is a
//! lookup in this table. Lookups are case-insensitive; unknown tags carry no
//! flags.

use std::collections::HashMap;
use std::ops::{BitOr, BitOrAssign};
use std::sync::LazyLock;

use crate::error::DomError;

/// A set of classification facets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ElementFlags(u8);

impl ElementFlags {
    /// No special handling.
    pub const NONE: Self = Self(0);
    /// Never has content or an end tag (`img`, `br`, `meta`).
    pub const VOID: Self = Self(1);
    /// Content is copied verbatim up to the matching end tag (`script`, `style`).
    pub const RAW_TEXT: Self = Self(1 << 1);
    /// End tag optional; a new same-name start tag ends the previous one (`p`, `br`).
    pub const CLOSED: Self = Self(1 << 2);
    /// A stray end tag becomes inert text instead of an error (`form`).
    pub const CAN_OVERLAP: Self = Self(1 << 3);

    /// Whether every facet of `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether no facet is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether the void facet is set.
    #[must_use]
    pub const fn is_void(self) -> bool {
        self.contains(Self::VOID)
    }

    /// Whether the raw-text facet is set.
    #[must_use]
    pub const fn is_raw_text(self) -> bool {
        self.contains(Self::RAW_TEXT)
    }

    /// Whether the self-closing-equivalent facet is set.
    #[must_use]
    pub const fn is_closed(self) -> bool {
        self.contains(Self::CLOSED)
    }

    /// Whether the overlap facet is set.
    #[must_use]
    pub const fn can_overlap(self) -> bool {
        self.contains(Self::CAN_OVERLAP)
    }
}

impl BitOr for ElementFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ElementFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

const DEFAULT_ENTRIES: &[(&str, ElementFlags)] = &[
    ("script", ElementFlags::RAW_TEXT),
    ("style", ElementFlags::RAW_TEXT),
    ("noxhtml", ElementFlags::RAW_TEXT),
    ("textarea", ElementFlags::RAW_TEXT),
    ("title", ElementFlags::RAW_TEXT),
    ("base", ElementFlags::VOID),
    ("link", ElementFlags::VOID),
    ("meta", ElementFlags::VOID),
    ("isindex", ElementFlags::VOID),
    ("hr", ElementFlags::VOID),
    ("col", ElementFlags::VOID),
    ("img", ElementFlags::VOID),
    ("param", ElementFlags::VOID),
    ("embed", ElementFlags::VOID),
    ("frame", ElementFlags::VOID),
    ("wbr", ElementFlags::VOID),
    ("bgsound", ElementFlags::VOID),
    ("spacer", ElementFlags::VOID),
    ("keygen", ElementFlags::VOID),
    ("area", ElementFlags::VOID),
    ("input", ElementFlags::VOID),
    ("basefont", ElementFlags::VOID),
    ("source", ElementFlags::VOID),
    ("track", ElementFlags::VOID),
    ("br", ElementFlags(ElementFlags::VOID.0 | ElementFlags::CLOSED.0)),
    ("p", ElementFlags::CLOSED),
    ("option", ElementFlags::CLOSED),
    ("form", ElementFlags::CAN_OVERLAP),
];

/// The process-wide default table, built on first use and read-only afterwards.
static HTML_ELEMENTS: LazyLock<ElementTable> = LazyLock::new(|| {
    let mut table = ElementTable::empty();
    for &(name, flags) in DEFAULT_ENTRIES {
        debug_assert!(!(flags.is_void() && flags.is_raw_text()));
        let _ = table.entries.insert(name.to_string(), flags);
    }
    table
});

/// Mapping from lowercase tag name to [`ElementFlags`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementTable {
    entries: HashMap<String, ElementFlags>,
}

impl ElementTable {
    /// A table with no entries.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The shared default HTML table.
    #[must_use]
    pub fn html() -> &'static Self {
        &HTML_ELEMENTS
    }

    /// Flags for `name` (case-insensitive); unknown names carry none.
    ///
    /// Processing-instruction names such as `?xml` are always void.
    #[must_use]
    pub fn flags(&self, name: &str) -> ElementFlags {
        if let Some(flags) = self.entries.get(name) {
            return *flags;
        }
        if name.starts_with('?') {
            return ElementFlags::VOID;
        }
        if name.bytes().any(|b| b.is_ascii_uppercase()) {
            return self
                .entries
                .get(&name.to_ascii_lowercase())
                .copied()
                .unwrap_or_default();
        }
        ElementFlags::NONE
    }

    /// Set the flags of `name`, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns [`DomError::ConflictingElementFlags`] when `flags` combines the
    /// void and raw-text facets.
    pub fn insert(&mut self, name: &str, flags: ElementFlags) -> Result<(), DomError> {
        let name = name.to_ascii_lowercase();
        if flags.is_void() && flags.is_raw_text() {
            return Err(DomError::ConflictingElementFlags(name));
        }
        let _ = self.entries.insert(name, flags);
        Ok(())
    }

    /// Drop the entry for `name`.
    pub fn remove(&mut self, name: &str) -> Option<ElementFlags> {
        self.entries.remove(&name.to_ascii_lowercase())
    }

    /// Whether `name` is void.
    #[must_use]
    pub fn is_void(&self, name: &str) -> bool {
        self.flags(name).is_void()
    }

    /// Whether `name` holds raw text.
    #[must_use]
    pub fn is_raw_text(&self, name: &str) -> bool {
        self.flags(name).is_raw_text()
    }

    /// Whether `name` is self-closing-equivalent.
    #[must_use]
    pub fn is_closed(&self, name: &str) -> bool {
        self.flags(name).is_closed()
    }

    /// Whether a stray `</name>` is tolerated as text.
    #[must_use]
    pub fn can_overlap(&self, name: &str) -> bool {
        self.flags(name).can_overlap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_lookups() {
        let table = ElementTable::html();
        assert!(table.is_void("img"));
        assert!(table.is_void("IMG"));
        assert!(table.is_raw_text("script"));
        assert!(table.is_closed("p"));
        assert!(table.can_overlap("form"));
        let br = table.flags("br");
        assert!(br.is_void() && br.is_closed());
        assert!(table.flags("custom-widget").is_empty());
        assert!(table.is_void("?xml"));
    }

    #[test]
    fn test_default_table_keeps_void_and_raw_text_apart() {
        for &(name, _) in DEFAULT_ENTRIES {
            let flags = ElementTable::html().flags(name);
            assert!(!(flags.is_void() && flags.is_raw_text()), "{name}");
        }
    }

    #[test]
    fn test_insert_rejects_void_raw_text() {
        let mut table = ElementTable::empty();
        let result = table.insert("weird", ElementFlags::VOID | ElementFlags::RAW_TEXT);
        assert_eq!(
            result,
            Err(DomError::ConflictingElementFlags("weird".to_string()))
        );
        assert!(table.insert("Widget", ElementFlags::CLOSED).is_ok());
        assert!(table.is_closed("widget"));
    }
}
