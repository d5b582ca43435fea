//! Parser configuration.

use std::collections::HashMap;

use encoding_rs::{Encoding, UTF_8};
use lax_dom::{ElementTable, OutputMode, WriteOptions};

const DEFAULT_RESETTERS: &[(&str, &[&str])] = &[
    ("li", &["ul"]),
    ("tr", &["table"]),
    ("td", &["tr", "table"]),
    ("th", &["tr", "table"]),
];

/// For a repeatable tag, the container tags that start a fresh nesting level.
///
/// With nested-tag fixing on, a second `<li>` closes the previous open `li`,
/// unless a `ul` was opened after it: then the new `li` belongs to the inner
/// list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetterTable {
    entries: HashMap<String, Vec<String>>,
}

impl ResetterTable {
    /// A table with no resetters.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// `li` ← `ul`, `tr` ← `table`, `td`/`th` ← `tr`, `table`.
    #[must_use]
    pub fn html() -> Self {
        let mut table = Self::empty();
        for &(name, resetters) in DEFAULT_RESETTERS {
            table.insert(name, resetters);
        }
        table
    }

    /// Replace the resetters of `name`.
    pub fn insert(&mut self, name: &str, resetters: &[&str]) {
        let _ = self.entries.insert(
            name.to_ascii_lowercase(),
            resetters.iter().map(|r| r.to_ascii_lowercase()).collect(),
        );
    }

    /// Resetters of `name`; empty when it has none.
    #[must_use]
    pub fn resetters(&self, name: &str) -> &[String] {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether `name` has any resetters.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        !self.resetters(name).is_empty()
    }
}

impl Default for ResetterTable {
    fn default() -> Self {
        Self::html()
    }
}

/// Everything that changes how a document is parsed and written back.
///
/// Fields are public; the `with_*` methods allow chained construction.
///
/// ```
/// use lax_html::ParseOptions;
///
/// let options = ParseOptions::default()
///     .with_fix_nested_tags(true)
///     .with_stopper("footer");
/// assert!(options.check_syntax);
/// ```
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Record [`crate::ParseError`]s for unclosed elements.
    pub check_syntax: bool,
    /// Add `_closed` and `_children` attributes to elements as they close.
    pub add_debugging_attributes: bool,
    /// Close repeated list and table items at their implied boundary.
    pub fix_nested_tags: bool,
    /// Serialize as XML.
    pub output_as_xml: bool,
    /// Serialize names upper-case.
    pub output_upper_case: bool,
    /// Serialize names as written in the source.
    pub output_original_case: bool,
    /// Serialize empty void elements as `<x />`.
    pub write_empty_nodes: bool,
    /// Leave simple attribute values unquoted when serializing.
    pub optimize_attribute_values: bool,
    /// Maintain the id index used by `get_element_by_id`.
    pub use_id_attribute: bool,
    /// Look for `<meta>` charset declarations.
    pub read_encoding: bool,
    /// Stop before the first tag with this name.
    pub stopper_node_name: Option<String>,
    /// Encoding assumed for bytes without a byte order mark.
    pub default_stream_encoding: &'static Encoding,
    /// Capture a source snippet with every parse error.
    pub extract_error_source_text: bool,
    /// Longest snippet captured, in bytes.
    pub error_source_text_max_length: usize,
    /// Nesting boundaries used by nested-tag fixing.
    pub resetters: ResetterTable,
    /// Classification table; `None` uses the shared default.
    pub element_table: Option<ElementTable>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            check_syntax: true,
            add_debugging_attributes: false,
            fix_nested_tags: false,
            output_as_xml: false,
            output_upper_case: false,
            output_original_case: false,
            write_empty_nodes: false,
            optimize_attribute_values: false,
            use_id_attribute: true,
            read_encoding: true,
            stopper_node_name: None,
            default_stream_encoding: UTF_8,
            extract_error_source_text: false,
            error_source_text_max_length: 100,
            resetters: ResetterTable::html(),
            element_table: None,
        }
    }
}

impl ParseOptions {
    /// Toggle unclosed-element errors.
    #[must_use]
    pub fn with_check_syntax(mut self, on: bool) -> Self {
        self.check_syntax = on;
        self
    }

    /// Toggle `_closed` / `_children` debugging attributes.
    #[must_use]
    pub fn with_debugging_attributes(mut self, on: bool) -> Self {
        self.add_debugging_attributes = on;
        self
    }

    /// Toggle nested-tag fixing.
    #[must_use]
    pub fn with_fix_nested_tags(mut self, on: bool) -> Self {
        self.fix_nested_tags = on;
        self
    }

    /// Toggle XML output.
    #[must_use]
    pub fn with_xml_output(mut self, on: bool) -> Self {
        self.output_as_xml = on;
        self
    }

    /// Toggle upper-case output names.
    #[must_use]
    pub fn with_upper_case(mut self, on: bool) -> Self {
        self.output_upper_case = on;
        self
    }

    /// Toggle original-case output names.
    #[must_use]
    pub fn with_original_case(mut self, on: bool) -> Self {
        self.output_original_case = on;
        self
    }

    /// Toggle `<x />` output for empty voids.
    #[must_use]
    pub fn with_write_empty_nodes(mut self, on: bool) -> Self {
        self.write_empty_nodes = on;
        self
    }

    /// Toggle unquoted attribute output.
    #[must_use]
    pub fn with_optimized_attribute_values(mut self, on: bool) -> Self {
        self.optimize_attribute_values = on;
        self
    }

    /// Toggle the id index.
    #[must_use]
    pub fn with_id_attribute(mut self, on: bool) -> Self {
        self.use_id_attribute = on;
        self
    }

    /// Toggle `<meta>` charset detection.
    #[must_use]
    pub fn with_read_encoding(mut self, on: bool) -> Self {
        self.read_encoding = on;
        self
    }

    /// Stop before the first tag named `name`.
    #[must_use]
    pub fn with_stopper(mut self, name: &str) -> Self {
        self.stopper_node_name = Some(name.to_string());
        self
    }

    /// Encoding assumed for bytes without a byte order mark.
    #[must_use]
    pub fn with_default_stream_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.default_stream_encoding = encoding;
        self
    }

    /// Capture snippets of at most `max_length` bytes with parse errors.
    #[must_use]
    pub fn with_error_source_text(mut self, max_length: usize) -> Self {
        self.extract_error_source_text = true;
        self.error_source_text_max_length = max_length;
        self
    }

    /// Use a custom resetter table.
    #[must_use]
    pub fn with_resetters(mut self, resetters: ResetterTable) -> Self {
        self.resetters = resetters;
        self
    }

    /// Use a custom classification table.
    #[must_use]
    pub fn with_element_table(mut self, table: ElementTable) -> Self {
        self.element_table = Some(table);
        self
    }

    /// The classification table in effect.
    #[must_use]
    pub fn elements(&self) -> &ElementTable {
        match &self.element_table {
            Some(table) => table,
            None => ElementTable::html(),
        }
    }

    /// Whether `name` is the configured stopper.
    #[must_use]
    pub fn is_stopper(&self, name: &str) -> bool {
        self.stopper_node_name
            .as_deref()
            .is_some_and(|stopper| stopper.eq_ignore_ascii_case(name))
    }

    /// Serializer settings implied by these options.
    #[must_use]
    pub fn write_options(&self, encoding: &'static Encoding) -> WriteOptions {
        WriteOptions {
            mode: if self.output_as_xml {
                OutputMode::Xml
            } else {
                OutputMode::Html
            },
            upper_case: self.output_upper_case,
            original_case: self.output_original_case,
            write_empty_nodes: self.write_empty_nodes,
            optimize_attribute_values: self.optimize_attribute_values,
            encoding: encoding.name().to_ascii_lowercase(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lax_dom::ElementFlags;

    #[test]
    fn test_default_resetters() {
        let table = ResetterTable::default();
        assert_eq!(table.resetters("LI"), ["ul"]);
        assert_eq!(table.resetters("td"), ["tr", "table"]);
        assert!(!table.contains("p"));
    }

    #[test]
    fn test_write_options_follow_parse_options() {
        let options = ParseOptions::default()
            .with_xml_output(true)
            .with_upper_case(true);
        let write = options.write_options(encoding_rs::WINDOWS_1252);
        assert_eq!(write.mode, OutputMode::Xml);
        assert!(write.upper_case);
        assert_eq!(write.encoding, "windows-1252");
    }

    #[test]
    fn test_stopper_is_case_insensitive() {
        let options = ParseOptions::default().with_stopper("Footer");
        assert!(options.is_stopper("FOOTER"));
        assert!(!options.is_stopper("header"));
    }

    #[test]
    fn test_elements_falls_back_to_default_table() {
        let options = ParseOptions::default();
        assert!(options.elements().flags("br").is_void());

        let mut custom = ElementTable::empty();
        custom.insert("blink", ElementFlags::VOID).unwrap();
        let options = options.with_element_table(custom);
        assert!(options.elements().flags("blink").is_void());
        assert!(!options.elements().flags("br").is_void());
    }
}
