//! HTML and XML serializer.
//!
//! Rebuilds markup from the tree content. HTML output keeps text and
//! attribute values as stored, except that the quote character delimiting a
//! value is written as a character reference. XML output escapes them, sanitizes
//! names through [`xml_name`] and wraps raw-text content in commented CDATA
//! sections so that the result stays well formed.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt::Write as _;

use strum_macros::{Display, EnumString};

use crate::NodeId;
use crate::attribute::Attribute;
use crate::node::{ElementData, NodeType};
use crate::tree::DomTree;

/// Markup dialect produced by the serializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum OutputMode {
    /// Tolerant HTML, byte-faithful for unchanged values.
    #[default]
    Html,
    /// Well-formed XML.
    Xml,
}

/// Serializer settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    /// Output dialect.
    pub mode: OutputMode,
    /// Write element and attribute names upper-case.
    pub upper_case: bool,
    /// Write element and attribute names as they appeared in the source.
    pub original_case: bool,
    /// Write empty void elements as `<x />` in HTML mode.
    pub write_empty_nodes: bool,
    /// Leave attribute values unquoted when that is unambiguous.
    pub optimize_attribute_values: bool,
    /// Encoding label written into the XML declaration.
    pub encoding: String,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            mode: OutputMode::Html,
            upper_case: false,
            original_case: false,
            write_empty_nodes: false,
            optimize_attribute_values: false,
            encoding: "utf-8".to_string(),
        }
    }
}

/// Serialize `id` including its own tags.
#[must_use]
pub fn write(tree: &DomTree, id: NodeId, options: &WriteOptions) -> String {
    let mut out = String::new();
    let writer = Writer { tree, options };
    writer.node(id, &mut out);
    out
}

/// Serialize the children of `id`.
#[must_use]
pub fn write_children(tree: &DomTree, id: NodeId, options: &WriteOptions) -> String {
    let mut out = String::new();
    let writer = Writer { tree, options };
    for &child in tree.children(id) {
        writer.node(child, &mut out);
    }
    out
}

struct Writer<'a> {
    tree: &'a DomTree,
    options: &'a WriteOptions,
}

impl Writer<'_> {
    const fn xml(&self) -> bool {
        matches!(self.options.mode, OutputMode::Xml)
    }

    fn node(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.tree.get(id) else {
            return;
        };
        match &node.node_type {
            NodeType::Document => self.document(id, out),
            NodeType::Text(text) => {
                if self.xml() {
                    out.push_str(&html_encode(text));
                } else {
                    out.push_str(text);
                }
            }
            NodeType::Comment(raw) => {
                if self.xml() {
                    out.push_str("<!--");
                    out.push_str(&xml_comment_body(raw));
                    out.push_str(" -->");
                } else {
                    out.push_str(raw);
                }
            }
            NodeType::Element(data) => self.element(id, data, out),
        }
    }

    fn document(&self, id: NodeId, out: &mut String) {
        let children = self.tree.children(id);
        if !self.xml() {
            for &child in children {
                self.node(child, out);
            }
            return;
        }

        let _ = write!(
            out,
            "<?xml version=\"1.0\" encoding=\"{}\"?>",
            self.options.encoding
        );
        let top_level = children
            .iter()
            .filter(|&&c| !self.is_declaration(c))
            .count();
        if top_level > 1 {
            let span = self.cased("span", "span");
            let _ = write!(out, "<{span}>");
            for &child in children {
                self.node(child, out);
            }
            let _ = write!(out, "</{span}>");
        } else {
            for &child in children {
                self.node(child, out);
            }
        }
    }

    fn is_declaration(&self, id: NodeId) -> bool {
        self.tree
            .as_element(id)
            .is_some_and(|e| e.tag_name.starts_with('?'))
    }

    fn cased(&self, lower: &str, original: &str) -> String {
        if self.options.upper_case {
            lower.to_uppercase()
        } else if self.options.original_case {
            original.to_string()
        } else {
            lower.to_string()
        }
    }

    fn element(&self, id: NodeId, data: &ElementData, out: &mut String) {
        let xml = self.xml();
        if xml && data.tag_name.starts_with('?') {
            return;
        }
        let mut name = self.cased(&data.tag_name, &data.original_name);
        if xml {
            name = xml_name(&name);
        }

        out.push('<');
        out.push_str(&name);
        self.attributes(data, out);

        let children = self.tree.children(id);
        let flags = self.tree.element_table().flags(&data.tag_name);
        if children.is_empty() {
            if flags.is_void() {
                if xml || self.options.write_empty_nodes {
                    out.push_str(" />");
                } else {
                    if data.tag_name.starts_with('?') {
                        out.push('?');
                    }
                    out.push('>');
                }
            } else {
                let _ = write!(out, "></{name}>");
            }
            return;
        }

        out.push('>');
        if xml && flags.is_raw_text() {
            out.push_str("\r\n//<![CDATA[\r\n");
            for &child in children {
                if let Some(text) = self.tree.as_text(child) {
                    out.push_str(text);
                }
            }
            out.push_str("\r\n//]]>//\r\n");
        } else {
            for &child in children {
                self.node(child, out);
            }
        }
        let _ = write!(out, "</{name}>");
    }

    fn attributes(&self, data: &ElementData, out: &mut String) {
        if self.xml() {
            let mut seen = HashSet::new();
            for attribute in &data.attrs {
                if !seen.insert(attribute.name.as_str()) {
                    continue;
                }
                let name = xml_name(&self.cased(&attribute.name, &attribute.original_name));
                let quote = attribute.quote.as_char();
                let value = html_encode(&attribute.value);
                let _ = write!(out, " {name}={quote}{}{quote}", escape_quote(&value, quote));
            }
            return;
        }
        for attribute in &data.attrs {
            self.html_attribute(attribute, out);
        }
    }

    fn html_attribute(&self, attribute: &Attribute, out: &mut String) {
        if attribute.is_server_code() {
            out.push(' ');
            out.push_str(&attribute.original_name);
            return;
        }
        let name = self.cased(&attribute.name, &attribute.original_name);
        let value = &attribute.value;
        let bare = self.options.optimize_attribute_values
            && !value.is_empty()
            && !value
                .chars()
                .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '=' | '<' | '>' | '`'));
        if bare {
            let _ = write!(out, " {name}={value}");
        } else {
            let quote = attribute.quote.as_char();
            let _ = write!(out, " {name}={quote}{}{quote}", escape_quote(value, quote));
        }
    }
}

/// Replace `quote` inside an attribute value with its character reference.
fn escape_quote(value: &str, quote: char) -> Cow<'_, str> {
    if !value.contains(quote) {
        return Cow::Borrowed(value);
    }
    let entity = if quote == '"' { "&quot;" } else { "&#39;" };
    Cow::Owned(value.replace(quote, entity))
}

/// Inner text of a comment, made safe for an XML comment.
fn xml_comment_body(raw: &str) -> String {
    let inner = if let Some(rest) = raw.strip_prefix("<!--") {
        rest.strip_suffix("-->").unwrap_or(rest)
    } else {
        let rest = raw.strip_prefix("<!").unwrap_or(raw);
        rest.strip_suffix('>').unwrap_or(rest)
    };
    inner.replace("--", " - -")
}

/// Turn any string into a valid XML name.
///
/// ASCII letters, digits, `_`, `.` and `-` are kept. Every other character is
/// written as the hex of its UTF-8 bytes followed by `_`. The result gets a
/// leading `_` when anything was escaped or the first character cannot start
/// a name.
#[must_use]
pub fn xml_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut escaped = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
            out.push(c);
        } else {
            escaped = true;
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                let _ = write!(out, "{byte:02x}");
            }
            out.push('_');
        }
    }
    let starts_ok = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if escaped || !starts_ok {
        out.insert(0, '_');
    }
    out
}

/// Escape `<`, `>`, `"` and bare `&` for use in markup.
///
/// Ampersands that already start one of the predefined XML entities are left
/// alone so that escaping is idempotent.
#[must_use]
pub fn html_encode(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, c) in text.char_indices() {
        match c {
            '&' => {
                let rest = &text[i + 1..];
                if ["amp;", "lt;", "gt;", "quot;", "apos;"]
                    .iter()
                    .any(|entity| rest.starts_with(entity))
                {
                    out.push('&');
                } else {
                    out.push_str("&amp;");
                }
            }
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
