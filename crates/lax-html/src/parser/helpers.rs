//! Input, node-creation and error helpers shared by the state handlers.
//!
//! This module contains:
//! - Input lookahead
//! - Flushing pending text and attributes into the tree
//! - Error recording with optional source snippets
//! - End-of-input finalization

use lax_dom::{Attribute, NodeId, NodeType, QuoteStyle, Span};

use super::{Cursor, Flow, HtmlParser, ParseState, PendingAttribute};
use crate::error::{HtmlError, ParseError, ParseErrorCode};

// =============================================================================
// Input Helpers
// =============================================================================

impl HtmlParser<'_> {
    /// The character under the cursor, `None` at end of input.
    pub(super) fn current(&self) -> Option<char> {
        self.text.get(self.cursor.pos..)?.chars().next()
    }

    /// The character `n` characters after the cursor.
    pub(super) fn peek_at(&self, n: usize) -> Option<char> {
        self.text.get(self.cursor.pos..)?.chars().nth(n)
    }

    /// Whether the cursor sits on `<%`.
    pub(super) fn at_server_code(&self) -> bool {
        self.peek_at(1) == Some('%')
    }

    pub(super) const fn is_whitespace(c: char) -> bool {
        matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0C')
    }

    /// Remember where character data starts, unless already inside some.
    pub(super) const fn mark_text_start(&mut self) {
        if self.text_start.is_none() {
            self.text_start = Some(self.cursor);
        }
    }

    /// The element new nodes are appended to.
    pub(super) fn current_parent(&self) -> NodeId {
        self.open.last().map_or(NodeId::ROOT, |e| e.id)
    }
}

// =============================================================================
// Node Helpers
// =============================================================================

impl HtmlParser<'_> {
    /// Append a parsed node to the current parent with its source metadata.
    pub(super) fn append_parsed(
        &mut self,
        node_type: NodeType,
        start: Cursor,
        end: usize,
    ) -> Result<NodeId, HtmlError> {
        let id = self.tree.alloc(node_type);
        self.tree.set_position(id, start.position());
        let span = Span::between(start.pos, end);
        self.tree.set_spans(id, Some(span), Some(span));
        let parent = self.current_parent();
        self.tree.append_child(parent, id)?;
        Ok(id)
    }

    /// Turn pending character data ending at `end` into a text node.
    ///
    /// Empty runs produce nothing.
    pub(super) fn flush_text(&mut self, end: usize) -> Result<(), HtmlError> {
        let Some(start) = self.text_start.take() else {
            return Ok(());
        };
        if end <= start.pos {
            return Ok(());
        }
        let data = self.text[start.pos..end].to_string();
        let _ = self.append_parsed(NodeType::Text(data), start, end)?;
        Ok(())
    }

    /// Create a comment node for `<!...>` markup ending at `end`.
    pub(super) fn emit_comment(&mut self, end: usize) -> Result<(), HtmlError> {
        let start = self.comment_start;
        let raw = self.text[start.pos..end].to_string();
        let _ = self.append_parsed(NodeType::Comment(raw), start, end)?;
        Ok(())
    }

    /// Start reading an attribute at the cursor.
    pub(super) fn begin_attribute(&mut self) {
        self.attribute = Some(PendingAttribute {
            start: self.cursor,
            name_end: None,
            value_start: None,
            quote: QuoteStyle::Double,
        });
    }

    /// Close the attribute name at the cursor, if it is still open.
    pub(super) fn end_attribute_name(&mut self) {
        if let Some(attribute) = &mut self.attribute
            && attribute.name_end.is_none()
        {
            attribute.name_end = Some(self.cursor.pos);
        }
    }

    /// Move the pending attribute onto the pending tag. The value, if any,
    /// ends at `value_end`.
    pub(super) fn push_attribute(&mut self, value_end: usize) {
        let Some(pending) = self.attribute.take() else {
            return;
        };
        let name_end = pending.name_end.unwrap_or(value_end);
        let name = &self.text[pending.start.pos..name_end];
        if name.is_empty() {
            return;
        }
        let value = pending
            .value_start
            .map_or("", |start| &self.text[start..value_end.max(start)]);
        let attribute = Attribute::new(name, value)
            .with_quote(pending.quote)
            .with_position(pending.start.position());
        if let Some(tag) = &mut self.tag {
            tag.attributes.push(attribute);
        }
    }

    /// Fix the pending tag's name at the cursor, if not already known.
    pub(super) fn end_tag_name(&mut self) {
        let end = self.cursor.pos;
        if let Some(tag) = &mut self.tag
            && tag.name.is_none()
        {
            tag.name = Some(self.text[tag.name_start..end].to_string());
        }
    }

    /// Finalize the pending tag at `end` and turn the outcome into a
    /// reconsume of the current `<`.
    pub(super) fn finalize_before_lt(&mut self) -> Result<Flow, HtmlError> {
        let flow = self.finalize_tag(self.cursor.pos, false)?;
        Ok(match flow {
            Flow::Continue(next) | Flow::Reconsume(next) => Flow::Reconsume(next),
            Flow::Halt => Flow::Halt,
        })
    }
}

// =============================================================================
// Error Helpers
// =============================================================================

impl HtmlParser<'_> {
    /// Record a recovery positioned at `at`.
    pub(super) fn record_error(&mut self, code: ParseErrorCode, at: Cursor, reason: String) {
        let source_text = self.snippet(at.pos);
        self.errors.push(ParseError {
            code,
            line: at.line,
            column: at.column,
            offset: at.pos,
            source_text,
            reason,
        });
    }

    /// Source text starting at `start`, cut to the configured length on a
    /// character boundary. Empty unless extraction is enabled.
    fn snippet(&self, start: usize) -> String {
        if !self.options.extract_error_source_text {
            return String::new();
        }
        let start = start.min(self.text.len());
        let mut end = start
            .saturating_add(self.options.error_source_text_max_length)
            .min(self.text.len());
        while !self.text.is_char_boundary(end) {
            end -= 1;
        }
        self.text[start..end].to_string()
    }

    /// Add `_closed` and `_children` to an element that just closed.
    pub(super) fn add_debugging_attributes(&mut self, id: NodeId) -> Result<(), HtmlError> {
        if !self.options.add_debugging_attributes {
            return Ok(());
        }
        let name = self.tree.name(id).unwrap_or_default().to_string();
        let children = self.tree.children(id).len().to_string();
        self.tree.push_attribute(id, Attribute::new("_closed", &name))?;
        self.tree
            .push_attribute(id, Attribute::new("_children", &children))?;
        Ok(())
    }
}

// =============================================================================
// End of Input
// =============================================================================

impl HtmlParser<'_> {
    /// Flush whatever markup is still pending at `end`, close every open
    /// element and hand the source to the tree.
    pub(super) fn finish(&mut self, end: usize) -> Result<(), HtmlError> {
        match self.state {
            ParseState::Text | ParseState::RawText => self.flush_text(end)?,
            ParseState::Comment => self.emit_comment(end)?,
            ParseState::ServerSideCode => match self.resume_state {
                ParseState::Text => self.flush_text(end)?,
                ParseState::BetweenAttributes => {
                    self.push_server_code_attribute(end);
                    self.finish_pending_tag(end)?;
                }
                _ => {
                    self.push_attribute(end);
                    self.finish_pending_tag(end)?;
                }
            },
            ParseState::WhichTag
            | ParseState::Tag
            | ParseState::BetweenAttributes
            | ParseState::EmptyTag
            | ParseState::AttributeName
            | ParseState::AttributeBeforeEquals
            | ParseState::AttributeAfterEquals
            | ParseState::AttributeValue
            | ParseState::QuotedAttributeValue => {
                self.end_attribute_name();
                self.push_attribute(end);
                self.finish_pending_tag(end)?;
            }
        }

        // Whatever a halted or finished pass left open closes at `end`.
        let unclosed = std::mem::take(&mut self.open);
        for element in &unclosed {
            if self.options.check_syntax {
                self.record_error(
                    ParseErrorCode::TagNotClosed,
                    element.start,
                    format!("End tag </{}> was not found", element.name),
                );
            }
        }
        for element in unclosed.iter().rev() {
            self.tree.set_spans(
                element.id,
                Some(Span::between(element.start.pos, end)),
                Some(Span::between(element.inner_start, end)),
            );
            self.tree.set_closed(element.id, true);
            self.add_debugging_attributes(element.id)?;
        }

        let whole = Span::between(0, end);
        self.tree.set_spans(NodeId::ROOT, Some(whole), Some(whole));
        self.tree.set_source(self.text.to_string());
        self.tree.accept_changes();
        Ok(())
    }

    fn finish_pending_tag(&mut self, end: usize) -> Result<(), HtmlError> {
        if self.tag.is_none() {
            return Ok(());
        }
        self.end_tag_name();
        let _ = self.finalize_tag(end, false)?;
        Ok(())
    }
}
