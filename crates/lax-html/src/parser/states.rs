//! Per-state handlers.
//!
//! Each handler receives the character under the cursor and returns the
//! [`Flow`] the main loop should follow. Handlers never advance the cursor
//! themselves.

use lax_dom::{Attribute, QuoteStyle};

use super::{Flow, HtmlParser, ParseState, PendingTag};
use crate::error::HtmlError;

impl HtmlParser<'_> {
    /// Character data. Only `<` is interesting.
    pub(super) fn handle_text_state(&mut self, c: char) -> Result<Flow, HtmlError> {
        if c != '<' {
            self.mark_text_start();
            return Ok(Flow::Continue(ParseState::Text));
        }
        match self.peek_at(1) {
            // Server code inside text stays part of the text.
            Some('%') => {
                self.mark_text_start();
                self.code_start = self.cursor.pos;
                self.resume_state = ParseState::Text;
                Ok(Flow::Continue(ParseState::ServerSideCode))
            }
            Some('!') => {
                self.flush_text(self.cursor.pos)?;
                self.comment_start = self.cursor;
                self.full_comment = self.text[self.cursor.pos..].starts_with("<!--");
                Ok(Flow::Continue(ParseState::Comment))
            }
            Some(next) if next.is_alphabetic() || next == '/' || next == '?' => {
                self.flush_text(self.cursor.pos)?;
                self.begin_tag();
                Ok(Flow::Continue(ParseState::WhichTag))
            }
            _ => {
                self.mark_text_start();
                Ok(Flow::Continue(ParseState::Text))
            }
        }
    }

    fn begin_tag(&mut self) {
        self.tag = Some(PendingTag {
            start: self.cursor,
            name_start: self.cursor.pos + 1,
            name: None,
            is_end: false,
            attributes: Vec::new(),
        });
    }

    /// Just after `<`.
    pub(super) fn handle_which_tag_state(&mut self, c: char) -> Flow {
        if c == '/' {
            let name_start = self.cursor.pos + 1;
            if let Some(tag) = &mut self.tag {
                tag.is_end = true;
                tag.name_start = name_start;
            }
            Flow::Continue(ParseState::Tag)
        } else {
            Flow::Reconsume(ParseState::Tag)
        }
    }

    /// Reading the tag name.
    pub(super) fn handle_tag_state(&mut self, c: char) -> Result<Flow, HtmlError> {
        match c {
            c if Self::is_whitespace(c) => {
                self.end_tag_name();
                Ok(Flow::Continue(ParseState::BetweenAttributes))
            }
            '/' => {
                self.end_tag_name();
                Ok(Flow::Continue(ParseState::EmptyTag))
            }
            '>' => {
                self.end_tag_name();
                self.finalize_tag(self.cursor.pos + 1, false)
            }
            '<' if !self.at_server_code() => {
                self.end_tag_name();
                self.finalize_before_lt()
            }
            _ => Ok(Flow::Continue(ParseState::Tag)),
        }
    }

    /// Inside a tag, waiting for an attribute or the end of the tag.
    pub(super) fn handle_between_attributes_state(&mut self, c: char) -> Result<Flow, HtmlError> {
        match c {
            c if Self::is_whitespace(c) => Ok(Flow::Continue(ParseState::BetweenAttributes)),
            '/' | '?' => Ok(Flow::Continue(ParseState::EmptyTag)),
            '>' => self.finalize_tag(self.cursor.pos + 1, false),
            '<' if self.at_server_code() => {
                self.code_start = self.cursor.pos;
                self.resume_state = ParseState::BetweenAttributes;
                Ok(Flow::Continue(ParseState::ServerSideCode))
            }
            '<' => self.finalize_before_lt(),
            _ => {
                self.begin_attribute();
                Ok(Flow::Continue(ParseState::AttributeName))
            }
        }
    }

    /// After `/` or `?`. Anything but `>` carries on as if between
    /// attributes.
    pub(super) fn handle_empty_tag_state(&mut self, c: char) -> Result<Flow, HtmlError> {
        if c == '>' {
            self.finalize_tag(self.cursor.pos + 1, true)
        } else {
            self.handle_between_attributes_state(c)
        }
    }

    /// Reading an attribute name.
    pub(super) fn handle_attribute_name_state(&mut self, c: char) -> Result<Flow, HtmlError> {
        match c {
            c if Self::is_whitespace(c) => {
                self.end_attribute_name();
                Ok(Flow::Continue(ParseState::AttributeBeforeEquals))
            }
            '=' => {
                self.end_attribute_name();
                Ok(Flow::Continue(ParseState::AttributeAfterEquals))
            }
            '>' => {
                self.end_attribute_name();
                self.push_attribute(self.cursor.pos);
                self.finalize_tag(self.cursor.pos + 1, false)
            }
            '/' if self.peek_at(1) == Some('>') => {
                self.end_attribute_name();
                self.push_attribute(self.cursor.pos);
                Ok(Flow::Continue(ParseState::EmptyTag))
            }
            '<' if !self.at_server_code() => {
                self.end_attribute_name();
                self.push_attribute(self.cursor.pos);
                self.finalize_before_lt()
            }
            _ => Ok(Flow::Continue(ParseState::AttributeName)),
        }
    }

    /// After an attribute name and some whitespace.
    pub(super) fn handle_attribute_before_equals_state(
        &mut self,
        c: char,
    ) -> Result<Flow, HtmlError> {
        match c {
            c if Self::is_whitespace(c) => Ok(Flow::Continue(ParseState::AttributeBeforeEquals)),
            '=' => Ok(Flow::Continue(ParseState::AttributeAfterEquals)),
            '>' => {
                self.push_attribute(self.cursor.pos);
                self.finalize_tag(self.cursor.pos + 1, false)
            }
            // The previous attribute had no value; this one starts fresh.
            _ => {
                self.push_attribute(self.cursor.pos);
                self.handle_between_attributes_state(c)
            }
        }
    }

    /// After `=`.
    pub(super) fn handle_attribute_after_equals_state(
        &mut self,
        c: char,
    ) -> Result<Flow, HtmlError> {
        match c {
            c if Self::is_whitespace(c) => Ok(Flow::Continue(ParseState::AttributeAfterEquals)),
            '\'' | '"' => {
                self.quote = c;
                let value_start = self.cursor.pos + 1;
                if let Some(attribute) = &mut self.attribute {
                    attribute.quote = if c == '\'' {
                        QuoteStyle::Single
                    } else {
                        QuoteStyle::Double
                    };
                    attribute.value_start = Some(value_start);
                }
                Ok(Flow::Continue(ParseState::QuotedAttributeValue))
            }
            '>' => {
                self.push_attribute(self.cursor.pos);
                self.finalize_tag(self.cursor.pos + 1, false)
            }
            '<' if self.at_server_code() => {
                self.start_value();
                self.code_start = self.cursor.pos;
                self.resume_state = ParseState::AttributeValue;
                Ok(Flow::Continue(ParseState::ServerSideCode))
            }
            '<' => {
                self.push_attribute(self.cursor.pos);
                self.finalize_before_lt()
            }
            _ => {
                self.start_value();
                Ok(Flow::Continue(ParseState::AttributeValue))
            }
        }
    }

    fn start_value(&mut self) {
        let value_start = self.cursor.pos;
        if let Some(attribute) = &mut self.attribute {
            attribute.value_start = Some(value_start);
        }
    }

    /// Reading an unquoted value.
    pub(super) fn handle_attribute_value_state(&mut self, c: char) -> Result<Flow, HtmlError> {
        match c {
            c if Self::is_whitespace(c) => {
                self.push_attribute(self.cursor.pos);
                Ok(Flow::Continue(ParseState::BetweenAttributes))
            }
            '>' => {
                self.push_attribute(self.cursor.pos);
                self.finalize_tag(self.cursor.pos + 1, false)
            }
            '<' if self.at_server_code() => {
                self.code_start = self.cursor.pos;
                self.resume_state = ParseState::AttributeValue;
                Ok(Flow::Continue(ParseState::ServerSideCode))
            }
            '<' => {
                self.push_attribute(self.cursor.pos);
                self.finalize_before_lt()
            }
            _ => Ok(Flow::Continue(ParseState::AttributeValue)),
        }
    }

    /// Reading a value up to its closing quote.
    pub(super) fn handle_quoted_attribute_value_state(
        &mut self,
        c: char,
    ) -> Result<Flow, HtmlError> {
        if c == self.quote {
            self.push_attribute(self.cursor.pos);
            return Ok(Flow::Continue(ParseState::BetweenAttributes));
        }
        if c == '<' && self.at_server_code() {
            self.code_start = self.cursor.pos;
            self.resume_state = ParseState::QuotedAttributeValue;
            return Ok(Flow::Continue(ParseState::ServerSideCode));
        }
        Ok(Flow::Continue(ParseState::QuotedAttributeValue))
    }

    /// Inside `<!...>`. Full `<!--` comments only end at `-->`.
    pub(super) fn handle_comment_state(&mut self, c: char) -> Result<Flow, HtmlError> {
        if c != '>' {
            return Ok(Flow::Continue(ParseState::Comment));
        }
        let pos = self.cursor.pos;
        if self.full_comment
            && (pos < self.comment_start.pos + 6 || !self.text[..pos].ends_with("--"))
        {
            return Ok(Flow::Continue(ParseState::Comment));
        }
        self.emit_comment(pos + 1)?;
        Ok(Flow::Continue(ParseState::Text))
    }

    /// Inside `<%...%>`.
    pub(super) fn handle_server_side_code_state(&mut self, c: char) -> Result<Flow, HtmlError> {
        let pos = self.cursor.pos;
        if c != '>' || pos < self.code_start + 3 || !self.text[..pos].ends_with('%') {
            return Ok(Flow::Continue(ParseState::ServerSideCode));
        }
        if self.resume_state == ParseState::BetweenAttributes {
            self.push_server_code_attribute(pos + 1);
        }
        Ok(Flow::Continue(self.resume_state))
    }

    /// Add a code block found between attributes as an attribute named by
    /// the block itself.
    pub(super) fn push_server_code_attribute(&mut self, end: usize) {
        let code = &self.text[self.code_start..end];
        let attribute = Attribute::new(code, "");
        if let Some(tag) = &mut self.tag {
            tag.attributes.push(attribute);
        }
    }

    /// Content of a raw-text element. Only the matching end tag ends it.
    pub(super) fn handle_raw_text_state(&mut self, c: char) -> Result<Flow, HtmlError> {
        if c == '<' && self.at_raw_text_end() {
            self.flush_text(self.cursor.pos)?;
            self.begin_tag();
            return Ok(Flow::Continue(ParseState::WhichTag));
        }
        self.mark_text_start();
        Ok(Flow::Continue(ParseState::RawText))
    }

    /// Whether `</name` of the innermost open element follows, with a
    /// non-name character after it.
    fn at_raw_text_end(&self) -> bool {
        let Some(open) = self.open.last() else {
            return false;
        };
        let rest = &self.text[self.cursor.pos..];
        let Some(after_slash) = rest.strip_prefix("</") else {
            return false;
        };
        let name_len = open.name.len();
        let Some(candidate) = after_slash.get(..name_len) else {
            return false;
        };
        if !candidate.eq_ignore_ascii_case(&open.name) {
            return false;
        }
        !after_slash[name_len..]
            .chars()
            .next()
            .is_some_and(|next| next.is_alphanumeric() || matches!(next, '-' | '_' | ':'))
    }
}
