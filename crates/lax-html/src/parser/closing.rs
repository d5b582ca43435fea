//! Tag completion and closing resolution.
//!
//! A finished start tag may first close elements it implies the end of
//! (`<p>` after `<p>`, `<li>` after `<li>` with nested-tag fixing). A
//! finished end tag is matched against the stack of open elements; when
//! nothing matches, the element's classification decides whether the tag is
//! dropped, reported, or turned into a node of its own.

use lax_common::warning::warn_once;
use lax_dom::{ElementData, ElementFlags, NodeId, NodeType, Span};

use super::{Cursor, Flow, HtmlParser, OpenElement, ParseState, PendingTag};
use crate::document::Remainder;
use crate::encoding::{encoding_for_label, normalize_label};
use crate::error::{HtmlError, ParseErrorCode};

impl HtmlParser<'_> {
    /// Complete the pending tag, whose markup ends at `end`.
    pub(super) fn finalize_tag(
        &mut self,
        end: usize,
        self_closing: bool,
    ) -> Result<Flow, HtmlError> {
        self.end_tag_name();
        let Some(tag) = self.tag.take() else {
            return Ok(Flow::Continue(ParseState::Text));
        };
        self.attribute = None;
        let Some(name) = tag.name.clone().filter(|n| !n.is_empty()) else {
            // `</>` and friends
            return Ok(Flow::Continue(ParseState::Text));
        };

        if self.options.is_stopper(&name) {
            self.remainder = Some(Remainder {
                text: self.text[tag.start.pos..].to_string(),
                offset: tag.start.pos,
            });
            return Ok(Flow::Halt);
        }

        if tag.is_end {
            self.close_end_tag(&name, tag.start, end)?;
            return Ok(Flow::Continue(ParseState::Text));
        }
        self.open_start_tag(tag, &name, end, self_closing)
    }

    fn open_start_tag(
        &mut self,
        tag: PendingTag,
        name: &str,
        end: usize,
        self_closing: bool,
    ) -> Result<Flow, HtmlError> {
        let lower = name.to_lowercase();
        let flags = self.tree.element_table().flags(&lower);
        self.close_implied_by(&lower, flags, tag.start)?;

        let mut data = ElementData::new(name);
        for attribute in tag.attributes {
            data.attrs.push(attribute);
        }
        let id = self.tree.alloc(NodeType::Element(data));
        self.tree.set_position(id, tag.start.position());
        let parent = self.current_parent();
        self.tree.append_child(parent, id)?;

        let halt = lower == "meta" && self.read_meta_charset(id, tag.start);

        if flags.is_void() || self_closing {
            self.tree.set_spans(
                id,
                Some(Span::between(tag.start.pos, end)),
                Some(Span::between(end, end)),
            );
            self.tree.set_closed(id, true);
            self.add_debugging_attributes(id)?;
        } else {
            self.open.push(OpenElement {
                id,
                name: lower,
                start: tag.start,
                inner_start: end,
            });
        }

        if halt {
            return Ok(Flow::Halt);
        }
        if flags.is_raw_text() && !self_closing {
            self.text_start = None;
            return Ok(Flow::Continue(ParseState::RawText));
        }
        Ok(Flow::Continue(ParseState::Text))
    }

    /// Close the elements a new `<name>` start tag implies the end of.
    fn close_implied_by(
        &mut self,
        name: &str,
        flags: ElementFlags,
        at: Cursor,
    ) -> Result<(), HtmlError> {
        if flags.is_closed()
            && let Some(index) = self.open.iter().rposition(|e| e.name == name)
        {
            self.close_above(index, at.pos)?;
            return self.close_top(at.pos, at.pos);
        }
        if !self.options.fix_nested_tags || !self.options.resetters.contains(name) {
            return Ok(());
        }
        let Some(index) = self.open.iter().rposition(|e| e.name == name) else {
            return Ok(());
        };
        if self.resetter_open_above(name, index) {
            return Ok(());
        }
        self.close_above(index, at.pos)?;
        self.close_top(at.pos, at.pos)
    }

    /// Whether a resetter of `name` was opened after `open[index]` and is
    /// still open.
    fn resetter_open_above(&self, name: &str, index: usize) -> bool {
        let resetters = self.options.resetters.resetters(name);
        self.open[index + 1..]
            .iter()
            .any(|e| resetters.iter().any(|r| *r == e.name))
    }

    /// Resolve an end tag for `name` spanning `start..end`.
    fn close_end_tag(&mut self, name: &str, start: Cursor, end: usize) -> Result<(), HtmlError> {
        let lower = name.to_lowercase();
        if let Some(index) = self.open.iter().rposition(|e| e.name == lower) {
            if self.options.fix_nested_tags && self.resetter_open_above(&lower, index) {
                self.record_error(
                    ParseErrorCode::EndTagInvalidHere,
                    start,
                    format!("End tag </{lower}> invalid here"),
                );
                return Ok(());
            }
            self.close_above(index, start.pos)?;
            return self.close_top(end, start.pos);
        }

        let flags = self.tree.element_table().flags(&lower);
        if flags.is_closed() {
            if flags.is_void() {
                self.record_error(
                    ParseErrorCode::EndTagNotRequired,
                    start,
                    format!("End tag </{lower}> is not required"),
                );
                self.repeat_void(name, &lower)
            } else {
                self.adopt_following_siblings(name, &lower)
            }
        } else if flags.can_overlap() {
            let text = self.text[start.pos..end].to_lowercase();
            let id = self.tree.create_text(&text);
            let parent = self.current_parent();
            self.tree.append_child(parent, id)?;
            Ok(())
        } else if flags.is_void() {
            self.record_error(
                ParseErrorCode::EndTagNotRequired,
                start,
                format!("End tag </{lower}> is not required"),
            );
            Ok(())
        } else {
            self.record_error(
                ParseErrorCode::TagNotOpened,
                start,
                format!("Start tag <{lower}> was not found"),
            );
            Ok(())
        }
    }

    /// `</br>`: redundant right after a childless `<br>`, a new `<br>`
    /// otherwise.
    fn repeat_void(&mut self, name: &str, lower: &str) -> Result<(), HtmlError> {
        let parent = self.current_parent();
        let redundant = self.tree.last_child(parent).is_some_and(|last| {
            self.tree.is_element_named(last, lower) && !self.tree.has_children(last)
        });
        if !redundant {
            let id = self.tree.create_element(name);
            self.tree.append_child(parent, id)?;
        }
        Ok(())
    }

    /// `</p>` with no open `p`: the last childless `p` takes every node
    /// after it; without one an empty `p` is appended.
    fn adopt_following_siblings(&mut self, name: &str, lower: &str) -> Result<(), HtmlError> {
        let parent = self.current_parent();
        let adopter = self
            .tree
            .children(parent)
            .iter()
            .rev()
            .copied()
            .find(|&child| {
                self.tree.is_element_named(child, lower) && !self.tree.has_children(child)
            });
        let Some(adopter) = adopter else {
            let id = self.tree.create_element(name);
            self.tree.append_child(parent, id)?;
            return Ok(());
        };
        let following: Vec<NodeId> = self.tree.following_siblings(adopter).collect();
        for sibling in following {
            self.tree.append_child(adopter, sibling)?;
        }
        // The adopter's markup no longer matches a single source range.
        self.tree.set_spans(adopter, None, None);
        Ok(())
    }

    /// Implicitly close every element above `open[index]` at `at`, recording
    /// each as unclosed.
    fn close_above(&mut self, index: usize, at: usize) -> Result<(), HtmlError> {
        let above = self.open.split_off(index + 1);
        if self.options.check_syntax {
            for element in &above {
                self.record_error(
                    ParseErrorCode::TagNotClosed,
                    element.start,
                    format!("End tag </{}> was not found", element.name),
                );
            }
        }
        for element in above.iter().rev() {
            self.close_element(element, at, at)?;
        }
        Ok(())
    }

    /// Pop and close the innermost open element.
    fn close_top(&mut self, outer_end: usize, inner_end: usize) -> Result<(), HtmlError> {
        match self.open.pop() {
            Some(element) => self.close_element(&element, outer_end, inner_end),
            None => Ok(()),
        }
    }

    fn close_element(
        &mut self,
        element: &OpenElement,
        outer_end: usize,
        inner_end: usize,
    ) -> Result<(), HtmlError> {
        self.tree.set_spans(
            element.id,
            Some(Span::between(element.start.pos, outer_end)),
            Some(Span::between(element.inner_start, inner_end)),
        );
        self.tree.set_closed(element.id, true);
        self.add_debugging_attributes(element.id)
    }

    /// Look for a charset declaration on a `<meta>` element. Returns whether
    /// parsing should stop here.
    fn read_meta_charset(&mut self, id: NodeId, at: Cursor) -> bool {
        if !self.options.read_encoding {
            return false;
        }
        let Some(label) = self.meta_charset_label(id) else {
            return false;
        };
        let Some(declared) = encoding_for_label(&label) else {
            let _ = warn_once(
                "Encoding",
                &format!("unknown charset '{label}' declared in <meta>, ignoring it"),
            );
            return false;
        };
        self.declared_encoding = Some(declared);
        if let Some(stream) = self.stream_encoding
            && stream != declared
        {
            let reason = format!(
                "Encoding mismatch between StreamEncoding: {} and DeclaredEncoding: {}",
                stream.name(),
                declared.name()
            );
            let _ = warn_once("Encoding", &reason);
            self.record_error(ParseErrorCode::CharsetMismatch, at, reason);
        }
        self.detect_only
    }

    fn meta_charset_label(&self, id: NodeId) -> Option<String> {
        let attrs = self.tree.attributes(id)?;
        let http_equiv = attrs
            .value("http-equiv")
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("content-type"));
        if http_equiv && let Some(content) = attrs.value("content") {
            return self
                .matcher
                .charset_from_content(content)
                .map(normalize_label);
        }
        attrs
            .value("charset")
            .map(normalize_label)
            .filter(|label| !label.is_empty())
    }
}
