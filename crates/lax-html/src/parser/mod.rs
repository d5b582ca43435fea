//! Single-pass tolerant parser.
//!
//! The parser walks the input one character at a time through an explicit
//! state machine. Every state handler looks at the current character and
//! answers with a [`Flow`]: move on to a state, hand the same character to a
//! state, or stop. Nodes are created as soon as their markup is complete, so
//! the tree is always consistent, even when parsing halts early.

mod closing;
mod helpers;
mod states;

use encoding_rs::Encoding;
use lax_dom::{DomTree, NodeId, QuoteStyle, SourcePosition};
use strum_macros::Display;

use crate::document::{HtmlDocument, Remainder};
use crate::encoding::CharsetMatcher;
use crate::error::{HtmlError, ParseError};
use crate::options::ParseOptions;

/// Parser states. The machine starts in [`ParseState::Text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ParseState {
    /// Character data between tags.
    Text,
    /// Just after `<`: decides between start and end tag.
    WhichTag,
    /// Reading a tag name.
    Tag,
    /// Inside a tag, between attributes.
    BetweenAttributes,
    /// After `/` or `?` inside a tag.
    EmptyTag,
    /// Reading an attribute name.
    AttributeName,
    /// After an attribute name, before a possible `=`.
    AttributeBeforeEquals,
    /// After `=`, before the value.
    AttributeAfterEquals,
    /// Reading an unquoted value.
    AttributeValue,
    /// Reading a quoted value.
    QuotedAttributeValue,
    /// Inside `<!...>`.
    Comment,
    /// Inside `<%...%>`.
    ServerSideCode,
    /// Content of a raw-text element, up to its end tag.
    RawText,
}

/// What a state handler wants the main loop to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    /// Consume the character and switch to the state.
    Continue(ParseState),
    /// Switch to the state and hand it the same character.
    Reconsume(ParseState),
    /// Stop reading input.
    Halt,
}

/// Position of the next character to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Cursor {
    pub(crate) pos: usize,
    pub(crate) line: usize,
    pub(crate) column: usize,
}

impl Cursor {
    const START: Self = Self {
        pos: 0,
        line: 1,
        column: 1,
    };

    const fn position(self) -> SourcePosition {
        SourcePosition {
            line: self.line,
            column: self.column,
            offset: self.pos,
        }
    }

    const fn advance(&mut self, c: char) {
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }
}

/// A tag whose markup is still being read.
#[derive(Debug)]
struct PendingTag {
    start: Cursor,
    name_start: usize,
    name: Option<String>,
    is_end: bool,
    attributes: Vec<lax_dom::Attribute>,
}

/// An attribute whose markup is still being read.
#[derive(Debug)]
struct PendingAttribute {
    start: Cursor,
    name_end: Option<usize>,
    value_start: Option<usize>,
    quote: QuoteStyle,
}

/// An element waiting for its end tag.
#[derive(Debug, Clone)]
struct OpenElement {
    id: NodeId,
    name: String,
    start: Cursor,
    inner_start: usize,
}

/// Turns one text blob into a document.
pub struct HtmlParser<'a> {
    text: &'a str,
    options: &'a ParseOptions,
    matcher: &'a CharsetMatcher,
    tree: DomTree,
    state: ParseState,
    cursor: Cursor,
    text_start: Option<Cursor>,
    tag: Option<PendingTag>,
    attribute: Option<PendingAttribute>,
    quote: char,
    comment_start: Cursor,
    full_comment: bool,
    code_start: usize,
    resume_state: ParseState,
    open: Vec<OpenElement>,
    errors: Vec<ParseError>,
    stream_encoding: Option<&'static Encoding>,
    declared_encoding: Option<&'static Encoding>,
    detect_only: bool,
    remainder: Option<Remainder>,
}

impl<'a> HtmlParser<'a> {
    /// Prepare a parse of `text`.
    #[must_use]
    pub fn new(text: &'a str, options: &'a ParseOptions, matcher: &'a CharsetMatcher) -> Self {
        let mut tree = DomTree::new();
        tree.set_id_indexing(options.use_id_attribute);
        if let Some(table) = &options.element_table {
            tree.set_element_table(table.clone());
        }
        Self {
            text,
            options,
            matcher,
            tree,
            state: ParseState::Text,
            cursor: Cursor::START,
            text_start: None,
            tag: None,
            attribute: None,
            quote: '"',
            comment_start: Cursor::START,
            full_comment: false,
            code_start: 0,
            resume_state: ParseState::Text,
            open: Vec::new(),
            errors: Vec::new(),
            stream_encoding: None,
            declared_encoding: None,
            detect_only: false,
            remainder: None,
        }
    }

    /// The encoding the text was decoded from, checked against `<meta>`
    /// declarations.
    #[must_use]
    pub fn with_stream_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.stream_encoding = Some(encoding);
        self
    }

    /// Stop at the first recognized charset declaration.
    #[must_use]
    pub fn detect_only(mut self) -> Self {
        self.detect_only = true;
        self
    }

    /// Run the state machine over the whole input.
    ///
    /// # Errors
    ///
    /// Only internal tree failures surface here; malformed markup is recorded
    /// as parse errors on the returned document.
    pub fn run(mut self) -> Result<HtmlDocument, HtmlError> {
        let mut reconsumed = false;
        while let Some(c) = self.current() {
            match self.step(c)? {
                Flow::Continue(next) => {
                    self.cursor.advance(c);
                    self.state = next;
                    reconsumed = false;
                }
                Flow::Reconsume(next) => {
                    debug_assert!(!reconsumed, "reconsume chained into {next}");
                    self.state = next;
                    reconsumed = true;
                }
                Flow::Halt => break,
            }
        }
        let end = self
            .remainder
            .as_ref()
            .map_or(self.text.len(), |r| r.offset);
        self.finish(end)?;
        Ok(self.into_document())
    }

    fn step(&mut self, c: char) -> Result<Flow, HtmlError> {
        match self.state {
            ParseState::Text => self.handle_text_state(c),
            ParseState::WhichTag => Ok(self.handle_which_tag_state(c)),
            ParseState::Tag => self.handle_tag_state(c),
            ParseState::BetweenAttributes => self.handle_between_attributes_state(c),
            ParseState::EmptyTag => self.handle_empty_tag_state(c),
            ParseState::AttributeName => self.handle_attribute_name_state(c),
            ParseState::AttributeBeforeEquals => self.handle_attribute_before_equals_state(c),
            ParseState::AttributeAfterEquals => self.handle_attribute_after_equals_state(c),
            ParseState::AttributeValue => self.handle_attribute_value_state(c),
            ParseState::QuotedAttributeValue => self.handle_quoted_attribute_value_state(c),
            ParseState::Comment => self.handle_comment_state(c),
            ParseState::ServerSideCode => self.handle_server_side_code_state(c),
            ParseState::RawText => self.handle_raw_text_state(c),
        }
    }

    fn into_document(self) -> HtmlDocument {
        HtmlDocument::from_parts(
            self.tree,
            self.options.clone(),
            self.matcher.clone(),
            self.errors,
            self.stream_encoding,
            self.declared_encoding,
            self.remainder,
        )
    }
}
