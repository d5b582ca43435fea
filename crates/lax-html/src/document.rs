//! The document facade: loading, encoding detection and fragment helpers.
//!
//! [`HtmlDocument`] owns a parsed [`DomTree`] together with what the parse
//! learned on the way: recorded [`ParseError`]s, the encoding the bytes were
//! read with, the encoding the markup declared, and the unparsed remainder
//! when a stopper tag ended the parse early.

use encoding_rs::{Encoding, UTF_8};
use lax_dom::{DomTree, NodeId};

use crate::encoding::{self, CharsetMatcher};
use crate::error::{HtmlError, ParseError};
use crate::options::ParseOptions;
use crate::parser::HtmlParser;

/// Source text left unparsed because a stopper tag was reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remainder {
    /// The text from the stopper tag's `<` to the end of input.
    pub text: String,
    /// Byte offset of that `<` in the parsed text.
    pub offset: usize,
}

/// A parsed document.
///
/// ```
/// use lax_html::HtmlDocument;
///
/// let doc = HtmlDocument::parse("<div id=main><p>hi</div>").unwrap();
/// let main = doc.get_element_by_id("MAIN").unwrap().unwrap();
/// assert_eq!(doc.tree().inner_html(main), "<p>hi");
/// assert_eq!(doc.errors().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct HtmlDocument {
    tree: DomTree,
    options: ParseOptions,
    matcher: CharsetMatcher,
    errors: Vec<ParseError>,
    stream_encoding: Option<&'static Encoding>,
    declared_encoding: Option<&'static Encoding>,
    remainder: Option<Remainder>,
}

impl HtmlDocument {
    pub(crate) fn from_parts(
        mut tree: DomTree,
        options: ParseOptions,
        matcher: CharsetMatcher,
        errors: Vec<ParseError>,
        stream_encoding: Option<&'static Encoding>,
        declared_encoding: Option<&'static Encoding>,
        remainder: Option<Remainder>,
    ) -> Self {
        let output_encoding = declared_encoding.or(stream_encoding).unwrap_or(UTF_8);
        tree.set_write_options(options.write_options(output_encoding));
        Self {
            tree,
            options,
            matcher,
            errors,
            stream_encoding,
            declared_encoding,
            remainder,
        }
    }

    // ---------------------------------------------------------------------
    // Loading
    // ---------------------------------------------------------------------

    /// Parse `html` with default options.
    ///
    /// # Errors
    ///
    /// See [`HtmlDocument::parse_with_options`].
    pub fn parse(html: &str) -> Result<Self, HtmlError> {
        Self::parse_with_options(html, &ParseOptions::default())
    }

    /// Parse `html` with `options`.
    ///
    /// # Errors
    ///
    /// Malformed markup never fails; errors only come from compiling the
    /// charset pattern or from an internal tree failure.
    pub fn parse_with_options(html: &str, options: &ParseOptions) -> Result<Self, HtmlError> {
        Self::parse_with_matcher(html, options, &CharsetMatcher::new()?)
    }

    /// Parse `html` with `options`, reusing an already compiled `matcher`.
    ///
    /// Callers that parse many documents build one [`CharsetMatcher`] and
    /// pass it to every call.
    ///
    /// # Errors
    ///
    /// Only an internal tree failure can fail the parse.
    pub fn parse_with_matcher(
        html: &str,
        options: &ParseOptions,
        matcher: &CharsetMatcher,
    ) -> Result<Self, HtmlError> {
        HtmlParser::new(html, options, matcher).run()
    }

    /// Decode `bytes` (a Byte Order Mark wins over the default stream
    /// encoding) and parse the result.
    ///
    /// A `<meta>` charset that disagrees with the stream encoding is recorded
    /// as a `CharsetMismatch` parse error.
    ///
    /// # Errors
    ///
    /// See [`HtmlDocument::parse_with_options`].
    pub fn load_bytes(bytes: &[u8], options: &ParseOptions) -> Result<Self, HtmlError> {
        Self::load_bytes_with_matcher(bytes, options, &CharsetMatcher::new()?)
    }

    /// [`HtmlDocument::load_bytes`] with an already compiled `matcher`.
    ///
    /// # Errors
    ///
    /// See [`HtmlDocument::parse_with_matcher`].
    pub fn load_bytes_with_matcher(
        bytes: &[u8],
        options: &ParseOptions,
        matcher: &CharsetMatcher,
    ) -> Result<Self, HtmlError> {
        let decoded = encoding::decode(bytes, options.default_stream_encoding);
        HtmlParser::new(&decoded.text, options, matcher)
            .with_stream_encoding(decoded.encoding)
            .run()
    }

    /// The encoding declared by the first recognized `<meta>` charset in
    /// `html`. Parsing stops at that declaration.
    ///
    /// # Errors
    ///
    /// See [`HtmlDocument::parse_with_options`].
    pub fn detect_encoding(
        html: &str,
        options: &ParseOptions,
    ) -> Result<Option<&'static Encoding>, HtmlError> {
        Self::detect_with_matcher(html, options, &CharsetMatcher::new()?)
    }

    fn detect_with_matcher(
        html: &str,
        options: &ParseOptions,
        matcher: &CharsetMatcher,
    ) -> Result<Option<&'static Encoding>, HtmlError> {
        let detect = options.clone().with_read_encoding(true);
        let document = HtmlParser::new(html, &detect, matcher).detect_only().run()?;
        Ok(document.declared_encoding)
    }

    /// The encoding of `bytes`: the Byte Order Mark if there is one,
    /// otherwise the `<meta>` declaration of the text decoded with the
    /// default stream encoding.
    ///
    /// # Errors
    ///
    /// See [`HtmlDocument::parse_with_options`].
    pub fn detect_encoding_bytes(
        bytes: &[u8],
        options: &ParseOptions,
    ) -> Result<Option<&'static Encoding>, HtmlError> {
        Self::detect_bytes_with_matcher(bytes, options, &CharsetMatcher::new()?)
    }

    fn detect_bytes_with_matcher(
        bytes: &[u8],
        options: &ParseOptions,
        matcher: &CharsetMatcher,
    ) -> Result<Option<&'static Encoding>, HtmlError> {
        if let Some((encoding, _)) = encoding::sniff_bom(bytes) {
            return Ok(Some(encoding));
        }
        let decoded = encoding::decode(bytes, options.default_stream_encoding);
        Self::detect_with_matcher(&decoded.text, options, matcher)
    }

    /// Detect the encoding of `bytes`, decode with it and parse.
    ///
    /// Without a Byte Order Mark the declared encoding wins over the default
    /// stream encoding, so the resulting document never reports a charset
    /// mismatch for its own declaration.
    ///
    /// # Errors
    ///
    /// See [`HtmlDocument::parse_with_options`].
    pub fn detect_encoding_and_load(
        bytes: &[u8],
        options: &ParseOptions,
    ) -> Result<Self, HtmlError> {
        Self::detect_encoding_and_load_with_matcher(bytes, options, &CharsetMatcher::new()?)
    }

    /// [`HtmlDocument::detect_encoding_and_load`] with an already compiled
    /// `matcher`, used for both the detection pass and the full parse.
    ///
    /// # Errors
    ///
    /// See [`HtmlDocument::parse_with_matcher`].
    pub fn detect_encoding_and_load_with_matcher(
        bytes: &[u8],
        options: &ParseOptions,
        matcher: &CharsetMatcher,
    ) -> Result<Self, HtmlError> {
        let encoding = Self::detect_bytes_with_matcher(bytes, options, matcher)?
            .unwrap_or(options.default_stream_encoding);
        let text = encoding::decode_with(bytes, encoding);
        HtmlParser::new(&text, options, matcher)
            .with_stream_encoding(encoding)
            .run()
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------

    /// The parsed tree.
    #[must_use]
    pub const fn tree(&self) -> &DomTree {
        &self.tree
    }

    /// The parsed tree, for mutation.
    pub const fn tree_mut(&mut self) -> &mut DomTree {
        &mut self.tree
    }

    /// The Document node.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Recoveries recorded while parsing, in the order they happened.
    #[must_use]
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    /// Encoding named by a `<meta>` declaration, if one was recognized.
    #[must_use]
    pub const fn declared_encoding(&self) -> Option<&'static Encoding> {
        self.declared_encoding
    }

    /// Encoding the input bytes were decoded with; `None` for text input.
    #[must_use]
    pub const fn stream_encoding(&self) -> Option<&'static Encoding> {
        self.stream_encoding
    }

    /// Unparsed input after a stopper tag.
    #[must_use]
    pub const fn remainder(&self) -> Option<&Remainder> {
        self.remainder.as_ref()
    }

    /// The options the document was parsed with.
    #[must_use]
    pub const fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// The charset matcher the document was parsed with; fragments reuse it.
    #[must_use]
    pub const fn matcher(&self) -> &CharsetMatcher {
        &self.matcher
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// Element whose `id` attribute equals `id`, ignoring case.
    ///
    /// # Errors
    ///
    /// Fails when the document was parsed without the id index.
    pub fn get_element_by_id(&self, id: &str) -> Result<Option<NodeId>, HtmlError> {
        Ok(self.tree.get_element_by_id(id)?)
    }

    /// Evaluate a path expression from the Document node.
    ///
    /// # Errors
    ///
    /// Fails on malformed expressions.
    pub fn select(&self, path: &str) -> Result<Vec<NodeId>, HtmlError> {
        Ok(self.tree.select(NodeId::ROOT, path)?)
    }

    /// First match of a path expression from the Document node.
    ///
    /// # Errors
    ///
    /// Fails on malformed expressions.
    pub fn select_single(&self, path: &str) -> Result<Option<NodeId>, HtmlError> {
        Ok(self.tree.select_single(NodeId::ROOT, path)?)
    }

    // ---------------------------------------------------------------------
    // Fragments
    // ---------------------------------------------------------------------

    fn parse_fragment(&self, html: &str) -> Result<Self, HtmlError> {
        let mut options = self.options.clone();
        options.stopper_node_name = None;
        options.read_encoding = false;
        Self::parse_with_matcher(html, &options, &self.matcher)
    }

    /// Parse `html` and return a detached copy of its first top-level node,
    /// owned by this document.
    ///
    /// # Errors
    ///
    /// Returns [`HtmlError::EmptyFragment`] when `html` produces no node.
    pub fn create_node(&mut self, html: &str) -> Result<NodeId, HtmlError> {
        let fragment = self.parse_fragment(html)?;
        let first = fragment
            .tree
            .first_child(NodeId::ROOT)
            .ok_or(HtmlError::EmptyFragment)?;
        Ok(self.tree.import(&fragment.tree, first)?)
    }

    /// Replace the children of `id` with the nodes parsed from `html`.
    ///
    /// # Errors
    ///
    /// Fails when `id` is not part of the tree.
    pub fn set_inner_html(&mut self, id: NodeId, html: &str) -> Result<(), HtmlError> {
        let fragment = self.parse_fragment(html)?;
        self.tree.remove_all_children(id)?;
        for &child in fragment.tree.children(NodeId::ROOT) {
            let copy = self.tree.import(&fragment.tree, child)?;
            self.tree.append_child(id, copy)?;
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Output
    // ---------------------------------------------------------------------

    /// Serialize the whole document with the output options it was parsed
    /// with.
    #[must_use]
    pub fn save(&self) -> String {
        self.tree.serialize(NodeId::ROOT)
    }
}
