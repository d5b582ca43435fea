//! Integration tests for the parser state machine and closing resolution.

use lax_dom::{DomTree, NodeId, NodeKind, QuoteStyle};
use lax_html::entities::de_entitize;
use lax_html::{HtmlDocument, ParseErrorCode, ParseOptions, tree_to_string};

/// Helper to parse HTML with default options
fn parse(html: &str) -> HtmlDocument {
    HtmlDocument::parse(html).unwrap()
}

/// Helper to parse HTML with custom options
fn parse_with(html: &str, options: &ParseOptions) -> HtmlDocument {
    HtmlDocument::parse_with_options(html, options).unwrap()
}

/// Helper to list the names of the children of a node
fn child_names(tree: &DomTree, id: NodeId) -> Vec<String> {
    tree.children(id)
        .iter()
        .map(|&c| tree.name(c).unwrap_or_default().to_string())
        .collect()
}

/// Helper to list the error codes of a document
fn codes(doc: &HtmlDocument) -> Vec<ParseErrorCode> {
    doc.errors().iter().map(|e| e.code).collect()
}

// =============================================================================
// Closing resolution
// =============================================================================

#[test]
fn test_void_end_tag_is_redundant() {
    let single = parse("<br>");
    let doubled = parse("<br></br>");

    assert_eq!(
        tree_to_string(single.tree(), NodeId::ROOT),
        tree_to_string(doubled.tree(), NodeId::ROOT)
    );
    assert!(single.errors().is_empty());
    assert_eq!(codes(&doubled), [ParseErrorCode::EndTagNotRequired]);
    assert_eq!(doubled.errors()[0].offset, 4);
    assert_eq!(doubled.errors()[0].reason, "End tag </br> is not required");
}

#[test]
fn test_stray_br_end_tag_creates_br() {
    let doc = parse("<p>a</br>b</p>");
    let tree = doc.tree();
    let p = tree.first_child(NodeId::ROOT).unwrap();
    assert_eq!(child_names(tree, p), ["#text", "br", "#text"]);
    assert_eq!(codes(&doc), [ParseErrorCode::EndTagNotRequired]);
}

#[test]
fn test_unclosed_elements_reported_in_document_order() {
    let doc = parse("<div><span>text");
    let tree = doc.tree();

    let div = tree.first_child(NodeId::ROOT).unwrap();
    let span = tree.first_child(div).unwrap();
    assert_eq!(tree.name(div), Some("div"));
    assert_eq!(tree.name(span), Some("span"));
    assert_eq!(tree.inner_text(span), "text");
    assert!(tree.is_closed(div));
    assert!(tree.is_closed(span));

    let errors = doc.errors();
    assert_eq!(
        codes(&doc),
        [ParseErrorCode::TagNotClosed, ParseErrorCode::TagNotClosed]
    );
    assert_eq!(errors[0].reason, "End tag </div> was not found");
    assert_eq!(errors[0].offset, 0);
    assert_eq!(errors[1].reason, "End tag </span> was not found");
    assert_eq!((errors[1].line, errors[1].column, errors[1].offset), (1, 6, 5));
}

#[test]
fn test_check_syntax_off_suppresses_unclosed_errors() {
    let options = ParseOptions::default().with_check_syntax(false);
    let doc = parse_with("<div><span>text", &options);
    assert!(doc.errors().is_empty());
    assert!(doc.tree().is_closed(doc.tree().first_child(NodeId::ROOT).unwrap()));
}

#[test]
fn test_end_tag_closes_inner_elements() {
    let doc = parse("<div><b>x</div>y");
    let tree = doc.tree();
    let div = tree.first_child(NodeId::ROOT).unwrap();
    assert_eq!(child_names(tree, NodeId::ROOT), ["div", "#text"]);
    assert_eq!(tree.inner_html(div), "<b>x");
    assert_eq!(codes(&doc), [ParseErrorCode::TagNotClosed]);
    assert_eq!(doc.errors()[0].offset, 5);
}

#[test]
fn test_paragraph_reopen_closes_previous() {
    let doc = parse("<p>one<p>two");
    let tree = doc.tree();
    assert_eq!(child_names(tree, NodeId::ROOT), ["p", "p"]);
    let first = tree.first_child(NodeId::ROOT).unwrap();
    let second = tree.last_child(NodeId::ROOT).unwrap();
    assert_eq!(tree.inner_text(first), "one");
    assert_eq!(tree.inner_text(second), "two");
    assert_eq!(tree.outer_html(first), "<p>one");
    assert_eq!(codes(&doc), [ParseErrorCode::TagNotClosed]);
}

#[test]
fn test_paragraph_reopen_closes_through_inline_elements() {
    let doc = parse("<p><b>one<p>two");
    let tree = doc.tree();
    assert_eq!(child_names(tree, NodeId::ROOT), ["p", "p"]);
    let first = tree.first_child(NodeId::ROOT).unwrap();
    assert_eq!(child_names(tree, first), ["b"]);
    assert_eq!(tree.outer_html(first), "<p><b>one");
    let b = tree.first_child(first).unwrap();
    assert_eq!(tree.outer_html(b), "<b>one");
    assert_eq!(
        codes(&doc),
        [ParseErrorCode::TagNotClosed, ParseErrorCode::TagNotClosed]
    );
    let offsets: Vec<usize> = doc.errors().iter().map(|e| e.offset).collect();
    assert_eq!(offsets, [3, 9]);
}

#[test]
fn test_stray_paragraph_end_tag_adopts_following_siblings() {
    let doc = parse("<div><p></p>text</p></div>");
    let tree = doc.tree();
    let div = tree.first_child(NodeId::ROOT).unwrap();
    assert_eq!(child_names(tree, div), ["p"]);
    let p = tree.first_child(div).unwrap();
    assert_eq!(tree.inner_text(p), "text");
    assert_eq!(tree.outer_html(p), "<p>text</p>");
    assert!(doc.errors().is_empty());
}

#[test]
fn test_stray_paragraph_end_tag_without_candidate_adds_empty_p() {
    let doc = parse("<div>a</p></div>");
    let tree = doc.tree();
    let div = tree.first_child(NodeId::ROOT).unwrap();
    assert_eq!(child_names(tree, div), ["#text", "p"]);
    assert!(!tree.has_children(tree.last_child(div).unwrap()));
}

#[test]
fn test_overlapping_end_tag_becomes_text() {
    let doc = parse("<div></FORM>x</div>");
    let tree = doc.tree();
    let div = tree.first_child(NodeId::ROOT).unwrap();
    assert_eq!(child_names(tree, div), ["#text", "#text"]);
    assert_eq!(tree.as_text(tree.first_child(div).unwrap()), Some("</form>"));
    assert!(doc.errors().is_empty());
}

#[test]
fn test_unmatched_end_tags() {
    let doc = parse("<div></span></img></div>");
    assert_eq!(
        codes(&doc),
        [ParseErrorCode::TagNotOpened, ParseErrorCode::EndTagNotRequired]
    );
    assert_eq!(doc.errors()[0].reason, "Start tag <span> was not found");
    let div = doc.tree().first_child(NodeId::ROOT).unwrap();
    assert!(!doc.tree().has_children(div));
}

#[test]
fn test_empty_end_tag_is_discarded() {
    let doc = parse("a</>b");
    assert_eq!(child_names(doc.tree(), NodeId::ROOT), ["#text", "#text"]);
    assert!(doc.errors().is_empty());
}

// =============================================================================
// Nested-tag fixing
// =============================================================================

#[test]
fn test_list_items_nest_without_fixing() {
    let doc = parse("<ul><li>a<li>b</ul>");
    let tree = doc.tree();
    let ul = tree.first_child(NodeId::ROOT).unwrap();
    assert_eq!(child_names(tree, ul), ["li"]);
}

#[test]
fn test_fix_nested_tags_closes_repeated_items() {
    let options = ParseOptions::default().with_fix_nested_tags(true);
    let doc = parse_with("<ul><li>a<ul><li>b</ul><li>c</ul>", &options);
    let tree = doc.tree();

    let outer = tree.first_child(NodeId::ROOT).unwrap();
    assert_eq!(child_names(tree, outer), ["li", "li"]);
    let first = tree.first_child(outer).unwrap();
    assert_eq!(child_names(tree, first), ["#text", "ul"]);
    let inner = tree.last_child(first).unwrap();
    assert_eq!(child_names(tree, inner), ["li"]);
    assert_eq!(tree.inner_text(tree.last_child(outer).unwrap()), "c");
    assert_eq!(
        codes(&doc),
        [ParseErrorCode::TagNotClosed, ParseErrorCode::TagNotClosed]
    );
}

#[test]
fn test_end_tag_across_resetter_is_invalid() {
    let options = ParseOptions::default().with_fix_nested_tags(true);
    let doc = parse_with("<li><ul></li>", &options);
    assert_eq!(
        codes(&doc),
        [
            ParseErrorCode::EndTagInvalidHere,
            ParseErrorCode::TagNotClosed,
            ParseErrorCode::TagNotClosed,
        ]
    );
    assert_eq!(doc.errors()[0].reason, "End tag </li> invalid here");
}

#[test]
fn test_custom_resetters() {
    let mut resetters = lax_html::ResetterTable::empty();
    resetters.insert("item", &["group"]);
    let options = ParseOptions::default()
        .with_fix_nested_tags(true)
        .with_resetters(resetters);
    let doc = parse_with("<item>a<item>b<li>c<li>d", &options);
    let tree = doc.tree();
    assert_eq!(child_names(tree, NodeId::ROOT), ["item", "item"]);
    let second = tree.last_child(NodeId::ROOT).unwrap();
    // `li` has no resetters in this table, so it nests.
    let li = tree.last_child(second).unwrap();
    assert_eq!(child_names(tree, li), ["#text", "li"]);
}

// =============================================================================
// Raw text, comments and server code
// =============================================================================

#[test]
fn test_raw_text_is_opaque() {
    let doc = parse(r#"<script>var x = "<div>";</script>"#);
    let tree = doc.tree();
    let script = tree.first_child(NodeId::ROOT).unwrap();
    assert_eq!(tree.children(script).len(), 1);
    assert_eq!(
        tree.as_text(tree.first_child(script).unwrap()),
        Some(r#"var x = "<div>";"#)
    );
    assert!(doc.errors().is_empty());
}

#[test]
fn test_raw_text_end_tag_matching() {
    let doc = parse("<SCRIPT>a</scripts>b</Script><style></style>");
    let tree = doc.tree();
    let script = tree.first_child(NodeId::ROOT).unwrap();
    assert_eq!(tree.inner_text(script), "a</scripts>b");
    let style = tree.last_child(NodeId::ROOT).unwrap();
    assert!(!tree.has_children(style));
    assert!(doc.errors().is_empty());
}

#[test]
fn test_comments_and_declarations() {
    let doc = parse("<!-- a > b -->x<!DOCTYPE html><!---->");
    let tree = doc.tree();
    assert_eq!(
        child_names(tree, NodeId::ROOT),
        ["#comment", "#text", "#comment", "#comment"]
    );
    let children = tree.children(NodeId::ROOT);
    assert_eq!(tree.as_comment(children[0]), Some("<!-- a > b -->"));
    assert_eq!(tree.as_comment(children[2]), Some("<!DOCTYPE html>"));
    assert_eq!(tree.as_comment(children[3]), Some("<!---->"));
}

#[test]
fn test_unterminated_comment_runs_to_end() {
    let doc = parse("a<!-- never closed");
    let tree = doc.tree();
    let comment = tree.last_child(NodeId::ROOT).unwrap();
    assert_eq!(tree.kind(comment), Some(NodeKind::Comment));
    assert_eq!(tree.as_comment(comment), Some("<!-- never closed"));
}

#[test]
fn test_server_code_in_text_stays_text() {
    let doc = parse(r#"a<%= "<b>" %>c"#);
    let tree = doc.tree();
    assert_eq!(child_names(tree, NodeId::ROOT), ["#text"]);
    assert_eq!(tree.inner_text(NodeId::ROOT), r#"a<%= "<b>" %>c"#);
}

#[test]
fn test_server_code_between_attributes_is_an_attribute() {
    let doc = parse(r#"<div <%= x %> class="a">t</div>"#);
    let tree = doc.tree();
    let div = tree.first_child(NodeId::ROOT).unwrap();
    let attrs = tree.attributes(div).unwrap();
    assert_eq!(attrs.len(), 2);
    assert!(attrs.get_index(0).unwrap().is_server_code());
    assert_eq!(tree.attribute(div, "class"), Some("a"));
    assert_eq!(doc.save(), r#"<div <%= x %> class="a">t</div>"#);
}

#[test]
fn test_server_code_as_attribute_value() {
    let doc = parse(r#"<a href=<%= url %> title="<% t %>">x</a>"#);
    let tree = doc.tree();
    let a = tree.first_child(NodeId::ROOT).unwrap();
    assert_eq!(tree.attribute(a, "href"), Some("<%= url %>"));
    assert_eq!(tree.attribute(a, "title"), Some("<% t %>"));
}

// =============================================================================
// Tags and attributes
// =============================================================================

#[test]
fn test_literal_less_than_is_text() {
    let doc = parse("a < b and 1<2");
    assert_eq!(child_names(doc.tree(), NodeId::ROOT), ["#text"]);
    assert_eq!(doc.tree().inner_text(NodeId::ROOT), "a < b and 1<2");
}

#[test]
fn test_lt_inside_tag_ends_the_tag() {
    let doc = parse("<div<span>x");
    let tree = doc.tree();
    let div = tree.first_child(NodeId::ROOT).unwrap();
    assert_eq!(tree.name(div), Some("div"));
    assert_eq!(child_names(tree, div), ["span"]);
}

#[test]
fn test_attribute_forms() {
    let doc = parse(r#"<input type=checkbox checked value = "a b" data-X='y' x=1 x=2>"#);
    let tree = doc.tree();
    let input = tree.first_child(NodeId::ROOT).unwrap();
    let attrs = tree.attributes(input).unwrap();

    assert_eq!(attrs.len(), 6);
    assert_eq!(attrs.value("type"), Some("checkbox"));
    assert_eq!(attrs.value("checked"), Some(""));
    assert_eq!(attrs.value("value"), Some("a b"));
    let data = attrs.get("data-x").unwrap();
    assert_eq!(data.original_name, "data-X");
    assert_eq!(data.quote, QuoteStyle::Single);
    assert_eq!(data.owner, Some(input));
    assert_eq!(attrs.value("x"), Some("1"));
    assert_eq!(attrs.all("x").count(), 2);
    assert!(tree.is_closed(input));
}

#[test]
fn test_self_closing_syntax_closes_element() {
    let doc = parse("<div/><span attr/>x");
    let tree = doc.tree();
    assert_eq!(child_names(tree, NodeId::ROOT), ["div", "span", "#text"]);
    let span = tree.children(NodeId::ROOT)[1];
    assert_eq!(tree.attribute(span, "attr"), Some(""));
    assert!(doc.errors().is_empty());
}

#[test]
fn test_processing_instruction_is_void() {
    let doc = parse(r#"<?xml version="1.0"?><root/>"#);
    let tree = doc.tree();
    let pi = tree.first_child(NodeId::ROOT).unwrap();
    assert_eq!(tree.name(pi), Some("?xml"));
    assert_eq!(tree.attribute(pi, "version"), Some("1.0"));
    assert_eq!(child_names(tree, NodeId::ROOT), ["?xml", "root"]);
}

#[test]
fn test_unterminated_tag_at_end_of_input() {
    let doc = parse(r#"<p>x<div class="a"#);
    let tree = doc.tree();
    let p = tree.first_child(NodeId::ROOT).unwrap();
    let div = tree.last_child(p).unwrap();
    assert_eq!(tree.attribute(div, "class"), Some("a"));
    assert!(tree.is_closed(div));
}

#[test]
fn test_original_case_is_kept() {
    let doc = parse("<DiV Class=x></dIv>");
    let tree = doc.tree();
    let div = tree.first_child(NodeId::ROOT).unwrap();
    let data = tree.as_element(div).unwrap();
    assert_eq!(data.tag_name, "div");
    assert_eq!(data.original_name, "DiV");
    assert!(doc.errors().is_empty());
}

// =============================================================================
// Source metadata
// =============================================================================

#[test]
fn test_positions_and_spans() {
    let html = "<div class=a>\n  <p>x</p></div>";
    let doc = parse(html);
    let tree = doc.tree();
    let div = tree.first_child(NodeId::ROOT).unwrap();
    let p = tree.element(div, "p").unwrap();

    let position = tree.get(p).unwrap().position().unwrap();
    assert_eq!((position.line, position.column, position.offset), (2, 3, 16));
    assert_eq!(tree.outer_html(div), html);
    assert_eq!(tree.inner_html(div), "\n  <p>x</p>");
    assert_eq!(tree.outer_html(p), "<p>x</p>");
    assert_eq!(tree.inner_html(NodeId::ROOT), html);
}

#[test]
fn test_mutation_switches_to_serialized_markup() {
    let mut doc = parse("<div a='1'><b>x</b></div>");
    let div = doc.tree().first_child(NodeId::ROOT).unwrap();
    assert_eq!(doc.tree().outer_html(div), "<div a='1'><b>x</b></div>");

    doc.tree_mut().set_attribute(div, "a", "2").unwrap();
    assert_eq!(doc.tree().outer_html(div), "<div a='2'><b>x</b></div>");
}

#[test]
fn test_error_snippets() {
    let options = ParseOptions::default().with_error_source_text(5);
    let doc = parse_with("<div><span>t\u{e9}xt", &options);
    assert_eq!(doc.errors()[0].source_text, "<div>");
    assert_eq!(doc.errors()[1].source_text, "<span");

    let doc = parse("<div>");
    assert_eq!(doc.errors()[0].source_text, "");
}

#[test]
fn test_debugging_attributes() {
    let options = ParseOptions::default().with_debugging_attributes(true);
    let doc = parse_with("<ul><li>a</li><li>b</ul>", &options);
    let tree = doc.tree();
    let ul = tree.first_child(NodeId::ROOT).unwrap();
    assert_eq!(tree.attribute(ul, "_closed"), Some("ul"));
    assert_eq!(tree.attribute(ul, "_children"), Some("2"));
    let li = tree.first_child(ul).unwrap();
    assert_eq!(tree.attribute(li, "_children"), Some("1"));
}

// =============================================================================
// Stopper
// =============================================================================

#[test]
fn test_stopper_leaves_remainder() {
    let options = ParseOptions::default().with_stopper("footer");
    let doc = parse_with(
        "<html><body>keep</body><footer>drop this</footer>",
        &options,
    );
    let tree = doc.tree();

    let html = tree.first_child(NodeId::ROOT).unwrap();
    assert_eq!(child_names(tree, NodeId::ROOT), ["html"]);
    assert_eq!(child_names(tree, html), ["body"]);
    assert_eq!(tree.inner_text(html), "keep");

    let remainder = doc.remainder().unwrap();
    assert_eq!(remainder.text, "<footer>drop this</footer>");
    assert_eq!(remainder.offset, 23);
    assert_eq!(tree.inner_html(NodeId::ROOT), "<html><body>keep</body>");
    assert_eq!(codes(&doc), [ParseErrorCode::TagNotClosed]);
}

#[test]
fn test_stopper_matches_end_tags() {
    let options = ParseOptions::default().with_stopper("BODY");
    let doc = parse_with("<div>a</body>b", &options);
    assert_eq!(doc.remainder().unwrap().text, "</body>b");
    assert_eq!(doc.tree().inner_text(NodeId::ROOT), "a");
}

// =============================================================================
// Serialization of parsed documents
// =============================================================================

#[test]
fn test_single_quotes_survive_html_output() {
    let doc = parse("<a href='x'>");
    assert_eq!(doc.save(), "<a href='x'></a>");
}

#[test]
fn test_xml_output_of_parsed_document() {
    let options = ParseOptions::default().with_xml_output(true);
    let doc = parse_with("<p>a & b</p><br><script>if (a < b) {}</script>", &options);
    assert_eq!(
        doc.save(),
        concat!(
            r#"<?xml version="1.0" encoding="utf-8"?><span>"#,
            "<p>a &amp; b</p><br />",
            "<script>\r\n//<![CDATA[\r\nif (a < b) {}\r\n//]]>//\r\n</script>",
            "</span>"
        )
    );
}

#[test]
fn test_upper_case_output() {
    let options = ParseOptions::default().with_upper_case(true);
    let doc = parse_with("<p class=x>y</p>", &options);
    assert_eq!(doc.save(), r#"<P CLASS="x">y</P>"#);
}

#[test]
fn test_quote_inside_attribute_value_is_escaped() {
    let mut doc = parse(r#"<a title="x">go</a>"#);
    let a = doc.tree().first_child(NodeId::ROOT).unwrap();
    doc.tree_mut().set_attribute(a, "title", r#"say "hi""#).unwrap();
    let saved = doc.save();
    assert_eq!(saved, r#"<a title="say &quot;hi&quot;">go</a>"#);

    let reparsed = parse(&saved);
    let a = reparsed.tree().first_child(NodeId::ROOT).unwrap();
    let title = reparsed.tree().attribute(a, "title").unwrap();
    assert_eq!(de_entitize(title), r#"say "hi""#);
    assert!(reparsed.errors().is_empty());
}

#[test]
fn test_apostrophe_in_single_quoted_value() {
    let mut doc = parse("<a title='x'>go</a>");
    let a = doc.tree().first_child(NodeId::ROOT).unwrap();
    doc.tree_mut().set_attribute(a, "title", "it's").unwrap();
    assert_eq!(doc.save(), "<a title='it&#39;s'>go</a>");

    let options = ParseOptions::default().with_xml_output(true);
    let mut doc = parse_with("<a title='x'>go</a>", &options);
    let a = doc.tree().first_child(NodeId::ROOT).unwrap();
    doc.tree_mut().set_attribute(a, "title", "it's \"quoted\"").unwrap();
    let saved = doc.save();
    assert!(saved.contains("<a title='it&#39;s &quot;quoted&quot;'>go</a>"));

    let reparsed = parse(&saved);
    let a = reparsed.select_single("//a").unwrap().unwrap();
    let title = reparsed.tree().attribute(a, "title").unwrap();
    assert_eq!(de_entitize(title), "it's \"quoted\"");
}
