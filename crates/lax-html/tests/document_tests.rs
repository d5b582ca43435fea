//! Integration tests for the document facade: queries, fragments and the
//! structural invariants of parsed trees.

use lax_dom::{DomError, DomTree, NodeId, NodeKind};
use lax_html::{HtmlDocument, HtmlError, ParseOptions};
use quickcheck_macros::quickcheck;

const PAGE: &str = r#"<html>
<head><title>Demo</title></head>
<body>
  <div id="Main" class="content">
    <p class="intro">Hello <b>world</b></p>
    <p>Second</p>
    <!-- note -->
    <ul><li>one</li><li>two</li><li>three</li></ul>
  </div>
  <div id="aside"><a href="/x">link</a></div>
</body>
</html>"#;

fn page() -> HtmlDocument {
    HtmlDocument::parse(PAGE).unwrap()
}

// =============================================================================
// Queries
// =============================================================================

#[test]
fn test_get_element_by_id_ignores_case() {
    let doc = page();
    let main = doc.get_element_by_id("main").unwrap().unwrap();
    assert_eq!(doc.tree().attribute(main, "class"), Some("content"));
    assert_eq!(doc.get_element_by_id("missing").unwrap(), None);
}

#[test]
fn test_get_element_by_id_requires_index() {
    let options = ParseOptions::default().with_id_attribute(false);
    let doc = HtmlDocument::parse_with_options(PAGE, &options).unwrap();
    assert!(matches!(
        doc.get_element_by_id("main"),
        Err(HtmlError::Dom(DomError::IdIndexDisabled))
    ));
}

#[test]
fn test_select_paths() {
    let doc = page();
    let tree = doc.tree();

    assert_eq!(doc.select("//li").unwrap().len(), 3);
    assert_eq!(doc.select("/html/body/div").unwrap().len(), 2);

    let last = doc.select_single("//ul/li[last()]").unwrap().unwrap();
    assert_eq!(tree.inner_text(last), "three");

    let intro = doc.select_single("//p[@class='intro']").unwrap().unwrap();
    assert_eq!(tree.inner_text(intro), "Hello world");

    let second = doc.select_single("//div[@id='Main']/p[2]").unwrap().unwrap();
    assert_eq!(tree.inner_text(second), "Second");

    let comments = doc.select("//comment()").unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(tree.as_comment(comments[0]), Some("<!-- note -->"));

    let link = doc.select_single("//a[starts-with(@href, '/')]").unwrap();
    assert!(link.is_some());
    assert!(doc.select_single("//a[contains(text(), 'nope')]").unwrap().is_none());
}

#[test]
fn test_select_relative_to_node() {
    let doc = page();
    let tree = doc.tree();
    let ul = doc.select_single("//ul").unwrap().unwrap();

    let items = tree.select(ul, "li[not(position()=1)]");
    // position() is outside the supported subset
    assert!(items.is_err());

    let items = tree.select(ul, "li").unwrap();
    assert_eq!(items.len(), 3);
    let parent = tree.select_single(items[0], "..").unwrap();
    assert_eq!(parent, Some(ul));
    let body = tree.select_single(ul, "ancestor::body").unwrap().unwrap();
    assert_eq!(tree.name(body), Some("body"));
}

#[test]
fn test_select_reports_bad_paths() {
    let doc = page();
    let err = doc.select("//div[@id='x'").unwrap_err();
    assert!(matches!(
        err,
        HtmlError::Dom(DomError::InvalidPath { .. })
    ));
}

#[test]
fn test_navigation_helpers_on_parsed_tree() {
    let doc = page();
    let tree = doc.tree();
    let main = doc.get_element_by_id("main").unwrap().unwrap();

    let paragraphs = tree.elements(main, "p");
    assert_eq!(paragraphs.len(), 2);
    assert_eq!(tree.element(main, "ul").map(|u| tree.children(u).len()), Some(3));
    assert_eq!(
        tree.ancestors(main)
            .filter_map(|a| tree.name(a).map(str::to_string))
            .collect::<Vec<_>>(),
        ["body", "html", "#document"]
    );
    assert_eq!(tree.descendants_named(main, "li").count(), 3);
    assert_eq!(tree.body().and_then(|b| tree.name(b)), Some("body"));
    assert_eq!(tree.document_element().and_then(|h| tree.name(h)), Some("html"));
}

// =============================================================================
// Fragments
// =============================================================================

#[test]
fn test_create_node_returns_detached_copy() {
    let mut doc = page();
    let node = doc.create_node(r#"<span class="new">fresh</span><i>ignored</i>"#).unwrap();
    let tree = doc.tree();

    assert_eq!(tree.name(node), Some("span"));
    assert_eq!(tree.parent(node), None);
    assert!(tree.get(node).unwrap().position().is_none());
    assert_eq!(tree.outer_html(node), r#"<span class="new">fresh</span>"#);
}

#[test]
fn test_created_node_does_not_shadow_ids() {
    let mut doc = page();
    let main = doc.get_element_by_id("main").unwrap().unwrap();
    let copy = doc.create_node("<p id=main>copy</p>").unwrap();

    assert_eq!(doc.get_element_by_id("main").unwrap(), Some(main));
    let body = doc.tree().body().unwrap();
    doc.tree_mut().append_child(body, copy).unwrap();
    assert_eq!(doc.get_element_by_id("main").unwrap(), Some(copy));
    doc.tree_mut().detach(copy).unwrap();
    assert_eq!(doc.get_element_by_id("main").unwrap(), Some(main));
}

#[test]
fn test_create_node_from_empty_fragment() {
    let mut doc = page();
    assert!(matches!(doc.create_node(""), Err(HtmlError::EmptyFragment)));
}

#[test]
fn test_set_inner_html_replaces_children() {
    let mut doc = page();
    let aside = doc.get_element_by_id("aside").unwrap().unwrap();
    doc.set_inner_html(aside, "<em>a</em>b<em id=c>c</em>").unwrap();

    let tree = doc.tree();
    assert_eq!(tree.children(aside).len(), 3);
    assert_eq!(tree.inner_html(aside), "<em>a</em>b<em id=\"c\">c</em>");
    assert_eq!(
        tree.outer_html(aside),
        r#"<div id="aside"><em>a</em>b<em id="c">c</em></div>"#
    );
    let c = doc.get_element_by_id("c").unwrap();
    assert_eq!(c.and_then(|c| tree.parent(c)), Some(aside));
    assert!(doc.select("//a").unwrap().is_empty());
}

#[test]
fn test_appended_node_shows_up_in_output() {
    let mut doc = HtmlDocument::parse("<ul><li>1</li></ul>").unwrap();
    let ul = doc.select_single("//ul").unwrap().unwrap();
    let li = doc.create_node("<li>2</li>").unwrap();
    doc.tree_mut().append_child(ul, li).unwrap();
    assert_eq!(doc.save(), "<ul><li>1</li><li>2</li></ul>");
}

// =============================================================================
// Structural invariant
// =============================================================================

const PIECES: &[&str] = &[
    "<div>", "</div>", "<p>", "</p>", "<br>", "</br>", "<li>", "</li>", "<ul>", "</ul>", "<b ",
    "class='x'", ">", "<", "/>", "text", " ", "<script>", "</script>", "<!--", "-->", "<!x>",
    "</form>", "<%", "%>", "&amp;", "\n", "<td>", "<table>", "=", "\"", "<?xml ?>", "</",
    "\u{e9}",
];

fn assemble(picks: &[u8]) -> String {
    picks
        .iter()
        .map(|&i| PIECES[usize::from(i) % PIECES.len()])
        .collect()
}

/// Every attached node agrees with its parent and siblings about where it
/// lives.
fn links_are_consistent(tree: &DomTree) -> bool {
    let mut stack = vec![NodeId::ROOT];
    while let Some(id) = stack.pop() {
        let children = tree.children(id);
        for (i, &child) in children.iter().enumerate() {
            let prev = i.checked_sub(1).map(|p| children[p]);
            let next = children.get(i + 1).copied();
            if tree.parent(child) != Some(id)
                || tree.prev_sibling(child) != prev
                || tree.next_sibling(child) != next
                || !tree.is_closed(child)
                || tree.kind(child) == Some(NodeKind::Document)
            {
                return false;
            }
            stack.push(child);
        }
    }
    true
}

#[quickcheck]
fn prop_parsed_trees_are_well_formed(picks: Vec<u8>) -> bool {
    let html = assemble(&picks);
    let options = ParseOptions::default().with_fix_nested_tags(picks.len() % 2 == 0);
    let doc = HtmlDocument::parse_with_options(&html, &options).unwrap();
    let tree = doc.tree();

    links_are_consistent(tree)
        && tree.inner_html(NodeId::ROOT) == html
        && doc.errors().iter().all(|e| e.offset <= html.len())
}
