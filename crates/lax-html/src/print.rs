//! Debug rendering of a tree, one node per line.

use std::fmt::Write as _;

use lax_dom::{DomTree, NodeId, NodeType};

/// Render the subtree at `id` as an indented outline.
///
/// Elements show their attributes, text shows line breaks as `\n` and
/// spaces as `·`, comments show their raw markup.
#[must_use]
pub fn tree_to_string(tree: &DomTree, id: NodeId) -> String {
    let mut out = String::new();
    write_node(tree, id, 0, &mut out);
    out
}

/// Print a DOM tree for debugging.
pub fn print_tree(tree: &DomTree, id: NodeId) {
    print!("{}", tree_to_string(tree, id));
}

fn write_node(tree: &DomTree, id: NodeId, indent: usize, out: &mut String) {
    let prefix = "  ".repeat(indent);
    let Some(node) = tree.get(id) else {
        return;
    };
    let _ = match &node.node_type {
        NodeType::Document => writeln!(out, "{prefix}Document"),
        NodeType::Element(data) => {
            if data.attrs.is_empty() {
                writeln!(out, "{prefix}<{}>", data.tag_name)
            } else {
                let attrs: Vec<String> = data
                    .attrs
                    .iter()
                    .map(|a| {
                        if a.value.is_empty() {
                            a.name.clone()
                        } else {
                            format!("{}=\"{}\"", a.name, a.value)
                        }
                    })
                    .collect();
                writeln!(out, "{prefix}<{} {}>", data.tag_name, attrs.join(" "))
            }
        }
        NodeType::Text(data) => {
            let display = data.replace('\n', "\\n").replace(' ', "\u{00B7}");
            writeln!(out, "{prefix}\"{display}\"")
        }
        NodeType::Comment(data) => writeln!(out, "{prefix}{data}"),
    };
    for &child in tree.children(id) {
        write_node(tree, child, indent + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_outline() {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        tree.set_attribute(div, "id", "a").unwrap();
        tree.set_attribute(div, "hidden", "").unwrap();
        let text = tree.create_text("hi there");
        tree.append_child(div, text).unwrap();
        tree.append_child(NodeId::ROOT, div).unwrap();

        assert_eq!(
            tree_to_string(&tree, NodeId::ROOT),
            "Document\n  <div id=\"a\" hidden>\n    \"hi\u{b7}there\"\n"
        );
    }
}
