//! Recursive tree walks
//!
//! Walks never descend into [`DocumentNode::Opaque`] nodes.

use crate::node::DocumentNode;
use std::collections::HashMap;

/// Pre-order visit of `node` and its descendants
pub fn visit<F>(node: &DocumentNode, f: &mut F)
where
    F: FnMut(&DocumentNode),
{
    f(node);
    for child in node.children() {
        visit(child, f);
    }
}

/// Replace nodes in a child list, recursing into nodes that are kept
///
/// `f` returns `Some(replacement)` to splice `replacement` in place of the
/// node (an empty vector removes it) or `None` to keep it and descend.
pub fn splice<F>(nodes: Vec<DocumentNode>, f: &mut F) -> Vec<DocumentNode>
where
    F: FnMut(&DocumentNode) -> Option<Vec<DocumentNode>>,
{
    let mut out = Vec::with_capacity(nodes.len());
    for mut node in nodes {
        if let Some(replacement) = f(&node) {
            out.extend(replacement);
            continue;
        }
        if let Some(element) = node.element_mut() {
            let children = std::mem::take(&mut element.children);
            element.children = splice(children, f);
        }
        out.push(node);
    }
    out
}

/// Placeholder ids present in the tree, document order, unique
#[must_use]
pub fn placeholder_ids(node: &DocumentNode) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    visit(node, &mut |n| {
        if let DocumentNode::Placeholder(p) = n {
            if !ids.contains(&p.placeholder_id) {
                ids.push(p.placeholder_id.clone());
            }
        }
    });
    ids
}

/// Splice placeholder replacements into `nodes`
///
/// Placeholders without an entry in `replacements` are left in place.
#[must_use]
pub fn replace_placeholders(
    nodes: Vec<DocumentNode>,
    replacements: &HashMap<String, Vec<DocumentNode>>,
) -> Vec<DocumentNode> {
    splice(nodes, &mut |node| match node {
        DocumentNode::Placeholder(p) => replacements.get(&p.placeholder_id).cloned(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{ElementNode, PlaceholderNode};
    use serde_json::json;

    fn placeholder(id: &str) -> DocumentNode {
        DocumentNode::Placeholder(PlaceholderNode::new(id, format!("grp-{id}"), vec![]))
    }

    fn tree() -> Vec<DocumentNode> {
        vec![
            DocumentNode::text_paragraph("intro"),
            placeholder("p1"),
            DocumentNode::Decor(ElementNode::new(vec![placeholder("p2")])),
            DocumentNode::Opaque(json!({ "type": "gen-part-placeholder", "placeholderId": "p3" })),
            placeholder("p4"),
        ]
    }

    #[test]
    fn replaces_nested_and_removes() {
        let mut replacements = HashMap::new();
        replacements.insert("p1".to_string(), vec![DocumentNode::text_paragraph("a"), DocumentNode::text_paragraph("b")]);
        replacements.insert("p2".to_string(), Vec::new());
        let out = replace_placeholders(tree(), &replacements);
        assert_eq!(out.len(), 6);
        assert_eq!(out[1].plain_text(), "a");
        assert!(out[3].children().is_empty());
        assert!(matches!(out[4], DocumentNode::Opaque(_)));
        assert!(matches!(out[5], DocumentNode::Placeholder(_)));
    }

    #[test]
    fn collects_ids_in_order() {
        let root = DocumentNode::Root(ElementNode::new(tree()));
        assert_eq!(placeholder_ids(&root), vec!["p1", "p2", "p4"]);
    }
}
