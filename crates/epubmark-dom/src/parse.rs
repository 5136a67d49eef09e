//! XHTML parsing into the owned [`Node`] tree.

use std::collections::BTreeSet;

use scraper::{ElementRef, Html, Node as ScraperNode};

use crate::node::Node;

/// Parse a chapter's XHTML and return its `<body>` as an owned tree.
///
/// Chapters are full XHTML documents in practice; when the markup has no
/// `<body>` (fragments in tests, malformed exports) the parsed root is
/// returned as a fragment instead.
pub fn parse_chapter(html: &str) -> Node {
    let document = Html::parse_document(html);
    let mut root = convert_element(document.root_element());

    if root.tag_name() == "body" {
        return root;
    }
    match root.take_first(&|n: &Node| n.is_element() && n.tag_name() == "body") {
        Some(body) => body,
        None => root,
    }
}

/// Collect every CSS class used below `node`, sorted and deduplicated.
pub fn collect_classes(node: &Node) -> Vec<String> {
    let mut classes = BTreeSet::new();
    collect_into(node, &mut classes);
    classes.into_iter().collect()
}

fn collect_into(node: &Node, classes: &mut BTreeSet<String>) {
    for class in node.classes() {
        classes.insert(class.to_string());
    }
    for child in node.children() {
        collect_into(child, classes);
    }
}

/// Convert a scraper element to the owned Node structure.
fn convert_element(element: ElementRef) -> Node {
    let tag = element.value().name();
    let attrs: Vec<(&str, &str)> = element.value().attrs().collect();

    let mut node = if attrs.is_empty() {
        Node::element(tag)
    } else {
        Node::element_with_attrs(tag, attrs)
    };

    for child in element.children() {
        match child.value() {
            ScraperNode::Text(text) => {
                node.add_child(Node::text(&text.text));
            }
            ScraperNode::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    node.add_child(convert_element(child_element));
                }
            }
            _ => {}
        }
    }

    node
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_returns_body() {
        let body = parse_chapter("<html><head><title>t</title></head><body><p>Hi</p></body></html>");
        assert_eq!(body.tag_name(), "body");
        assert_eq!(body.inner_html(), "<p>Hi</p>");
    }

    #[test]
    fn test_parse_fragment_without_body() {
        let body = parse_chapter("<p>Hi</p>");
        assert_eq!(body.text_content(), "Hi");
    }

    #[test]
    fn test_collect_classes_sorted_unique() {
        let body = parse_chapter(
            "<body><p class=\"b a\">x</p><p class=\"a\">y</p><span class=\"c\">z</span></body>",
        );
        assert_eq!(collect_classes(&body), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_entities_decoded() {
        let body = parse_chapter("<body><p>a&nbsp;b</p></body>");
        assert_eq!(body.text_content(), "a\u{a0}b");
    }
}
