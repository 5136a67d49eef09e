//! Class pattern compilation.
//!
//! Role patterns are user supplied, whitespace separated tokens. Each token is
//! a regular expression matched against the full, anchored class name. A
//! pattern like `calibre\d+ center.*` selects every class matching either
//! token.

use epubmark_dom::Node;
use regex::Regex;

/// A compiled role pattern: the concrete document classes it selects.
#[derive(Debug, Clone)]
pub struct ClassSelector {
    classes: Vec<String>,
}

impl ClassSelector {
    /// Compile a pattern against the document's class inventory.
    ///
    /// Returns `None` for blank patterns and for patterns that select no
    /// class at all, so an unconfigured role costs nothing at rewrite time.
    /// Tokens that fail to parse as regular expressions are skipped with a
    /// warning; a half valid pattern still applies its valid tokens.
    pub fn compile(pattern: &str, document_classes: &[String]) -> Option<ClassSelector> {
        if pattern.trim().is_empty() {
            return None;
        }

        let mut classes = Vec::new();
        for token in pattern.split_whitespace() {
            let anchored = format!("^{}$", token);
            let regex = match Regex::new(&anchored) {
                Ok(regex) => regex,
                Err(err) => {
                    log::warn!("ignoring invalid class pattern {:?}: {}", token, err);
                    continue;
                }
            };
            for class in document_classes {
                if regex.is_match(class) {
                    classes.push(class.clone());
                }
            }
        }

        if classes.is_empty() {
            None
        } else {
            Some(ClassSelector { classes })
        }
    }

    /// The selected classes, in token order then class order.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Whether a node carries any selected class.
    pub fn matches(&self, node: &Node) -> bool {
        node.is_element() && self.classes.iter().any(|class| node.has_class(class))
    }

    /// Render as a CSS selector list, `.c1, .c2`.
    pub fn css_string(&self) -> String {
        self.classes
            .iter()
            .map(|class| format!(".{}", class))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_blank_pattern_is_none() {
        assert!(ClassSelector::compile("", &classes(&["a"])).is_none());
        assert!(ClassSelector::compile("   ", &classes(&["a"])).is_none());
    }

    #[test]
    fn test_no_match_is_none() {
        assert!(ClassSelector::compile("missing", &classes(&["a", "b"])).is_none());
    }

    #[test]
    fn test_literal_token_anchored() {
        let inventory = classes(&["head", "heading", "subhead"]);
        let selector = ClassSelector::compile("head", &inventory).unwrap();
        assert_eq!(selector.classes(), &["head"]);
    }

    #[test]
    fn test_regex_token_fan_out() {
        let inventory = classes(&["calibre1", "calibre2", "calibre22", "other"]);
        let selector = ClassSelector::compile(r"calibre\d+", &inventory).unwrap();
        assert_eq!(selector.classes(), &["calibre1", "calibre2", "calibre22"]);
    }

    #[test]
    fn test_token_order_then_class_order() {
        let inventory = classes(&["alpha", "beta", "gamma"]);
        let selector = ClassSelector::compile("gamma (alpha|beta)", &inventory).unwrap();
        assert_eq!(selector.classes(), &["gamma", "alpha", "beta"]);
    }

    #[test]
    fn test_invalid_token_skipped() {
        let inventory = classes(&["good"]);
        let selector = ClassSelector::compile("([ good", &inventory).unwrap();
        assert_eq!(selector.classes(), &["good"]);
    }

    #[test]
    fn test_css_string() {
        let inventory = classes(&["c1", "c2"]);
        let selector = ClassSelector::compile("c1 c2", &inventory).unwrap();
        assert_eq!(selector.css_string(), ".c1, .c2");
    }

    #[test]
    fn test_matches_node() {
        let inventory = classes(&["pullout"]);
        let selector = ClassSelector::compile("pullout", &inventory).unwrap();
        let node = Node::element_with_attrs("p", vec![("class", "body pullout")]);
        assert!(selector.matches(&node));
        let other = Node::element_with_attrs("p", vec![("class", "body")]);
        assert!(!selector.matches(&other));
    }
}
