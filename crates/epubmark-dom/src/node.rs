//! Owned DOM node structure.
//!
//! Nodes own their children outright, which keeps structural edits (the whole
//! point of this crate) simple: every mutation is a plain `Vec` operation on
//! some node's child list.

/// Node kinds the pipeline cares about. Comments, processing instructions and
/// doctypes are dropped at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Element,
    Text,
    /// Synthetic root for parsed fragments without a single top element.
    Fragment,
}

/// A DOM node owning its subtree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub node_type: NodeType,

    /// Tag name, uppercase for elements ("P", "DIV"), `#text` for text nodes.
    pub node_name: String,

    /// Text content for text nodes.
    pub node_value: Option<String>,

    /// Attributes as a flat `[name, value, name, value, ...]` array.
    pub attributes: Option<Vec<String>>,

    /// Child nodes.
    pub children: Option<Vec<Node>>,
}

impl Node {
    /// Create a new element node.
    pub fn element(tag_name: &str) -> Self {
        Self {
            node_type: NodeType::Element,
            node_name: tag_name.to_uppercase(),
            node_value: None,
            attributes: Some(Vec::new()),
            children: Some(Vec::new()),
        }
    }

    /// Create a new element node with attributes.
    pub fn element_with_attrs(tag_name: &str, attrs: Vec<(&str, &str)>) -> Self {
        let flat_attrs: Vec<String> = attrs
            .into_iter()
            .flat_map(|(k, v)| vec![k.to_string(), v.to_string()])
            .collect();

        Self {
            node_type: NodeType::Element,
            node_name: tag_name.to_uppercase(),
            node_value: None,
            attributes: Some(flat_attrs),
            children: Some(Vec::new()),
        }
    }

    /// Create a new text node.
    pub fn text(content: &str) -> Self {
        Self {
            node_type: NodeType::Text,
            node_name: "#text".to_string(),
            node_value: Some(content.to_string()),
            attributes: None,
            children: None,
        }
    }

    /// Create a fragment node (used as the parse root when a chapter has no
    /// `<body>` wrapper).
    pub fn fragment() -> Self {
        Self {
            node_type: NodeType::Fragment,
            node_name: "#fragment".to_string(),
            node_value: None,
            attributes: None,
            children: Some(Vec::new()),
        }
    }

    pub fn is_element(&self) -> bool {
        self.node_type == NodeType::Element
    }

    pub fn is_text(&self) -> bool {
        self.node_type == NodeType::Text
    }

    /// Tag name, lowercase.
    pub fn tag_name(&self) -> String {
        self.node_name.to_lowercase()
    }

    /// Get an attribute value by name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        let attrs = self.attributes.as_ref()?;
        let name_lower = name.to_lowercase();

        let mut iter = attrs.iter();
        while let Some(attr_name) = iter.next() {
            if let Some(attr_value) = iter.next() {
                if attr_name.to_lowercase() == name_lower {
                    return Some(attr_value.as_str());
                }
            }
        }
        None
    }

    /// Set an attribute, replacing any existing value.
    pub fn set_attr(&mut self, name: &str, value: &str) {
        let attrs = self.attributes.get_or_insert_with(Vec::new);
        let name_lower = name.to_lowercase();
        let mut i = 0;
        while i + 1 < attrs.len() {
            if attrs[i].to_lowercase() == name_lower {
                attrs[i + 1] = value.to_string();
                return;
            }
            i += 2;
        }
        attrs.push(name.to_string());
        attrs.push(value.to_string());
    }

    /// Iterate over the class list (empty when no `class` attribute).
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    pub fn children(&self) -> impl Iterator<Item = &Node> {
        self.children.iter().flat_map(|c| c.iter())
    }

    pub fn children_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.children.iter_mut().flat_map(|c| c.iter_mut())
    }

    pub fn element_children(&self) -> impl Iterator<Item = &Node> {
        self.children().filter(|n| n.is_element())
    }

    pub fn add_child(&mut self, child: Node) {
        self.children.get_or_insert_with(Vec::new).push(child);
    }

    /// All text content from this node and its descendants.
    pub fn text_content(&self) -> String {
        match self.node_type {
            NodeType::Text => self.node_value.clone().unwrap_or_default(),
            _ => self.children().map(|child| child.text_content()).collect(),
        }
    }

    /// Reconstruct outer HTML.
    pub fn outer_html(&self) -> String {
        match self.node_type {
            NodeType::Text => escape_html_text(self.node_value.as_deref().unwrap_or("")),
            NodeType::Element => {
                let tag = self.tag_name();
                let attrs = self.attributes_string();

                if is_void_element(&tag) {
                    if attrs.is_empty() {
                        format!("<{}>", tag)
                    } else {
                        format!("<{} {}>", tag, attrs)
                    }
                } else {
                    let inner = self.inner_html();
                    if attrs.is_empty() {
                        format!("<{}>{}</{}>", tag, inner, tag)
                    } else {
                        format!("<{} {}>{}</{}>", tag, attrs, inner, tag)
                    }
                }
            }
            NodeType::Fragment => self.inner_html(),
        }
    }

    /// Reconstruct inner HTML.
    pub fn inner_html(&self) -> String {
        self.children().map(|child| child.outer_html()).collect()
    }

    fn attributes_string(&self) -> String {
        let Some(attrs) = &self.attributes else {
            return String::new();
        };

        let mut result = Vec::new();
        let mut iter = attrs.iter();
        while let Some(name) = iter.next() {
            if let Some(value) = iter.next() {
                if value.is_empty() {
                    result.push(name.clone());
                } else {
                    result.push(format!("{}=\"{}\"", name, escape_html_attr(value)));
                }
            }
        }
        result.join(" ")
    }

    // --- structural edits -------------------------------------------------

    /// Change this element's tag name, dropping its attributes.
    pub fn set_tag(&mut self, tag: &str) {
        self.node_name = tag.to_uppercase();
        self.attributes = Some(Vec::new());
    }

    /// Remove every descendant matching the predicate, subtree included.
    pub fn remove_matching<F: Fn(&Node) -> bool>(&mut self, matches: &F) {
        if let Some(children) = &mut self.children {
            children.retain(|c| !matches(c));
            for child in children.iter_mut() {
                child.remove_matching(matches);
            }
        }
    }

    /// Detach and return the first matching descendant, pre-order.
    pub fn take_first<F: Fn(&Node) -> bool>(&mut self, matches: &F) -> Option<Node> {
        let children = self.children.as_mut()?;
        let mut i = 0;
        while i < children.len() {
            if matches(&children[i]) {
                return Some(children.remove(i));
            }
            if let Some(found) = children[i].take_first(matches) {
                return Some(found);
            }
            i += 1;
        }
        None
    }

    /// First matching descendant, pre-order, read-only.
    pub fn find_first<F: Fn(&Node) -> bool>(&self, matches: &F) -> Option<&Node> {
        for child in self.children() {
            if matches(child) {
                return Some(child);
            }
            if let Some(found) = child.find_first(matches) {
                return Some(found);
            }
        }
        None
    }

    /// Retag every matching descendant to `tag` (attributes dropped,
    /// children kept).
    pub fn retag_matching<F: Fn(&Node) -> bool>(&mut self, matches: &F, tag: &str) {
        for child in self.children_mut() {
            if matches(child) {
                child.set_tag(tag);
            }
            child.retag_matching(matches, tag);
        }
    }

    /// For every matching descendant, move its children into a fresh `tag`
    /// element so the match keeps its place but its content gains a wrapper.
    pub fn wrap_inner_matching<F: Fn(&Node) -> bool>(&mut self, matches: &F, tag: &str) {
        for child in self.children_mut() {
            if matches(child) {
                let mut wrapper = Node::element(tag);
                wrapper.children = child.children.take().or_else(|| Some(Vec::new()));
                child.children = Some(vec![wrapper]);
            }
            child.wrap_inner_matching(matches, tag);
        }
    }

    /// Replace every matching descendant with a wrapper produced by `make`,
    /// the match becoming the wrapper's only child. The wrapper itself is
    /// never re-inspected; the match's own subtree is processed first.
    pub fn wrap_matching<F: Fn(&Node) -> bool>(&mut self, matches: &F, make: &dyn Fn() -> Node) {
        if let Some(children) = &mut self.children {
            for slot in children.iter_mut() {
                if matches(slot) {
                    let mut inner = std::mem::replace(slot, Node::fragment());
                    inner.wrap_matching(matches, make);
                    let mut wrapper = make();
                    wrapper.add_child(inner);
                    *slot = wrapper;
                } else {
                    slot.wrap_matching(matches, make);
                }
            }
        }
    }

    /// Insert a bare `tag` element immediately before (or after) every
    /// matching descendant.
    pub fn insert_adjacent_matching<F: Fn(&Node) -> bool>(
        &mut self,
        matches: &F,
        tag: &str,
        before: bool,
    ) {
        if let Some(children) = self.children.take() {
            let mut rebuilt = Vec::with_capacity(children.len());
            for mut child in children {
                child.insert_adjacent_matching(matches, tag, before);
                let hit = matches(&child);
                if hit && before {
                    rebuilt.push(Node::element(tag));
                }
                rebuilt.push(child);
                if hit && !before {
                    rebuilt.push(Node::element(tag));
                }
            }
            self.children = Some(rebuilt);
        }
    }

    /// Replace every matching descendant (subtree included) with a node
    /// produced by `make`.
    pub fn replace_matching<F: Fn(&Node) -> bool>(&mut self, matches: &F, make: &dyn Fn() -> Node) {
        if let Some(children) = &mut self.children {
            for slot in children.iter_mut() {
                if matches(slot) {
                    *slot = make();
                } else {
                    slot.replace_matching(matches, make);
                }
            }
        }
    }
}

fn is_void_element(tag: &str) -> bool {
    const VOID_ELEMENTS: &[&str] = &[
        "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
        "source", "track", "wbr",
    ];
    VOID_ELEMENTS.contains(&tag)
}

fn escape_html_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_html_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
