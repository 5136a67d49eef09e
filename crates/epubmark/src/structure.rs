//! The book structure tree.
//!
//! The structure is persisted inside `params.json` and edited externally, so
//! this module owns three concerns: upgrading legacy layouts to the canonical
//! shape, synthesizing a fresh tree from the manifest on first run, and
//! computing the derived views (reading order, ToC, hidden titles) the book
//! assembler and manifest need. Derived views are never persisted.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::Result;

/// A node in the structure tree. Sections group, chapters emit files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StructureNode {
    Section(Section),
    Chapter(ChapterNode),
}

/// A grouping node. Carries no content of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub is_section: bool,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub list_type: ListType,
    #[serde(default)]
    pub children: Vec<StructureNode>,
}

/// A chapter node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChapterNode {
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xhtml: Option<String>,
    pub title: String,
    pub subtitle: String,
    pub role: Role,
    pub in_toc: bool,
    pub hidden_title: bool,
    pub hungry: bool,
    pub devoured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_type: Option<ListType>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<StructureNode>,
}

impl Default for ChapterNode {
    fn default() -> Self {
        Self {
            filename: String::new(),
            xhtml: None,
            title: String::new(),
            subtitle: String::new(),
            role: Role::Chapter,
            in_toc: true,
            hidden_title: false,
            hungry: false,
            devoured: false,
            list_type: None,
            children: Vec::new(),
        }
    }
}

/// Chapter roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Chapter,
    Cover,
    #[serde(rename = "colophon", alias = "about")]
    Colophon,
    Promo,
    Break,
    Remove,
}

/// How a section's children number in the ToC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListType {
    #[default]
    #[serde(alias = "basic")]
    Plain,
    Numbered,
}

/// One entry of the ToC projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TocItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden_title: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TocItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_type: Option<ListType>,
}

/// Upgrade a persisted structure value to the canonical layout.
///
/// Three legacy shapes are migrated: a flat node array without a root
/// section gains a synthetic root, `numberedChildren: bool` becomes
/// `listType`, and the deprecated `basic` list type becomes `plain`. The
/// whole upgrade runs to a fixed point, so applying it to an already
/// canonical tree is a no-op.
pub fn upgrade(structure: Value) -> Value {
    let mut current = structure;
    loop {
        let next = migrate_list_types(wrap_flat_root(current.clone()));
        if next == current {
            return current;
        }
        current = next;
    }
}

fn wrap_flat_root(value: Value) -> Value {
    let Value::Array(items) = value else {
        return value;
    };
    let has_single_root = items.len() == 1
        && items[0]
            .get("isSection")
            .and_then(Value::as_bool)
            .unwrap_or(false);
    if has_single_root {
        return Value::Array(items);
    }
    json!([{
        "isSection": true,
        "id": "root",
        "listType": "plain",
        "children": items,
    }])
}

fn migrate_list_types(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.into_iter().map(migrate_list_types).collect()),
        Value::Object(mut map) => {
            if let Some(numbered) = map.remove("numberedChildren") {
                if !map.contains_key("listType") {
                    let list_type = if numbered.as_bool().unwrap_or(false) {
                        "numbered"
                    } else {
                        "plain"
                    };
                    map.insert("listType".to_string(), json!(list_type));
                }
            }
            if map.get("listType").and_then(Value::as_str) == Some("basic") {
                map.insert("listType".to_string(), json!("plain"));
            }
            if let Some(children) = map.remove("children") {
                map.insert("children".to_string(), migrate_list_types(children));
            }
            Value::Object(map)
        }
        other => other,
    }
}

/// The canonical structure tree with its derived views.
#[derive(Debug, Clone, PartialEq)]
pub struct Structure {
    pub roots: Vec<StructureNode>,
}

impl Structure {
    /// Deserialize a persisted structure, upgrading legacy layouts first.
    pub fn from_value(value: Value) -> Result<Structure> {
        let roots = serde_json::from_value(upgrade(value))?;
        Ok(Structure { roots })
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(&self.roots)?)
    }

    /// Build a first-run structure: one root section holding one chapter per
    /// manifest entry, in manifest order.
    pub fn synthesize(chapters: impl IntoIterator<Item = (String, String)>) -> Structure {
        let children = chapters
            .into_iter()
            .map(|(filename, xhtml)| {
                StructureNode::Chapter(ChapterNode {
                    filename,
                    xhtml: Some(xhtml),
                    ..ChapterNode::default()
                })
            })
            .collect();
        Structure {
            roots: vec![StructureNode::Section(Section {
                is_section: true,
                id: "root".to_string(),
                list_type: ListType::Plain,
                children,
            })],
        }
    }

    /// Output filenames whose title must not render in the chapter body.
    pub fn hidden_titles(&self) -> HashSet<String> {
        let mut set = HashSet::new();
        visit_chapters(&self.roots, &mut |chapter| {
            if chapter.hidden_title {
                set.insert(chapter.filename.clone());
            }
        });
        set
    }

    /// The published reading order, as `.html` names.
    ///
    /// Removed subtrees and devoured chapters never appear; the cover is the
    /// index document rather than a reading-order entry; the colophon
    /// aggregate contributes exactly one entry at the very end regardless of
    /// where its nodes sit in the tree.
    pub fn reading_order(&self) -> Vec<String> {
        let mut order = Vec::new();
        let mut has_colophon = false;
        collect_reading_order(&self.roots, &mut order, &mut has_colophon);
        if has_colophon {
            order.push("colophon.html".to_string());
        }
        order
    }

    /// The ToC projection for the book manifest.
    pub fn toc_items(&self) -> Vec<TocItem> {
        project_toc(&self.roots)
    }

    pub fn has_promo(&self) -> bool {
        let mut found = false;
        visit_chapters(&self.roots, &mut |chapter| {
            found = found || chapter.role == Role::Promo;
        });
        found
    }

    /// Make sure a promo node exists, prepending one to the root section's
    /// children when absent.
    pub fn ensure_promo(&mut self) {
        if self.has_promo() {
            return;
        }
        let promo = StructureNode::Chapter(ChapterNode {
            filename: "promo.md".to_string(),
            role: Role::Promo,
            in_toc: false,
            ..ChapterNode::default()
        });
        match self.roots.first_mut() {
            Some(StructureNode::Section(root)) => root.children.insert(0, promo),
            _ => self.roots.insert(0, promo),
        }
    }
}

fn visit_chapters(nodes: &[StructureNode], visit: &mut impl FnMut(&ChapterNode)) {
    for node in nodes {
        match node {
            StructureNode::Section(section) => visit_chapters(&section.children, visit),
            StructureNode::Chapter(chapter) => {
                visit(chapter);
                visit_chapters(&chapter.children, visit);
            }
        }
    }
}

fn collect_reading_order(nodes: &[StructureNode], order: &mut Vec<String>, has_colophon: &mut bool) {
    for node in nodes {
        match node {
            StructureNode::Section(section) => {
                collect_reading_order(&section.children, order, has_colophon);
            }
            StructureNode::Chapter(chapter) => match chapter.role {
                Role::Remove => {}
                Role::Colophon => *has_colophon = true,
                Role::Promo => order.push("promo.html".to_string()),
                Role::Cover => {
                    collect_reading_order(&chapter.children, order, has_colophon);
                }
                Role::Chapter | Role::Break => {
                    if !chapter.devoured {
                        order.push(html_name(&chapter.filename));
                    }
                    collect_reading_order(&chapter.children, order, has_colophon);
                }
            },
        }
    }
}

fn project_toc(nodes: &[StructureNode]) -> Vec<TocItem> {
    let mut items = Vec::new();
    for node in nodes {
        match node {
            StructureNode::Section(section) => {
                let children = project_toc(&section.children);
                if !children.is_empty() {
                    items.push(TocItem {
                        link: None,
                        title: None,
                        hidden_title: None,
                        children,
                        list_type: Some(section.list_type),
                    });
                }
            }
            StructureNode::Chapter(chapter) => {
                let children = project_toc(&chapter.children);
                let listed = chapter.in_toc
                    && !chapter.title.is_empty()
                    && matches!(chapter.role, Role::Chapter | Role::Break);
                if listed {
                    items.push(TocItem {
                        link: Some(html_name(&chapter.filename)),
                        title: Some(chapter.title.clone()),
                        hidden_title: chapter.hidden_title.then_some(true),
                        children,
                        list_type: chapter.list_type,
                    });
                } else {
                    items.extend(children);
                }
            }
        }
    }
    items
}

fn html_name(filename: &str) -> String {
    match filename.strip_suffix(".md") {
        Some(stem) => format!("{}.html", stem),
        None => filename.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chapter(filename: &str) -> ChapterNode {
        ChapterNode {
            filename: filename.to_string(),
            title: filename.trim_end_matches(".md").to_string(),
            ..ChapterNode::default()
        }
    }

    #[test]
    fn test_upgrade_wraps_flat_array() {
        let legacy = json!([
            {"filename": "a.md"},
            {"filename": "b.md"},
        ]);
        let upgraded = upgrade(legacy);
        assert_eq!(upgraded[0]["isSection"], true);
        assert_eq!(upgraded[0]["id"], "root");
        assert_eq!(upgraded[0]["children"][1]["filename"], "b.md");
    }

    #[test]
    fn test_upgrade_migrates_numbered_children() {
        let legacy = json!([
            {"isSection": true, "id": "root", "numberedChildren": true, "children": [
                {"filename": "a.md", "numberedChildren": false},
            ]},
        ]);
        let upgraded = upgrade(legacy);
        assert_eq!(upgraded[0]["listType"], "numbered");
        assert_eq!(upgraded[0].get("numberedChildren"), None);
        assert_eq!(upgraded[0]["children"][0]["listType"], "plain");
    }

    #[test]
    fn test_upgrade_renames_basic() {
        let legacy = json!([
            {"isSection": true, "id": "root", "listType": "basic", "children": []},
        ]);
        assert_eq!(upgrade(legacy)[0]["listType"], "plain");
    }

    #[test]
    fn test_upgrade_is_idempotent() {
        let legacy = json!([
            {"filename": "a.md", "numberedChildren": true},
            {"isSection": true, "listType": "basic", "children": [{"filename": "b.md"}]},
        ]);
        let once = upgrade(legacy);
        let twice = upgrade(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_structure_round_trip() {
        let structure = Structure::synthesize(vec![
            ("one.md".to_string(), "one.xhtml".to_string()),
            ("two.md".to_string(), "two.xhtml".to_string()),
        ]);
        let value = structure.to_value().unwrap();
        let back = Structure::from_value(value).unwrap();
        assert_eq!(structure, back);
    }

    #[test]
    fn test_reading_order_exclusions() {
        let structure = Structure {
            roots: vec![StructureNode::Section(Section {
                is_section: true,
                id: "root".to_string(),
                list_type: ListType::Plain,
                children: vec![
                    StructureNode::Chapter(ChapterNode {
                        role: Role::Cover,
                        filename: "cover.md".to_string(),
                        ..ChapterNode::default()
                    }),
                    StructureNode::Chapter(ChapterNode {
                        role: Role::Promo,
                        filename: "promo.md".to_string(),
                        ..ChapterNode::default()
                    }),
                    StructureNode::Chapter(chapter("one.md")),
                    StructureNode::Chapter(ChapterNode {
                        devoured: true,
                        ..chapter("two.md")
                    }),
                    StructureNode::Chapter(ChapterNode {
                        role: Role::Remove,
                        ..chapter("junk.md")
                    }),
                    StructureNode::Chapter(ChapterNode {
                        role: Role::Colophon,
                        ..chapter("notes.md")
                    }),
                    StructureNode::Chapter(chapter("three.md")),
                ],
            })],
        };

        assert_eq!(
            structure.reading_order(),
            vec!["promo.html", "one.html", "three.html", "colophon.html"]
        );
    }

    #[test]
    fn test_toc_projection() {
        let structure = Structure {
            roots: vec![StructureNode::Section(Section {
                is_section: true,
                id: "root".to_string(),
                list_type: ListType::Numbered,
                children: vec![
                    StructureNode::Chapter(chapter("one.md")),
                    StructureNode::Chapter(ChapterNode {
                        in_toc: false,
                        ..chapter("hidden.md")
                    }),
                    StructureNode::Chapter(ChapterNode {
                        title: String::new(),
                        ..chapter("untitled.md")
                    }),
                    StructureNode::Chapter(ChapterNode {
                        role: Role::Remove,
                        ..chapter("junk.md")
                    }),
                    StructureNode::Section(Section {
                        is_section: true,
                        id: "empty".to_string(),
                        list_type: ListType::Plain,
                        children: vec![],
                    }),
                ],
            })],
        };

        let toc = structure.toc_items();
        assert_eq!(toc.len(), 1);
        assert_eq!(toc[0].list_type, Some(ListType::Numbered));
        assert_eq!(toc[0].children.len(), 1);
        assert_eq!(toc[0].children[0].link.as_deref(), Some("one.html"));
        assert_eq!(toc[0].children[0].title.as_deref(), Some("one"));
    }

    #[test]
    fn test_hidden_titles() {
        let structure = Structure {
            roots: vec![StructureNode::Section(Section {
                is_section: true,
                id: "root".to_string(),
                list_type: ListType::Plain,
                children: vec![
                    StructureNode::Chapter(ChapterNode {
                        hidden_title: true,
                        ..chapter("one.md")
                    }),
                    StructureNode::Chapter(chapter("two.md")),
                ],
            })],
        };
        let hidden = structure.hidden_titles();
        assert!(hidden.contains("one.md"));
        assert!(!hidden.contains("two.md"));
    }

    #[test]
    fn test_ensure_promo_prepends_once() {
        let mut structure = Structure::synthesize(vec![(
            "one.md".to_string(),
            "one.xhtml".to_string(),
        )]);
        assert!(!structure.has_promo());

        structure.ensure_promo();
        assert!(structure.has_promo());
        let StructureNode::Section(root) = &structure.roots[0] else {
            panic!("root must stay a section");
        };
        assert_eq!(root.children.len(), 2);

        structure.ensure_promo();
        let StructureNode::Section(root) = &structure.roots[0] else {
            panic!("root must stay a section");
        };
        assert_eq!(root.children.len(), 2);
    }

    #[test]
    fn test_chapter_parses_without_section_marker() {
        let node: StructureNode =
            serde_json::from_str(r#"{"filename": "a.md", "role": "break"}"#).unwrap();
        let StructureNode::Chapter(chapter) = node else {
            panic!("expected a chapter");
        };
        assert_eq!(chapter.role, Role::Break);
        assert!(chapter.in_toc);
    }

    #[test]
    fn test_colophon_role_spelling() {
        let a: Role = serde_json::from_str("\"colophon\"").unwrap();
        let b: Role = serde_json::from_str("\"about\"").unwrap();
        assert_eq!(a, Role::Colophon);
        assert_eq!(b, Role::Colophon);
        // "about" is a legacy spelling; persisting always writes "colophon".
        assert_eq!(serde_json::to_string(&b).unwrap(), "\"colophon\"");
    }
}
