//! Book assembly.
//!
//! Walks the canonical structure tree and turns finished chapter documents
//! into the output content tree. Planning is pure: the walk produces a list
//! of write actions that `execute` then applies, which keeps the merge and
//! aggregation logic testable without a filesystem.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::emit::{split_front_matter, strip_trailing_footnotes};
use crate::promo::PromoSource;
use crate::structure::{ChapterNode, Role, Structure, StructureNode, TocItem};
use crate::{Error, Result};

/// Static asset directories the site shell ships alongside the content.
const STATIC_ASSETS: &[&str] = &["style", "scripts", "title", "fonts", "resources", "favicon.png"];

/// Title of the aggregate colophon document.
const COLOPHON_TITLE: &str = "Tiráž";

/// One planned output.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Write { filename: String, text: String },
    /// Written only if the promo source returns content.
    WritePromo { filename: String },
}

/// Plan the whole output content tree.
pub fn plan(
    structure: &Structure,
    texts: &HashMap<String, String>,
    metadata: &Value,
) -> Result<Vec<Action>> {
    let mut planner = Planner {
        texts,
        actions: Vec::new(),
        colophon: Vec::new(),
    };
    planner.walk_level(&structure.roots, true)?;

    if !planner.colophon.is_empty() {
        planner.actions.push(Action::Write {
            filename: "colophon.md".to_string(),
            text: colophon_document(&planner.colophon),
        });
    }

    planner.actions.push(Action::Write {
        filename: "_book.md".to_string(),
        text: book_document(structure, metadata)?,
    });

    Ok(planner.actions)
}

/// Apply planned actions under `out_dir`.
pub fn execute(actions: &[Action], out_dir: &Path, promo: &dyn PromoSource) -> Result<()> {
    fs::create_dir_all(out_dir)?;
    for action in actions {
        match action {
            Action::Write { filename, text } => {
                fs::write(out_dir.join(filename), text)?;
            }
            Action::WritePromo { filename } => {
                if let Some(text) = promo.fetch() {
                    fs::write(out_dir.join(filename), text)?;
                }
            }
        }
    }
    Ok(())
}

struct Planner<'a> {
    texts: &'a HashMap<String, String>,
    actions: Vec<Action>,
    /// Collected colophon fragments, `(title, body)`.
    colophon: Vec<(Option<String>, String)>,
}

impl Planner<'_> {
    fn walk_level(&mut self, nodes: &[StructureNode], root_level: bool) -> Result<()> {
        // The active merge target: index of the hungry chapter's action and
        // whether its trailing footnote block was already stripped. Merge
        // chains never cross section or role boundaries.
        let mut hungry: Option<(usize, bool)> = None;

        for (position, node) in nodes.iter().enumerate() {
            let chapter = match node {
                StructureNode::Section(section) => {
                    hungry = None;
                    // The canonical tree wraps everything in one root
                    // section; its first child is still at root position.
                    self.walk_level(&section.children, root_level && position == 0)?;
                    continue;
                }
                StructureNode::Chapter(chapter) => chapter,
            };

            match chapter.role {
                // Removed chapters have no side effect at all: an active
                // merge chain continues past them.
                Role::Remove => {}
                Role::Colophon => {
                    hungry = None;
                    self.collect_colophon(chapter);
                }
                Role::Promo => {
                    hungry = None;
                    self.actions.push(Action::WritePromo {
                        filename: chapter.filename.clone(),
                    });
                }
                Role::Cover => {
                    hungry = None;
                    if root_level && position == 0 {
                        if let Some(text) = self.chapter_text(chapter) {
                            self.actions.push(Action::Write {
                                filename: "_index.md".to_string(),
                                text,
                            });
                        }
                    } else {
                        log::warn!(
                            "cover {} is not the first root child, skipping",
                            chapter.filename
                        );
                    }
                    self.walk_level(&chapter.children, false)?;
                }
                Role::Chapter | Role::Break => {
                    if chapter.devoured {
                        self.merge_devoured(chapter, &mut hungry)?;
                    } else if let Some(text) = self.chapter_text(chapter) {
                        self.actions.push(Action::Write {
                            filename: chapter.filename.clone(),
                            text,
                        });
                        hungry = chapter.hungry.then_some((self.actions.len() - 1, false));
                    } else {
                        hungry = None;
                    }
                    self.walk_level(&chapter.children, false)?;
                }
            }
        }
        Ok(())
    }

    /// Append a devoured chapter's body to the active hungry target.
    fn merge_devoured(
        &mut self,
        chapter: &ChapterNode,
        hungry: &mut Option<(usize, bool)>,
    ) -> Result<()> {
        let Some((target, stripped)) = hungry else {
            return Err(Error::DevouredWithoutHungry {
                filename: chapter.filename.clone(),
            });
        };
        let Some(devoured_text) = self.texts.get(&chapter.filename) else {
            log::warn!("no converted text for devoured {}", chapter.filename);
            return Ok(());
        };
        let (_, body) = split_front_matter(devoured_text);

        let Action::Write { text, .. } = &mut self.actions[*target] else {
            return Ok(());
        };
        if !*stripped {
            *text = strip_trailing_footnotes(text);
            *stripped = true;
        }
        *text = format!("{}\n\n{}\n", text.trim_end(), body.trim_end());
        Ok(())
    }

    fn collect_colophon(&mut self, chapter: &ChapterNode) {
        let Some(text) = self.texts.get(&chapter.filename) else {
            log::warn!("no converted text for {}", chapter.filename);
            return;
        };
        let (meta, body) = split_front_matter(text);
        let title = meta.and_then(|m| m.title).filter(|t| !t.is_empty());
        self.colophon.push((title, body.trim().to_string()));
    }

    fn chapter_text(&self, chapter: &ChapterNode) -> Option<String> {
        let text = self.texts.get(&chapter.filename);
        if text.is_none() {
            log::warn!("no converted text for {}", chapter.filename);
        }
        text.cloned()
    }
}

/// The aggregate colophon document: titled fragments under their own
/// heading, untitled ones behind a rule.
fn colophon_document(fragments: &[(Option<String>, String)]) -> String {
    let rendered: Vec<String> = fragments
        .iter()
        .map(|(title, body)| match title {
            Some(title) => format!("## {}\n\n{}", title, body),
            None => format!("***\n\n{}", body),
        })
        .collect();
    format!(
        "---\ntitle: {}\n---\n\n{}\n",
        COLOPHON_TITLE,
        rendered.join("\n\n")
    )
}

/// Front matter of the book manifest document.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BookMeta<'a> {
    outputs: Vec<&'a str>,
    slug: &'a str,
    language_code: String,
    meta: &'a Value,
    chapters: Vec<String>,
    toc_base: Vec<TocItem>,
    r#static: Vec<&'a str>,
}

/// `_book.md`: the front-matter-only book manifest.
fn book_document(structure: &Structure, metadata: &Value) -> Result<String> {
    let meta = BookMeta {
        outputs: vec!["meta"],
        slug: "book",
        language_code: language_code(metadata),
        meta: metadata,
        chapters: structure.reading_order(),
        toc_base: structure.toc_items(),
        r#static: STATIC_ASSETS.to_vec(),
    };
    let yaml = serde_yaml::to_string(&meta)?;
    Ok(format!("---\n{}---\n", yaml))
}

fn language_code(metadata: &Value) -> String {
    let language = metadata
        .get("languageCode")
        .or_else(|| metadata.get("language"));
    match language {
        Some(Value::String(code)) => code.clone(),
        Some(Value::Array(codes)) => codes
            .first()
            .and_then(Value::as_str)
            .unwrap_or("en")
            .to_string(),
        _ => "en".to_string(),
    }
}
