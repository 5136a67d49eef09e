//! The extracted EPUB: readium manifest and chapter sources.
//!
//! EPUB unpacking happens upstream; this module only reads what the
//! extractor left in `readium/`: a `manifest.json` plus the XHTML and
//! resource files it points at.

use std::fs;
use std::path::Path;

use epubmark_dom::{collect_classes, parse_chapter, Node};
use serde::Deserialize;
use serde_json::Value;

use crate::{Error, Result};

/// `readium/manifest.json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub metadata: Value,
    pub resources: Vec<ManifestLink>,
    #[serde(rename = "readingOrder")]
    pub reading_order: Vec<ManifestLink>,
}

/// One manifest entry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ManifestLink {
    pub href: String,
    #[serde(rename = "type")]
    pub media_type: String,
}

impl Manifest {
    /// Load the manifest from a book directory. A missing file means the
    /// EPUB was never extracted here.
    pub fn load(dir: &Path) -> Result<Manifest> {
        let path = dir.join("readium").join("manifest.json");
        if !path.exists() {
            return Err(Error::MissingManifest(path));
        }
        let text = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Resource hrefs, for the rename table.
    pub fn resource_hrefs(&self) -> Vec<String> {
        self.resources.iter().map(|link| link.href.clone()).collect()
    }
}

/// One loaded source chapter.
#[derive(Debug, Clone)]
pub struct Chapter {
    /// Source file basename, `chapter01.xhtml`.
    pub xhtml: String,
    /// Output markdown name derived from it, `chapter01.md`.
    pub filename: String,
    /// Parsed `<body>`, still untouched by any rewrite.
    pub body: Node,
    /// Sorted classes found in this chapter.
    pub classes: Vec<String>,
}

/// Load every reading-order chapter from the extracted EPUB.
pub fn load_chapters(dir: &Path, manifest: &Manifest) -> Result<Vec<Chapter>> {
    let readium = dir.join("readium");
    let mut chapters = Vec::with_capacity(manifest.reading_order.len());

    for link in &manifest.reading_order {
        let text = fs::read_to_string(readium.join(&link.href))?;
        let body = parse_chapter(&text);
        let classes = collect_classes(&body);
        let xhtml = link.href.rsplit('/').next().unwrap_or(&link.href).to_string();
        chapters.push(Chapter {
            filename: markdown_name(&xhtml),
            xhtml,
            body,
            classes,
        });
    }
    Ok(chapters)
}

/// Output name for a source chapter: extension swapped for `.md`, interior
/// whitespace dropped.
pub fn markdown_name(xhtml: &str) -> String {
    let stem = match xhtml.rsplit_once('.') {
        Some((stem, _)) => stem,
        None => xhtml,
    };
    let cleaned: String = stem.split_whitespace().collect();
    format!("{}.md", cleaned)
}

/// Union of all chapter class inventories, sorted.
pub fn all_classes(chapters: &[Chapter]) -> Vec<String> {
    let mut classes: Vec<String> = chapters
        .iter()
        .flat_map(|chapter| chapter.classes.iter().cloned())
        .collect();
    classes.sort();
    classes.dedup();
    classes
}
