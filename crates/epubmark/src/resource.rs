//! Resource renaming and copying.
//!
//! EPUB exports ship images under arbitrary paths with arbitrary casing.
//! Every resource lands flat in `content/resources/` under a slugified name,
//! and chapter links are rewritten against the basename rename table built
//! here. The match is filename-only and best effort: two source folders
//! sharing a basename collide, and the first one wins.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::Result;

/// Lowercase a name into a hyphenated slug.
pub fn slugify(text: &str) -> String {
    let mut slug = String::new();
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            slug.extend(c.to_lowercase());
            pending_dash = false;
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Slugified output basename for a resource href.
pub fn renamed_basename(href: &str) -> String {
    let basename = href.rsplit('/').next().unwrap_or(href);
    match basename.rsplit_once('.') {
        Some((stem, ext)) => format!("{}.{}", slugify(stem), ext.to_lowercase()),
        None => slugify(basename),
    }
}

/// Build the basename rename table for a resource list.
pub fn rename_map(hrefs: &[String]) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for href in hrefs {
        let basename = href.rsplit('/').next().unwrap_or(href);
        map.entry(basename.to_string())
            .or_insert_with(|| renamed_basename(href));
    }
    map
}

/// Copy every resource into `<out_dir>/resources/` under its renamed
/// basename. Sources that went missing after extraction are skipped with a
/// warning rather than failing the book.
pub fn copy_resources(source_dir: &Path, out_dir: &Path, hrefs: &[String]) -> Result<()> {
    let target = out_dir.join("resources");
    fs::create_dir_all(&target)?;
    fs::write(target.join("_index.md"), "")?;

    for href in hrefs {
        let source = source_dir.join(href);
        if !source.exists() {
            log::warn!("resource {} not found, skipping", source.display());
            continue;
        }
        fs::copy(&source, target.join(renamed_basename(href)))?;
    }
    Ok(())
}
