//! Markdown emission and post-processing.
//!
//! Turns a rewritten chapter DOM into the final on-disk markdown document:
//! whitespace normalization, scene break sectioning, footnote syntax,
//! resource link targets, user replacement filters and YAML front matter.

use std::collections::{HashMap, HashSet};

use epubmark_dom::Node;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::markdown::{render, Options};
use crate::params::Filter;
use crate::rewrite::ChapterTitles;

/// Chapter front matter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChapterMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden_title: Option<bool>,
}

impl Default for ChapterMeta {
    fn default() -> Self {
        Self {
            title: None,
            subtitle: None,
            content_type: "prose".to_string(),
            hidden_title: None,
        }
    }
}

/// Whole-book context shared by every chapter emission.
pub struct EmitContext<'a> {
    /// Output filenames whose title renders in the ToC but not in the body.
    pub hidden_titles: &'a HashSet<String>,
    /// Original resource basename to slugified output basename.
    pub resource_renames: &'a HashMap<String, String>,
    /// User replacement filters, applied in order.
    pub replacements: &'a [Filter],
}

static LONG_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(" {12,}").unwrap());
static SCENE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new("\n{2,}[ \t\u{a0}]+\n{2,}").unwrap());
static BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new("\n{3,}").unwrap());
static FOOTNOTE_BACKLINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(\d+)\]\([^)#]*#footnote-[\w-]*backlink\)").unwrap());
static FOOTNOTE_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(\d+)\]\([^)#]*#footnote-[\w-]*\)").unwrap());
static FOOTNOTE_MARK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\^(\d+)\](:)?").unwrap());
static FOOTNOTE_DEF_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\[\^\d+\]: .*$").unwrap());
// Targets may contain spaces; EPUB exports are careless about hrefs.
static LINK_TARGET: Lazy<Regex> = Lazy::new(|| Regex::new(r"\]\(([^)]+)\)").unwrap());

/// Render a rewritten chapter body to a markdown body (no front matter yet).
pub fn emit_body(body: &mut Node) -> String {
    // Publishers mark visual breaks with paragraphs holding only no-break
    // spaces. Turn those into line breaks so they survive as whitespace
    // lines for the section split below.
    body.replace_matching(
        &|n: &Node| n.is_element() && n.tag_name() == "p" && is_nbsp_blank(&n.text_content()),
        &|| Node::element("br"),
    );

    let mut text = render(body, &Options::default());

    text = LONG_SPACES.replace_all(&text, " ".repeat(12).as_str()).into_owned();
    text = split_sections(&text);
    text = BLANK_RUN.replace_all(&text, "\n\n").into_owned();
    text = text.trim().to_string();

    rewrite_footnote_links(&text)
}

/// Rewrite emitted footnote link syntax to markdown footnote syntax.
/// Backlinks first: they carry the same prefix as plain references and would
/// otherwise be eaten by the reference rewrite.
fn rewrite_footnote_links(text: &str) -> String {
    let text = FOOTNOTE_BACKLINK.replace_all(text, "[^$1]: ");
    FOOTNOTE_REF.replace_all(&text, "[^$1]").into_owned()
}

fn is_nbsp_blank(text: &str) -> bool {
    !text.is_empty()
        && text.contains('\u{a0}')
        && text.chars().all(|c| matches!(c, '\u{a0}' | ' ' | '\t' | '\r' | '\n'))
}

/// Wrap the document in `<section>` blocks split at whitespace-only lines
/// between blank lines. Chapters without such a break stay unwrapped.
fn split_sections(text: &str) -> String {
    if !SCENE_BREAK.is_match(text) {
        return text.to_string();
    }
    let split = SCENE_BREAK.replace_all(text, "\n\n</section>\n\n<section>\n\n");
    format!("<section>\n\n{}\n\n</section>", split.trim())
}

/// Assemble the final chapter document: front matter, link targets, filters.
pub fn finish_chapter(
    body: &str,
    titles: &ChapterTitles,
    filename: &str,
    ctx: &EmitContext,
) -> String {
    let meta = ChapterMeta {
        title: titles.title.clone(),
        subtitle: titles.subtitle.clone(),
        hidden_title: ctx.hidden_titles.contains(filename).then_some(true),
        ..ChapterMeta::default()
    };

    let mut text = with_front_matter(&meta, body);
    text = rewrite_resource_links(&text, ctx.resource_renames);
    text = apply_filters(&text, ctx.replacements);
    text
}

/// Serialize front matter above a body, with a trailing newline.
pub fn with_front_matter(meta: &ChapterMeta, body: &str) -> String {
    // ChapterMeta has no values serde_yaml can reject.
    let yaml = serde_yaml::to_string(meta).unwrap_or_default();
    format!("---\n{}---\n\n{}\n", yaml, body)
}

/// Split a document into its front matter and body. Documents without a
/// front matter block return `(None, text)`.
pub fn split_front_matter(text: &str) -> (Option<ChapterMeta>, &str) {
    let Some(rest) = text.strip_prefix("---\n") else {
        return (None, text);
    };
    let Some(end) = rest.find("\n---\n") else {
        return (None, text);
    };
    let meta = serde_yaml::from_str(&rest[..end]).ok();
    let body = rest[end + "\n---\n".len()..].trim_start_matches('\n');
    (meta, body)
}

/// Point markdown link targets at the renamed resources directory. Anchors
/// and absolute URLs pass through; so does any target whose basename is not
/// in the rename table.
fn rewrite_resource_links(text: &str, renames: &HashMap<String, String>) -> String {
    if renames.is_empty() {
        return text.to_string();
    }
    LINK_TARGET
        .replace_all(text, |caps: &Captures| {
            let target = &caps[1];
            if target.starts_with('#')
                || target.starts_with("http://")
                || target.starts_with("https://")
            {
                return caps[0].to_string();
            }
            let basename = target.rsplit('/').next().unwrap_or(target);
            match renames.get(basename) {
                Some(renamed) => format!("](./resources/{})", renamed),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Apply user replacement filters in order. Blank finds are skipped, invalid
/// regexes are skipped with a warning.
fn apply_filters(text: &str, filters: &[Filter]) -> String {
    let mut text = text.to_string();
    for filter in filters {
        if filter.find.is_empty() {
            continue;
        }
        if filter.regex {
            match Regex::new(&filter.find) {
                Ok(pattern) => {
                    text = pattern.replace_all(&text, filter.replace.as_str()).into_owned();
                }
                Err(err) => {
                    log::warn!("ignoring invalid replacement pattern {:?}: {}", filter.find, err);
                }
            }
        } else {
            text = text.replace(&filter.find, &filter.replace);
        }
    }
    text
}

/// Footnote numbers a body references inline (definitions excluded).
pub fn referenced_footnotes(text: &str) -> Vec<String> {
    FOOTNOTE_MARK
        .captures_iter(text)
        .filter(|caps| caps.get(2).is_none())
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Footnote definition lines present in a body, keyed by number.
pub fn footnote_definitions(text: &str) -> Vec<(String, String)> {
    FOOTNOTE_DEF_LINE
        .find_iter(text)
        .filter_map(|m| {
            let line = m.as_str();
            let caps = FOOTNOTE_MARK.captures(line)?;
            Some((caps[1].to_string(), line.to_string()))
        })
        .collect()
}

/// Append definitions for footnotes the body references but never defines.
/// Bodies that already carry their definitions stay untouched.
pub fn append_missing_footnotes(text: &str, global: &[(String, String)]) -> String {
    if !footnote_definitions(text).is_empty() {
        return text.to_string();
    }
    let needed: Vec<&str> = {
        let referenced = referenced_footnotes(text);
        global
            .iter()
            .filter(|(number, _)| referenced.contains(number))
            .map(|(_, line)| line.as_str())
            .collect()
    };
    if needed.is_empty() {
        return text.to_string();
    }
    format!("{}\n\n{}", text.trim_end(), needed.join("\n"))
}

/// Drop the trailing footnote definition block of a body, if any. Used when
/// another chapter's body is appended and the definitions must move below it.
pub fn strip_trailing_footnotes(text: &str) -> String {
    let mut end = text.len();
    for line in text.lines().rev() {
        let is_def = FOOTNOTE_MARK
            .captures(line)
            .map(|caps| caps.get(2).is_some())
            .unwrap_or(false)
            && line.starts_with("[^");
        if !(line.trim().is_empty() || is_def) {
            break;
        }
        end = line.as_ptr() as usize - text.as_ptr() as usize;
    }
    text[..end].trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use epubmark_dom::parse_chapter;

    use super::*;

    #[test]
    fn test_footnote_rewrite() {
        assert_eq!(
            rewrite_footnote_links("see [3](#footnote-19288-3-backlink)\n[3](#footnote-19288-3)"),
            "see [^3]: \n[^3]"
        );
    }

    #[test]
    fn test_footnote_rewrite_with_file_prefix() {
        let mut body = parse_chapter("<p>word<a href=\"notes.xhtml#footnote-7\">7</a></p>");
        assert_eq!(emit_body(&mut body), "word[^7]");
    }

    #[test]
    fn test_long_space_runs_capped() {
        assert_eq!(
            LONG_SPACES.replace_all(&" ".repeat(30), " ".repeat(12).as_str()),
            " ".repeat(12)
        );
        assert_eq!(LONG_SPACES.replace_all("a   b", "x"), "a   b");
    }

    #[test]
    fn test_scene_break_sections() {
        let mut body = parse_chapter("<p>one</p><p>\u{a0}</p><p>two</p>");
        assert_eq!(
            emit_body(&mut body),
            "<section>\n\none\n\n</section>\n\n<section>\n\ntwo\n\n</section>"
        );
    }

    #[test]
    fn test_no_scene_break_no_sections() {
        let mut body = parse_chapter("<p>one</p><p>two</p>");
        assert_eq!(emit_body(&mut body), "one\n\ntwo");
    }

    #[test]
    fn test_front_matter_emitted() {
        let ctx = EmitContext {
            hidden_titles: &HashSet::new(),
            resource_renames: &HashMap::new(),
            replacements: &[],
        };
        let titles = ChapterTitles {
            title: Some("One".to_string()),
            subtitle: None,
        };
        let text = finish_chapter("Body.", &titles, "ch01.md", &ctx);
        assert_eq!(text, "---\ntitle: One\ncontentType: prose\n---\n\nBody.\n");
    }

    #[test]
    fn test_hidden_title_flag() {
        let hidden: HashSet<String> = ["ch01.md".to_string()].into();
        let ctx = EmitContext {
            hidden_titles: &hidden,
            resource_renames: &HashMap::new(),
            replacements: &[],
        };
        let text = finish_chapter("Body.", &ChapterTitles::default(), "ch01.md", &ctx);
        assert!(text.contains("hiddenTitle: true"));
    }

    #[test]
    fn test_front_matter_round_trip() {
        let meta = ChapterMeta {
            title: Some("One".to_string()),
            subtitle: Some("A beginning".to_string()),
            hidden_title: Some(true),
            ..ChapterMeta::default()
        };
        let text = with_front_matter(&meta, "Body.");
        let (parsed, body) = split_front_matter(&text);
        assert_eq!(parsed.unwrap(), meta);
        assert_eq!(body, "Body.\n");
    }

    #[test]
    fn test_split_front_matter_absent() {
        let (meta, body) = split_front_matter("Just body.");
        assert!(meta.is_none());
        assert_eq!(body, "Just body.");
    }

    #[test]
    fn test_resource_links_rewritten() {
        let renames: HashMap<String, String> =
            [("image.jpg".to_string(), "image-abc123.jpg".to_string())].into();
        let ctx = EmitContext {
            hidden_titles: &HashSet::new(),
            resource_renames: &renames,
            replacements: &[],
        };
        let text = finish_chapter(
            "![alt](../Images/image.jpg) and [site](https://example.com/image.jpg) and [here](#top)",
            &ChapterTitles::default(),
            "ch01.md",
            &ctx,
        );
        assert!(text.contains("![alt](./resources/image-abc123.jpg)"));
        assert!(text.contains("[site](https://example.com/image.jpg)"));
        assert!(text.contains("[here](#top)"));
    }

    #[test]
    fn test_filters_applied_in_order() {
        let filters = vec![
            Filter {
                find: "colour".to_string(),
                replace: "color".to_string(),
                regex: false,
                example: None,
            },
            Filter {
                find: r"(?m)^color".to_string(),
                replace: "COLOR".to_string(),
                regex: true,
                example: None,
            },
            Filter {
                find: String::new(),
                replace: "never".to_string(),
                regex: false,
                example: None,
            },
        ];
        let ctx = EmitContext {
            hidden_titles: &HashSet::new(),
            resource_renames: &HashMap::new(),
            replacements: &filters,
        };
        let text = finish_chapter("colour me surprised", &ChapterTitles::default(), "x.md", &ctx);
        assert!(text.contains("COLOR me surprised"));
    }

    #[test]
    fn test_literal_filter_is_not_regex() {
        let filters = vec![Filter {
            find: "1.5".to_string(),
            replace: "2.0".to_string(),
            regex: false,
            example: None,
        }];
        let ctx = EmitContext {
            hidden_titles: &HashSet::new(),
            resource_renames: &HashMap::new(),
            replacements: &filters,
        };
        let text = finish_chapter("105 and 1.5", &ChapterTitles::default(), "x.md", &ctx);
        assert!(text.contains("105 and 2.0"));
    }

    #[test]
    fn test_append_missing_footnotes() {
        let global = vec![
            ("1".to_string(), "[^1]: First note.".to_string()),
            ("2".to_string(), "[^2]: Second note.".to_string()),
        ];
        let appended = append_missing_footnotes("Uses[^2] one note.", &global);
        assert_eq!(appended, "Uses[^2] one note.\n\n[^2]: Second note.");

        let already = "Uses[^1].\n\n[^1]: Mine.";
        assert_eq!(append_missing_footnotes(already, &global), already);

        let none = "No notes at all.";
        assert_eq!(append_missing_footnotes(none, &global), none);
    }

    #[test]
    fn test_strip_trailing_footnotes() {
        let text = "Body text.\n\n[^1]: One.\n[^2]: Two.";
        assert_eq!(strip_trailing_footnotes(text), "Body text.");

        let no_block = "Body text.\nMore body.";
        assert_eq!(strip_trailing_footnotes(no_block), no_block);
    }
}
