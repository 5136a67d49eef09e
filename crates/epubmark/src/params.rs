//! The `params.json` contract.
//!
//! `params.json` is the operator's interface to the pipeline: it is written
//! out after every run with everything the next run needs (role patterns,
//! structure tree, replacement filters, observed classes), and any edits the
//! operator makes are read back on the next run. Unknown or missing fields
//! must never break a round trip, so everything here defaults.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;

/// Top level `params.json` document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamsFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Params>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epub: Option<EpubInfo>,
}

/// Operator-editable conversion parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Book metadata overrides, merged over the EPUB's own metadata.
    pub metadata: Value,
    /// Class patterns per semantic role.
    pub elements: ElementRoleConfig,
    /// The structure tree, kept as raw JSON so older layouts can be
    /// upgraded before deserialization.
    pub structure: Value,
    /// Text replacement filters applied to finished markdown.
    pub replacements: Vec<Filter>,
}

/// Class patterns per semantic role. Each value is a whitespace separated
/// list of anchored regular expressions over class names; empty means the
/// role is unused.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ElementRoleConfig {
    pub title: String,
    pub subtitle: String,
    pub h2: String,
    pub h3: String,
    pub h4: String,
    pub hr: String,
    pub hr_before: String,
    pub hr_after: String,
    pub br: String,
    pub br_before: String,
    pub br_after: String,
    pub blockquote: String,
    pub figure: String,
    pub centered: String,
    pub verse: String,
    pub em: String,
    pub strong: String,
    pub remove: String,
    pub ignore: String,
}

/// A find/replace filter over finished markdown.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Filter {
    pub find: String,
    pub replace: String,
    pub regex: bool,
    /// Operator's note of a sample match; not used by the pipeline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
}

/// Machine-written snapshot of the analyzed EPUB.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EpubInfo {
    pub metadata: Value,
    pub chapters: Vec<ChapterSummary>,
    pub resources: Vec<String>,
    pub classes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github: Option<GithubRepo>,
    pub generated_at: u64,
}

/// One reading-order chapter as seen during analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChapterSummary {
    pub title_suggest: String,
    pub subtitle_suggest: String,
    pub filename: String,
    pub xhtml: String,
}

/// Target repository, from a `user/repo` argument.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubRepo {
    pub user: String,
    pub repo: String,
}

impl GithubRepo {
    /// Parse `user/repo`. Anything else is `None`.
    pub fn parse(spec: &str) -> Option<GithubRepo> {
        let (user, repo) = spec.split_once('/')?;
        if user.is_empty() || repo.is_empty() || repo.contains('/') {
            return None;
        }
        Some(GithubRepo {
            user: user.to_string(),
            repo: repo.to_string(),
        })
    }
}

/// Load `params.json` from a book directory. A missing file means a first
/// run and yields defaults.
pub fn load_params(dir: &Path) -> Result<ParamsFile> {
    let path = dir.join("params.json");
    if !path.exists() {
        return Ok(ParamsFile::default());
    }
    let text = fs::read_to_string(&path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Write `params.json` back, pretty printed so it stays hand editable.
pub fn save_params(dir: &Path, params: &ParamsFile) -> Result<()> {
    let text = serde_json::to_string_pretty(params)?;
    fs::write(dir.join("params.json"), text + "\n")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_round_trips() {
        let parsed: ParamsFile = serde_json::from_str("{}").unwrap();
        assert!(parsed.params.is_none());
        assert!(parsed.epub.is_none());
    }

    #[test]
    fn test_partial_params_fill_defaults() {
        let parsed: ParamsFile =
            serde_json::from_str(r#"{"params": {"elements": {"title": "chapterHead"}}}"#).unwrap();
        let params = parsed.params.unwrap();
        assert_eq!(params.elements.title, "chapterHead");
        assert_eq!(params.elements.remove, "");
        assert!(params.replacements.is_empty());
    }

    #[test]
    fn test_camel_case_roles() {
        let parsed: ElementRoleConfig =
            serde_json::from_str(r#"{"hrBefore": "x", "brAfter": "y"}"#).unwrap();
        assert_eq!(parsed.hr_before, "x");
        assert_eq!(parsed.br_after, "y");

        let out = serde_json::to_value(&parsed).unwrap();
        assert_eq!(out["hrBefore"], "x");
        assert_eq!(out["brAfter"], "y");
    }

    #[test]
    fn test_unknown_fields_tolerated() {
        let parsed: ParamsFile =
            serde_json::from_str(r#"{"params": {"elements": {}, "futureKnob": 1}}"#).unwrap();
        assert!(parsed.params.is_some());
    }

    #[test]
    fn test_github_parse() {
        let gh = GithubRepo::parse("alice/my-book").unwrap();
        assert_eq!(gh.user, "alice");
        assert_eq!(gh.repo, "my-book");

        assert!(GithubRepo::parse("nonsense").is_none());
        assert!(GithubRepo::parse("a/b/c").is_none());
        assert!(GithubRepo::parse("/repo").is_none());
    }
}
