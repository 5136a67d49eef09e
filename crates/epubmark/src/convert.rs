//! The whole-book conversion pipeline.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;

use crate::book;
use crate::emit::{
    append_missing_footnotes, emit_body, finish_chapter, footnote_definitions, EmitContext,
};
use crate::manifest::{all_classes, load_chapters, Manifest};
use crate::params::{load_params, save_params, ChapterSummary, EpubInfo, GithubRepo, ParamsFile};
use crate::promo::PromoSource;
use crate::resource::{copy_resources, rename_map};
use crate::rewrite::{rewrite_chapter, suggest_text, RoleSelectors};
use crate::structure::Structure;
use crate::Result;

/// What a conversion run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertSummary {
    pub chapters: usize,
    pub resources: usize,
}

/// Convert one extracted book directory.
///
/// Reads `readium/` and `params.json`, rebuilds `content/` from scratch and
/// writes `params.json` back with everything the next run (or the external
/// editor) needs.
pub fn convert_book(
    dir: &Path,
    github: Option<&str>,
    promo: &dyn PromoSource,
) -> Result<ConvertSummary> {
    let manifest = Manifest::load(dir)?;
    let chapters = load_chapters(dir, &manifest)?;
    let mut params_file = load_params(dir)?;
    let params = params_file.params.take().unwrap_or_default();

    let classes = all_classes(&chapters);
    let selectors = RoleSelectors::compile(&params.elements, &classes);
    report_unmapped_classes(&classes, &selectors);

    let mut structure = if params.structure.is_null() {
        Structure::synthesize(
            chapters
                .iter()
                .map(|chapter| (chapter.filename.clone(), chapter.xhtml.clone())),
        )
    } else {
        Structure::from_value(params.structure.clone())?
    };
    structure.ensure_promo();

    // content/ is rebuilt whole every run; readium/ stays, it is the
    // extractor's output, not ours.
    let out_dir = dir.join("content");
    if out_dir.exists() {
        fs::remove_dir_all(&out_dir)?;
    }
    fs::create_dir_all(&out_dir)?;

    let resource_hrefs = manifest.resource_hrefs();
    let renames = rename_map(&resource_hrefs);
    copy_resources(&dir.join("readium"), &out_dir, &resource_hrefs)?;

    // Per-chapter conversion first; the footnote pool and hidden-title set
    // need every chapter before any document is finished.
    let hidden_titles = structure.hidden_titles();
    let mut converted = Vec::with_capacity(chapters.len());
    for chapter in &chapters {
        let mut body = chapter.body.clone();
        let titles = rewrite_chapter(&mut body, &selectors);
        converted.push((chapter, titles, emit_body(&mut body)));
    }

    let global_footnotes: Vec<(String, String)> = converted
        .iter()
        .flat_map(|(_, _, body)| footnote_definitions(body))
        .collect();

    let ctx = EmitContext {
        hidden_titles: &hidden_titles,
        resource_renames: &renames,
        replacements: &params.replacements,
    };
    let mut texts = HashMap::with_capacity(converted.len());
    for (chapter, titles, body) in &converted {
        let body = append_missing_footnotes(body, &global_footnotes);
        texts.insert(
            chapter.filename.clone(),
            finish_chapter(&body, titles, &chapter.filename, &ctx),
        );
    }

    let metadata = merge_metadata(&manifest.metadata, &params.metadata);
    let actions = book::plan(&structure, &texts, &metadata)?;
    book::execute(&actions, &out_dir, promo)?;

    let summary = ConvertSummary {
        chapters: chapters.len(),
        resources: resource_hrefs.len(),
    };

    let github = match github {
        Some(spec) => GithubRepo::parse(spec),
        None => params_file.epub.as_ref().and_then(|epub| epub.github.clone()),
    };
    let epub = EpubInfo {
        metadata: manifest.metadata.clone(),
        chapters: chapters
            .iter()
            .map(|chapter| ChapterSummary {
                title_suggest: suggest_text(&chapter.body, &selectors.title).unwrap_or_default(),
                subtitle_suggest: suggest_text(&chapter.body, &selectors.subtitle)
                    .unwrap_or_default(),
                filename: chapter.filename.clone(),
                xhtml: chapter.xhtml.clone(),
            })
            .collect(),
        resources: resource_hrefs,
        classes,
        github,
        generated_at: now_millis(),
    };
    save_params(
        dir,
        &ParamsFile {
            params: Some(crate::params::Params {
                structure: structure.to_value()?,
                ..params
            }),
            epub: Some(epub),
        },
    )?;

    Ok(summary)
}

/// Classes no role claims are worth a look in the editor.
fn report_unmapped_classes(classes: &[String], selectors: &RoleSelectors) {
    let claimed = selectors.claimed_classes();
    let unmapped: Vec<&str> = classes
        .iter()
        .filter(|class| !claimed.contains(class))
        .map(String::as_str)
        .collect();
    if !unmapped.is_empty() {
        log::info!("unmapped classes: {}", unmapped.join(", "));
    }
}

/// Shallow merge of operator metadata overrides onto the EPUB's metadata.
fn merge_metadata(base: &Value, overrides: &Value) -> Value {
    match (base, overrides) {
        (Value::Object(base), Value::Object(overrides)) => {
            let mut merged = base.clone();
            for (key, value) in overrides {
                merged.insert(key.clone(), value.clone());
            }
            Value::Object(merged)
        }
        (base, Value::Null) => base.clone(),
        (_, overrides) => overrides.clone(),
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
