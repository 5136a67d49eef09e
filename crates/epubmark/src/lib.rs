//! # epubmark
//!
//! Converts an extracted EPUB into a static-site-ready markdown content
//! tree, driven by an operator-editable `params.json` that maps the
//! publisher's CSS classes to semantic roles and arranges chapters into a
//! book structure.
//!
//! The pipeline per run: load the readium manifest and chapter sources,
//! compile class patterns into selectors, rewrite each chapter DOM, emit
//! markdown, then assemble the book (merging, colophon aggregation, reading
//! order and ToC) and write `params.json` back for the next round.

use std::path::PathBuf;

use thiserror::Error as ThisError;

pub mod book;
pub mod convert;
pub mod emit;
pub mod manifest;
pub mod markdown;
pub mod params;
pub mod promo;
pub mod resource;
pub mod rewrite;
pub mod selector;
pub mod structure;

pub use convert::{convert_book, ConvertSummary};
pub use params::{ElementRoleConfig, Filter, Params, ParamsFile};
pub use promo::{HttpPromoSource, NoPromo, PromoSource, DEFAULT_PROMO_URL};
pub use structure::{Structure, StructureNode};

/// Errors the conversion pipeline can fail with.
#[derive(Debug, ThisError)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("no extracted EPUB manifest at {} (run the extractor first)", .0.display())]
    MissingManifest(PathBuf),

    #[error("chapter {filename} is marked devoured but no hungry chapter precedes it")]
    DevouredWithoutHungry { filename: String },
}

pub type Result<T> = std::result::Result<T, Error>;
