//! Command line frontend.
//!
//! Points the pipeline at a book directory that holds the source EPUB next
//! to the extractor's `readium/` output, converts it, and reports what was
//! produced.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Parser;
use epubmark::{convert_book, HttpPromoSource, NoPromo, PromoSource, DEFAULT_PROMO_URL};

#[derive(Debug, Parser)]
#[command(name = "epubmark", version, about = "Convert an extracted EPUB to a markdown book")]
struct Args {
    /// Book directory containing the EPUB and the extracted readium/ tree.
    #[arg(default_value = ".")]
    dir: PathBuf,

    /// Target repository as user/repo, recorded in params.json.
    #[arg(long)]
    github: Option<String>,

    /// Promo content endpoint.
    #[arg(long, default_value = DEFAULT_PROMO_URL)]
    promo_url: String,

    /// Skip the promo content fetch entirely.
    #[arg(long)]
    no_promo: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let epub = find_epub(&args.dir)?;
    log::info!("converting {}", epub.display());

    if !args.dir.join("readium").join("manifest.json").exists() {
        bail!(
            "{} has no readium/manifest.json; extract the EPUB first",
            args.dir.display()
        );
    }

    let promo: Box<dyn PromoSource> = if args.no_promo {
        Box::new(NoPromo)
    } else {
        Box::new(HttpPromoSource::new(args.promo_url))
    };

    let summary = convert_book(&args.dir, args.github.as_deref(), promo.as_ref())
        .with_context(|| format!("converting {}", args.dir.display()))?;

    println!(
        "converted {} chapters, {} resources",
        summary.chapters, summary.resources
    );
    Ok(())
}

/// Locate the source EPUB in the book directory. More than one is tolerated
/// with a warning; the first by name wins so reruns stay deterministic.
fn find_epub(dir: &Path) -> anyhow::Result<PathBuf> {
    let mut epubs: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("reading {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .map(|ext| ext.eq_ignore_ascii_case("epub"))
                .unwrap_or(false)
        })
        .collect();
    epubs.sort();

    match epubs.as_slice() {
        [] => bail!("no .epub file found in {}", dir.display()),
        [single] => Ok(single.clone()),
        [first, ..] => {
            log::warn!(
                "multiple EPUB files in {}, using {}",
                dir.display(),
                first.display()
            );
            Ok(first.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_epub_picks_first_by_sort() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("zeta.epub"), b"").unwrap();
        std::fs::write(dir.path().join("alpha.EPUB"), b"").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let found = find_epub(dir.path()).unwrap();
        assert_eq!(found.file_name().unwrap(), "alpha.EPUB");
    }

    #[test]
    fn test_find_epub_requires_one() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_epub(dir.path()).is_err());
    }
}
