//! CLI commands for inspecting the keyword document: `timeline keywords`
//! and `timeline classify`.

use anyhow::{bail, Result};

use crate::classify::{classify_title, Outcome};
use crate::config::Config;
use crate::keywords::KeywordIndex;

/// Print legend/front keyword counts and the original keywords.
///
/// With `check`, a document that fails to load or has no keywords is an
/// error instead of an empty index.
pub fn run_keywords(config: &Config, check: bool) -> Result<()> {
    let path = &config.keywords.path;
    let index = if check {
        let index = KeywordIndex::load(path)?;
        if index.is_empty() {
            bail!("{} contains no keywords; every title would be rejected", path.display());
        }
        index
    } else {
        KeywordIndex::build(path)
    };

    println!("Keywords: {}", path.display());
    println!();
    println!("  Legend keywords: {}", index.legend_keyword_count());
    println!("  Front keywords:  {}", index.front_keyword_count());
    println!();

    for id in index.legend_ids() {
        let keywords = index.original_legend(id).unwrap_or_default();
        println!("  [{}] {}", id, keywords.join(", "));
    }
    if !index.original_front().is_empty() {
        println!("  [front] {}", index.original_front().join(", "));
    }

    if check {
        println!();
        println!("ok");
    }
    Ok(())
}

pub fn run_classify(config: &Config, title: &str) -> Result<()> {
    let index = KeywordIndex::build(&config.keywords.path);
    match classify_title(title, &index) {
        Outcome::Legend(id) => println!("legend {}", id),
        Outcome::Front => println!("front"),
        Outcome::Rejected => println!("rejected"),
    }
    Ok(())
}
