//! Administrative reset of one day's data.
//!
//! Removes the day's content files, empties its timeline partition and
//! clears the dedup cache so the next ingest cycle sees every URL again.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::config::Config;
use crate::content::ArticleFiles;
use crate::dedup::DedupCache;
use crate::store::TimelineStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResetReport {
    pub date: NaiveDate,
    /// Markdown files removed from the day's content directory.
    pub deleted_files: usize,
    /// Rows removed from the partition (0 if it did not exist).
    pub deleted_rows: u64,
    pub cache_before: usize,
    pub cache_after: usize,
}

/// Reset everything stored for `date`.
///
/// A partition file that does not exist is left absent.
pub async fn reset_day(config: &Config, date: NaiveDate, cache: &DedupCache) -> Result<ResetReport> {
    let deleted_files = match &config.content {
        Some(content) => ArticleFiles::new(content.dir.clone())
            .clear_day(date)
            .with_context(|| format!("Failed to clear content files for {}", date))?,
        None => 0,
    };

    let store = TimelineStore::new(&config.store.dir, date);
    let deleted_rows = if store.exists() {
        store
            .clear_all()
            .await
            .with_context(|| format!("Failed to clear partition {}", store.path().display()))?
    } else {
        0
    };

    let cache_before = cache.size();
    info!(size = cache_before, "dedup cache before reset");
    cache.clear();
    let cache_after = cache.size();
    info!(size = cache_after, "dedup cache after reset");

    info!(%date, deleted_files, deleted_rows, "day reset");

    Ok(ResetReport {
        date,
        deleted_files,
        deleted_rows,
        cache_before,
        cache_after,
    })
}

/// CLI entry point for `timeline reset`.
pub async fn run_reset(config: &Config, date: NaiveDate) -> Result<()> {
    // The dedup cache lives in a running pipeline; this process has its own.
    let cache = DedupCache::new();
    let report = reset_day(config, date, &cache).await?;

    println!("reset {}", report.date);
    println!("  deleted files: {}", report.deleted_files);
    println!("  deleted rows:  {}", report.deleted_rows);
    println!(
        "  cache (this process): {} -> {}",
        report.cache_before, report.cache_after
    );
    println!("ok");
    Ok(())
}
