//! Ingestion pipeline orchestration.
//!
//! Coordinates one ingest cycle: sources → dedup cache → classifier →
//! timeline partitions. Every source is fetched in its own task; batches
//! share only the keyword index, the dedup cache and the partition locks.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::classify::{classify_batch, Classification, ClassifyStats};
use crate::config::Config;
use crate::content::ArticleFiles;
use crate::dedup::DedupCache;
use crate::error::StoreError;
use crate::keywords::LazyKeywordIndex;
use crate::models::Article;
use crate::store::TimelineStore;
use crate::traits::{NewsSource, SourceRegistry};

/// Write serialization for partitions.
///
/// The store opens a connection per call and does not serialize writers
/// itself, so every write to a partition goes through that partition's
/// async mutex. The first write of the process to a partition also runs
/// `init()` so older partitions are migrated before rows land in them.
#[derive(Default)]
pub struct PartitionLocks {
    locks: Mutex<HashMap<NaiveDate, Arc<tokio::sync::Mutex<()>>>>,
    initialized: Mutex<HashSet<NaiveDate>>,
}

impl PartitionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock_for(&self, date: NaiveDate) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(date)
            .or_default()
            .clone()
    }

    /// Insert `article` into `store` while holding the partition lock.
    pub async fn insert(&self, store: &TimelineStore, article: &Article) -> Result<(), StoreError> {
        let lock = self.lock_for(store.date());
        let _guard = lock.lock().await;

        if !self.is_initialized(store.date()) {
            store.init().await?;
            self.initialized
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(store.date());
        }

        store.insert(article).await
    }

    fn is_initialized(&self, date: NaiveDate) -> bool {
        self.initialized
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&date)
    }
}

/// Outcome of ingesting one source's batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SourceReport {
    pub source: String,
    pub fetched: usize,
    /// Dropped because the dedup cache had already seen the URL.
    pub skipped_cached: usize,
    pub stats: ClassifyStats,
    pub inserted: usize,
    /// Accepted but already stored (by URL).
    pub skipped_existing: usize,
    pub content_files: usize,
}

/// Outcome of one ingest cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    /// Per-source reports, sorted by source id.
    pub sources: Vec<SourceReport>,
    /// `(source id, error)` for sources whose batch failed.
    pub failed_sources: Vec<(String, String)>,
}

impl IngestReport {
    pub fn fetched(&self) -> usize {
        self.sources.iter().map(|s| s.fetched).sum()
    }

    pub fn skipped_cached(&self) -> usize {
        self.sources.iter().map(|s| s.skipped_cached).sum()
    }

    pub fn inserted(&self) -> usize {
        self.sources.iter().map(|s| s.inserted).sum()
    }

    pub fn skipped_existing(&self) -> usize {
        self.sources.iter().map(|s| s.skipped_existing).sum()
    }

    /// Classification counters of all batches combined.
    pub fn stats(&self) -> ClassifyStats {
        let mut total = ClassifyStats::default();
        for source in &self.sources {
            total.merge(&source.stats);
        }
        total
    }
}

/// Shared state handed to every fetch task.
#[derive(Clone)]
struct Worker {
    config: Arc<Config>,
    keywords: Arc<LazyKeywordIndex>,
    cache: Arc<DedupCache>,
    partitions: Arc<PartitionLocks>,
}

/// The ingest pipeline: registry plus the process-wide keyword index,
/// dedup cache and partition locks.
pub struct Pipeline {
    registry: SourceRegistry,
    worker: Worker,
}

impl Pipeline {
    pub fn new(config: Config, registry: SourceRegistry) -> Self {
        let keywords = Arc::new(LazyKeywordIndex::new(config.keywords.path.clone()));
        Self {
            registry,
            worker: Worker {
                config: Arc::new(config),
                keywords,
                cache: Arc::new(DedupCache::new()),
                partitions: Arc::new(PartitionLocks::new()),
            },
        }
    }

    /// Use an existing keyword index (e.g. one built eagerly at startup).
    pub fn with_keywords(mut self, keywords: Arc<LazyKeywordIndex>) -> Self {
        self.worker.keywords = keywords;
        self
    }

    /// Use an existing dedup cache (e.g. one shared with the admin reset).
    pub fn with_cache(mut self, cache: Arc<DedupCache>) -> Self {
        self.worker.cache = cache;
        self
    }

    pub fn config(&self) -> &Config {
        &self.worker.config
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn keywords(&self) -> &Arc<LazyKeywordIndex> {
        &self.worker.keywords
    }

    pub fn cache(&self) -> &Arc<DedupCache> {
        &self.worker.cache
    }

    pub fn partitions(&self) -> &Arc<PartitionLocks> {
        &self.worker.partitions
    }

    /// Run one ingest cycle over the selected sources.
    ///
    /// `selectors` are source ids; an empty list or `"all"` selects every
    /// registered source. Unknown ids fail before anything is fetched.
    /// `limit` overrides `crawler.news_batch_limit`.
    pub async fn run(&self, selectors: &[String], limit: Option<usize>) -> Result<IngestReport> {
        let sources = self.resolve(selectors)?;
        let limit = limit.unwrap_or(self.worker.config.crawler.news_batch_limit);

        info!(sources = sources.len(), limit, "starting ingest cycle");

        let mut tasks = JoinSet::new();
        for source in sources {
            let worker = self.worker.clone();
            tasks.spawn(async move {
                let id = source.id().to_string();
                let result = worker.ingest_source(source, limit).await;
                (id, result)
            });
        }

        let mut report = IngestReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(source_report))) => report.sources.push(source_report),
                Ok((id, Err(e))) => {
                    warn!(source = %id, error = %format!("{:#}", e), "source failed");
                    report.failed_sources.push((id, format!("{:#}", e)));
                }
                Err(e) => {
                    error!(error = %e, "fetch task aborted");
                    report.failed_sources.push(("<task>".to_string(), e.to_string()));
                }
            }
        }

        report.sources.sort_by(|a, b| a.source.cmp(&b.source));
        report.failed_sources.sort();

        info!(
            fetched = report.fetched(),
            skipped_cached = report.skipped_cached(),
            inserted = report.inserted(),
            skipped_existing = report.skipped_existing(),
            failed = report.failed_sources.len(),
            "ingest cycle finished"
        );

        Ok(report)
    }

    fn resolve(&self, selectors: &[String]) -> Result<Vec<Arc<dyn NewsSource>>> {
        if selectors.is_empty() || selectors.iter().any(|s| s == "all") {
            return Ok(self.registry.sources().to_vec());
        }

        let mut resolved: Vec<Arc<dyn NewsSource>> = Vec::new();
        for id in selectors {
            let source = self.registry.get(id)?;
            if !resolved.iter().any(|s| s.id() == source.id()) {
                resolved.push(source);
            }
        }
        Ok(resolved)
    }
}

impl Worker {
    async fn ingest_source(&self, source: Arc<dyn NewsSource>, limit: usize) -> Result<SourceReport> {
        let id = source.id().to_string();
        let mut articles = source
            .fetch(limit)
            .await
            .with_context(|| format!("fetch from '{}' failed", id))?;
        let fetched = articles.len();

        for article in &mut articles {
            article.source = id.clone();
        }
        articles.retain(|a| self.cache.check_and_add(&a.url));
        let skipped_cached = fetched - articles.len();

        let index = self.keywords.get();
        let Classification { accepted, stats } = classify_batch(articles, &index);

        let mut report = SourceReport {
            source: id.clone(),
            fetched,
            skipped_cached,
            stats,
            ..Default::default()
        };

        let files = self
            .config
            .content
            .as_ref()
            .filter(|c| c.fetch)
            .map(|c| ArticleFiles::new(c.dir.clone()));

        let mut pending = accepted.into_iter();
        while let Some(article) = pending.next() {
            let url = article.url.clone();
            if let Err(e) = self.store_article(source.as_ref(), files.as_ref(), article, &mut report).await {
                // Unstored articles must be picked up again by a later cycle.
                self.cache.remove(&url);
                for rest in pending {
                    self.cache.remove(&rest.url);
                }
                return Err(e).with_context(|| format!("storing '{}' from '{}' failed", url, id));
            }
        }

        info!(
            source = %id,
            fetched,
            skipped_cached,
            inserted = report.inserted,
            skipped_existing = report.skipped_existing,
            "source ingested"
        );
        Ok(report)
    }

    async fn store_article(
        &self,
        source: &dyn NewsSource,
        files: Option<&ArticleFiles>,
        mut article: Article,
        report: &mut SourceReport,
    ) -> Result<(), StoreError> {
        let store = TimelineStore::new(&self.config.store.dir, article.partition_date());
        if store.exists_by_url(&article.url).await? {
            report.skipped_existing += 1;
            return Ok(());
        }

        if let Some(files) = files {
            if attach_content(source, files, &mut article).await {
                report.content_files += 1;
            }
        }

        match self.partitions.insert(&store, &article).await {
            Ok(()) => report.inserted += 1,
            Err(e) if e.is_duplicate_url() => report.skipped_existing += 1,
            Err(e) => return Err(e),
        }
        Ok(())
    }
}

/// Fetch and persist full content. Failures are logged and leave
/// `file_path` unset.
async fn attach_content(source: &dyn NewsSource, files: &ArticleFiles, article: &mut Article) -> bool {
    let content = match source.fetch_content(article).await {
        Ok(Some(content)) => content,
        Ok(None) => return false,
        Err(e) => {
            warn!(url = %article.url, error = %format!("{:#}", e), "content fetch failed");
            return false;
        }
    };

    match files.write(article, &content) {
        Ok(path) => {
            article.file_path = Some(path.display().to_string());
            true
        }
        Err(e) => {
            warn!(url = %article.url, error = %format!("{:#}", e), "content write failed");
            false
        }
    }
}

/// CLI entry point: run one ingest cycle and print the report.
pub async fn run_sync(config: &Config, selectors: &[String], limit: Option<usize>) -> Result<()> {
    let registry = SourceRegistry::from_config(config);
    let pipeline = Pipeline::new(config.clone(), registry);
    let report = pipeline.run(selectors, limit).await?;
    let stats = report.stats();

    println!("sync {}", if selectors.is_empty() { "all".to_string() } else { selectors.join(" ") });
    println!("  fetched: {}", report.fetched());
    println!("  skipped (cached): {}", report.skipped_cached());
    for (legend, hits) in &stats.legend_hits {
        println!("  legend {}: {}", legend, hits);
    }
    println!("  front: {}", stats.front_hits);
    println!("  rejected: {}", stats.rejected);
    println!("  inserted: {}", report.inserted());
    println!("  skipped (existing): {}", report.skipped_existing());
    for (source, err) in &report.failed_sources {
        println!("  failed {}: {}", source, err);
    }

    if report.failed_sources.is_empty() {
        println!("ok");
    } else {
        anyhow::bail!("{} source(s) failed", report.failed_sources.len());
    }
    Ok(())
}
