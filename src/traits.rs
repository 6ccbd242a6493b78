//! Source trait and registry.
//!
//! Every news source is an implementation of [`NewsSource`] registered
//! under its id in a [`SourceRegistry`]. The ingest pipeline resolves
//! source ids through the registry; an id nobody registered fails with
//! [`SourceError::UnknownSource`].
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │            SourceRegistry            │
//! │  ┌──────────────┐ ┌───────────────┐  │
//! │  │  Built-in    │ │  Custom       │  │
//! │  │  JSON files  │ │  (Rust)       │  │
//! │  └──────────────┘ └───────────────┘  │
//! └──────────────────┬───────────────────┘
//!                    ▼
//!        Pipeline::run() → classify → store
//! ```
//!
//! # Usage
//!
//! ```rust
//! use news_timeline::traits::SourceRegistry;
//!
//! let mut sources = SourceRegistry::new();
//! // sources.register(Box::new(MySource::new()));
//! assert!(sources.is_empty());
//! ```

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::config::Config;
use crate::error::SourceError;
use crate::models::Article;

/// A news source producing candidate articles.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use anyhow::Result;
/// use chrono::Utc;
/// use news_timeline::models::Article;
/// use news_timeline::traits::NewsSource;
///
/// pub struct WireSource;
///
/// #[async_trait]
/// impl NewsSource for WireSource {
///     fn id(&self) -> &str { "wire" }
///     fn description(&self) -> &str { "Static wire headlines" }
///
///     async fn fetch(&self, limit: usize) -> Result<Vec<Article>> {
///         let mut items = vec![Article::new("马斯克宣布星舰最新发射计划", "https://wire/1", "wire", Utc::now())];
///         items.truncate(limit);
///         Ok(items)
///     }
/// }
/// ```
#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Source identifier. Stored in [`Article::source`].
    fn id(&self) -> &str;

    /// One-line description, shown by `timeline sources`.
    fn description(&self) -> &str;

    /// Type label shown next to the id. Defaults to `"custom"`.
    fn kind(&self) -> &str {
        "custom"
    }

    /// Fetch at most `limit` candidate articles.
    async fn fetch(&self, limit: usize) -> Result<Vec<Article>>;

    /// Full content of an article, if the source can provide it.
    async fn fetch_content(&self, _article: &Article) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Registry of sources keyed by id.
///
/// Sources are held behind `Arc` so the ingest pipeline can hand each one
/// to its own fetch task.
pub struct SourceRegistry {
    sources: Vec<Arc<dyn NewsSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Registry pre-loaded with every source declared in the config.
    pub fn from_config(config: &Config) -> Self {
        use crate::source_json::JsonFileSource;

        let mut registry = Self::new();
        for (id, cfg) in &config.sources {
            // kinds are validated by load_config
            if cfg.kind == "json" {
                registry.register(Box::new(JsonFileSource::new(id.clone(), cfg.clone())));
            }
        }
        registry
    }

    /// Register a source. A later registration with the same id replaces
    /// the earlier one.
    pub fn register(&mut self, source: Box<dyn NewsSource>) {
        let source: Arc<dyn NewsSource> = Arc::from(source);
        self.sources.retain(|s| s.id() != source.id());
        self.sources.push(source);
    }

    /// Look up a source by id.
    pub fn get(&self, id: &str) -> Result<Arc<dyn NewsSource>, SourceError> {
        self.sources
            .iter()
            .find(|s| s.id() == id)
            .cloned()
            .ok_or_else(|| SourceError::UnknownSource {
                id: id.to_string(),
                registered: self.ids().join(", "),
            })
    }

    pub fn sources(&self) -> &[Arc<dyn NewsSource>] {
        &self.sources
    }

    pub fn ids(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.id()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
