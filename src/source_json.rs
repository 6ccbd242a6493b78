//! Built-in source reading articles from a local JSON file.
//!
//! The file holds an array of records:
//!
//! ```json
//! [
//!   { "title": "马斯克宣布星舰最新发射计划", "url": "https://example.com/a",
//!     "timestamp": "2026-01-05T08:00:00Z", "content": "..." }
//! ]
//! ```
//!
//! `id` defaults to a hash of the URL and `timestamp` to the time of the
//! fetch. Records with an empty title or URL are skipped.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use tracing::warn;

use crate::config::SourceConfig;
use crate::models::{derive_article_id, Article};
use crate::traits::NewsSource;

#[derive(Debug, Deserialize)]
struct FeedRecord {
    #[serde(default)]
    id: Option<String>,
    title: String,
    url: String,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    tags: Option<serde_json::Value>,
    #[serde(default)]
    entities: Option<serde_json::Value>,
    #[serde(default)]
    content: Option<String>,
}

pub struct JsonFileSource {
    id: String,
    description: String,
    config: SourceConfig,
    /// Inline content of the last `fetch`, keyed by URL.
    contents: Mutex<HashMap<String, String>>,
}

impl JsonFileSource {
    pub fn new(id: String, config: SourceConfig) -> Self {
        let description = config
            .description
            .clone()
            .unwrap_or_else(|| format!("JSON feed file {}", config.path.display()));
        Self {
            id,
            description,
            config,
            contents: Mutex::new(HashMap::new()),
        }
    }

    async fn read_records(&self) -> Result<Vec<FeedRecord>> {
        read_feed_file(&self.config.path).await
    }

    fn to_article(&self, mut record: FeedRecord, fetched_at: DateTime<Utc>) -> Article {
        if let Some(content) = record.content.take() {
            self.contents
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(record.url.clone(), content);
        }
        Article {
            id: record
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| derive_article_id(&record.url)),
            title: record.title,
            url: record.url,
            source: self.id.clone(),
            timestamp: record.timestamp.unwrap_or(fetched_at),
            file_path: None,
            tags: record.tags,
            entities: record.entities,
            legend: None,
        }
    }
}

#[async_trait]
impl NewsSource for JsonFileSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn kind(&self) -> &str {
        "json"
    }

    async fn fetch(&self, limit: usize) -> Result<Vec<Article>> {
        let now = Utc::now();
        let mut articles = Vec::new();
        self.contents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();

        for record in self.read_records().await? {
            if articles.len() >= limit {
                break;
            }
            if record.title.trim().is_empty() || record.url.trim().is_empty() {
                warn!(source = %self.id, url = %record.url, "skipping record without title or url");
                continue;
            }
            articles.push(self.to_article(record, now));
        }

        Ok(articles)
    }

    async fn fetch_content(&self, article: &Article) -> Result<Option<String>> {
        Ok(self
            .contents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&article.url)
            .cloned())
    }
}

async fn read_feed_file(path: &Path) -> Result<Vec<FeedRecord>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read feed file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse feed file: {}", path.display()))
}
