//! Core data models used throughout the timeline.
//!
//! An [`Article`] is produced by a source, tagged by the classifier and
//! persisted into the partition for its publication date.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A unit of news content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// Stable identifier, unique within a partition.
    pub id: String,
    /// Display title. The only field the classifier looks at.
    pub title: String,
    /// Origin URL, unique within a partition.
    pub url: String,
    /// Id of the registered source that produced the article.
    pub source: String,
    /// Publication or ingestion time. Selects the partition and sort order.
    pub timestamp: DateTime<Utc>,
    /// Path of the persisted full content, if any.
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub tags: Option<serde_json::Value>,
    #[serde(default)]
    pub entities: Option<serde_json::Value>,
    /// Legend id assigned by the classifier; `None` means front.
    #[serde(default)]
    pub legend: Option<String>,
}

impl Article {
    /// Build an article whose id is derived from its URL.
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        source: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let url = url.into();
        Self {
            id: derive_article_id(&url),
            title: title.into(),
            url,
            source: source.into(),
            timestamp,
            file_path: None,
            tags: None,
            entities: None,
            legend: None,
        }
    }

    /// Calendar date (UTC) of the partition this article belongs to.
    pub fn partition_date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// Derive a stable article id from a URL: the first 16 hex chars of its
/// SHA-256 digest.
pub fn derive_article_id(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}
