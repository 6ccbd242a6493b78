//! Error kinds callers are expected to match on.
//!
//! Application flows (config, pipeline, CLI) use `anyhow`; the store and
//! the source registry expose these typed errors instead.

use thiserror::Error;

/// Failures of [`TimelineStore`](crate::store::TimelineStore) operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The `url` is already stored under a different article id.
    #[error("url already stored under another id: {url}")]
    DuplicateUrl { url: String },

    /// Schema creation or migration failed; the partition was left as it was.
    #[error("schema migration failed for {partition}: {source}")]
    Migration {
        partition: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("invalid timestamp in stored row: {0}")]
    InvalidTimestamp(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_duplicate_url(&self) -> bool {
        matches!(self, StoreError::DuplicateUrl { .. })
    }
}

/// Failures resolving a source id through the registry.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("unknown source: '{id}' (registered: {registered})")]
    UnknownSource { id: String, registered: String },
}
