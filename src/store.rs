//! Date-partitioned article storage.
//!
//! Every calendar date gets its own SQLite file,
//! `<dir>/timeline_YYYY-MM-DD.sqlite`, holding a single `articles` table.
//! A [`TimelineStore`] is bound to one date and only ever touches that
//! partition.
//!
//! Each operation opens its own pool and closes it before returning; no
//! connection outlives a call. Concurrent writers to the same partition
//! must be serialized by the caller (see [`crate::ingest::PartitionLocks`]).

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::models::Article;

const PARTITION_PREFIX: &str = "timeline_";
const PARTITION_SUFFIX: &str = ".sqlite";

const CREATE_TABLE: &str = r#"
CREATE TABLE articles (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    url TEXT UNIQUE,
    source TEXT NOT NULL,
    timestamp DATETIME NOT NULL,
    file_path TEXT,
    tags TEXT,
    entities TEXT,
    legend TEXT,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
)
"#;

const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_articles_timestamp ON articles(timestamp)",
    "CREATE INDEX IF NOT EXISTS idx_articles_source ON articles(source)",
    "CREATE INDEX IF NOT EXISTS idx_articles_legend ON articles(legend)",
];

/// Columns introduced after the first schema version, added in place to
/// partitions that predate them.
const ADDED_COLUMNS: &[(&str, &str)] = &[("legend", "TEXT")];

const BASE_COLUMNS: &str = "id, title, url, source, timestamp, file_path, tags, entities";

/// One day's partition of the timeline.
#[derive(Debug, Clone)]
pub struct TimelineStore {
    date: NaiveDate,
    path: PathBuf,
}

impl TimelineStore {
    pub fn new(dir: impl AsRef<Path>, date: NaiveDate) -> Self {
        Self {
            date,
            path: dir.as_ref().join(partition_file_name(date)),
        }
    }

    /// Store for the current UTC date.
    pub fn today(dir: impl AsRef<Path>) -> Self {
        Self::new(dir, Utc::now().date_naive())
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the partition file has been created.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Create the partition, or migrate an existing one to the current
    /// schema. Safe to call on every startup.
    ///
    /// All DDL runs in one transaction: on failure nothing is applied and
    /// the next call retries from the same state.
    pub async fn init(&self) -> Result<(), StoreError> {
        let pool = self.connect().await?;
        let result = apply_schema(&pool).await;
        pool.close().await;

        match result {
            Ok(SchemaChange::Created) => {
                info!(partition = %self.date, "created partition");
                Ok(())
            }
            Ok(SchemaChange::Migrated(columns)) => {
                info!(partition = %self.date, columns = ?columns, "added columns to existing partition");
                Ok(())
            }
            Ok(SchemaChange::Unchanged) => Ok(()),
            Err(source) => Err(StoreError::Migration {
                partition: self.path.display().to_string(),
                source,
            }),
        }
    }

    /// Upsert by `id`. Every column of an existing row with the same id is
    /// overwritten.
    ///
    /// Fails with [`StoreError::DuplicateUrl`] when `url` already belongs to
    /// another id; the stored row is left untouched.
    pub async fn insert(&self, article: &Article) -> Result<(), StoreError> {
        if !self.exists() {
            self.init().await?;
        }

        let tags = article.tags.as_ref().map(serde_json::to_string).transpose()?;
        let entities = article
            .entities
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let pool = self.connect().await?;
        let result = sqlx::query(
            r#"
            INSERT INTO articles (id, title, url, source, timestamp, file_path, tags, entities, legend)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                url = excluded.url,
                source = excluded.source,
                timestamp = excluded.timestamp,
                file_path = excluded.file_path,
                tags = excluded.tags,
                entities = excluded.entities,
                legend = excluded.legend,
                created_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(&article.id)
        .bind(&article.title)
        .bind(&article.url)
        .bind(&article.source)
        .bind(format_timestamp(&article.timestamp))
        .bind(&article.file_path)
        .bind(tags)
        .bind(entities)
        .bind(&article.legend)
        .execute(&pool)
        .await;
        pool.close().await;

        match result {
            Ok(_) => {
                debug!(id = %article.id, partition = %self.date, "stored article");
                Ok(())
            }
            Err(e) if is_url_conflict(&e) => Err(StoreError::DuplicateUrl {
                url: article.url.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get(&self, id: &str) -> Result<Option<Article>, StoreError> {
        if !self.exists() {
            return Ok(None);
        }

        let pool = self.connect().await?;
        let row = async {
            let columns = select_columns(&pool).await?;
            sqlx::query(&format!("SELECT {} FROM articles WHERE id = ?", columns))
                .bind(id)
                .fetch_optional(&pool)
                .await
        }
        .await;
        pool.close().await;

        row?.as_ref().map(row_to_article).transpose()
    }

    /// Articles ordered newest first.
    ///
    /// Ordering is by instant, so rows stored with an offset or a naive
    /// timestamp by older writers sort correctly against RFC 3339 UTC rows.
    pub async fn list(&self, limit: u32, offset: u32) -> Result<Vec<Article>, StoreError> {
        if !self.exists() {
            return Ok(Vec::new());
        }

        let pool = self.connect().await?;
        let rows = async {
            let columns = select_columns(&pool).await?;
            sqlx::query(&format!(
                "SELECT {} FROM articles \
                 ORDER BY julianday(timestamp) DESC, timestamp DESC LIMIT ? OFFSET ?",
                columns
            ))
            .bind(i64::from(limit))
            .bind(i64::from(offset))
            .fetch_all(&pool)
            .await
        }
        .await;
        pool.close().await;

        rows?.iter().map(row_to_article).collect()
    }

    pub async fn exists_by_url(&self, url: &str) -> Result<bool, StoreError> {
        if !self.exists() {
            return Ok(false);
        }

        let pool = self.connect().await?;
        let found: Result<bool, sqlx::Error> =
            sqlx::query_scalar("SELECT COUNT(*) > 0 FROM articles WHERE url = ?")
                .bind(url)
                .fetch_one(&pool)
                .await;
        pool.close().await;

        Ok(found?)
    }

    pub async fn count(&self) -> Result<u64, StoreError> {
        if !self.exists() {
            return Ok(0);
        }

        let pool = self.connect().await?;
        let count: Result<i64, sqlx::Error> = sqlx::query_scalar("SELECT COUNT(*) FROM articles")
            .fetch_one(&pool)
            .await;
        pool.close().await;

        Ok(count?.max(0) as u64)
    }

    /// Delete every row of the partition, returning how many were removed.
    pub async fn clear_all(&self) -> Result<u64, StoreError> {
        if !self.exists() {
            return Ok(0);
        }

        let pool = self.connect().await?;
        let result = sqlx::query("DELETE FROM articles").execute(&pool).await;
        pool.close().await;

        let deleted = result?.rows_affected();
        info!(partition = %self.date, deleted, "cleared partition");
        Ok(deleted)
    }

    async fn connect(&self) -> Result<SqlitePool, StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&self.path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        Ok(pool)
    }
}

/// File name of the partition for `date`. ISO dates sort chronologically.
pub fn partition_file_name(date: NaiveDate) -> String {
    format!("{}{}{}", PARTITION_PREFIX, date.format("%Y-%m-%d"), PARTITION_SUFFIX)
}

/// Dates of all partitions under `dir`, oldest first.
pub fn list_partitions(dir: impl AsRef<Path>) -> Result<Vec<NaiveDate>, StoreError> {
    let dir = dir.as_ref();
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut dates = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let name = entry?.file_name();
        let name = name.to_string_lossy();
        let date = name
            .strip_prefix(PARTITION_PREFIX)
            .and_then(|rest| rest.strip_suffix(PARTITION_SUFFIX))
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
        if let Some(date) = date {
            dates.push(date);
        }
    }

    dates.sort();
    Ok(dates)
}

enum SchemaChange {
    Created,
    Migrated(Vec<&'static str>),
    Unchanged,
}

async fn apply_schema(pool: &SqlitePool) -> Result<SchemaChange, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let table_exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='articles'",
    )
    .fetch_one(&mut *tx)
    .await?;

    let change = if table_exists {
        let columns: Vec<String> =
            sqlx::query_scalar("SELECT name FROM pragma_table_info('articles')")
                .fetch_all(&mut *tx)
                .await?;

        let mut added = Vec::new();
        for (name, column_type) in ADDED_COLUMNS {
            if columns.iter().any(|c| c == name) {
                continue;
            }
            let ddl = format!("ALTER TABLE articles ADD COLUMN {} {}", name, column_type);
            sqlx::query(&ddl).execute(&mut *tx).await?;
            added.push(*name);
        }

        if added.is_empty() {
            SchemaChange::Unchanged
        } else {
            SchemaChange::Migrated(added)
        }
    } else {
        sqlx::query(CREATE_TABLE).execute(&mut *tx).await?;
        SchemaChange::Created
    };

    for ddl in CREATE_INDEXES {
        sqlx::query(ddl).execute(&mut *tx).await?;
    }

    tx.commit().await?;
    Ok(change)
}

/// Select list for reads. Columns a partition predates read as NULL, so
/// partitions that were never migrated stay readable.
async fn select_columns(pool: &SqlitePool) -> Result<String, sqlx::Error> {
    let present: Vec<String> = sqlx::query_scalar("SELECT name FROM pragma_table_info('articles')")
        .fetch_all(pool)
        .await?;

    let mut columns = BASE_COLUMNS.to_string();
    for (name, _) in ADDED_COLUMNS {
        if present.iter().any(|c| c == name) {
            columns.push_str(&format!(", {}", name));
        } else {
            columns.push_str(&format!(", NULL AS {}", name));
        }
    }
    Ok(columns)
}

fn is_url_conflict(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.is_unique_violation() && db_err.message().contains("articles.url")
        }
        _ => false,
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp. Rows written before timestamps were
/// normalized may carry naive ISO strings; those are read as UTC.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| StoreError::InvalidTimestamp(raw.to_string()))
}

fn row_to_article(row: &SqliteRow) -> Result<Article, StoreError> {
    let timestamp: String = row.try_get("timestamp")?;
    let tags: Option<String> = row.try_get("tags")?;
    let entities: Option<String> = row.try_get("entities")?;

    Ok(Article {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        url: row.try_get::<Option<String>, _>("url")?.unwrap_or_default(),
        source: row.try_get("source")?,
        timestamp: parse_timestamp(&timestamp)?,
        file_path: row.try_get("file_path")?,
        tags: tags.as_deref().map(serde_json::from_str).transpose()?,
        entities: entities.as_deref().map(serde_json::from_str).transpose()?,
        legend: row.try_get("legend")?,
    })
}
