//! Integration tests for daily timeline partitions.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use news_timeline::error::StoreError;
use news_timeline::models::Article;
use news_timeline::store::{list_partitions, TimelineStore};
use serde_json::json;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tempfile::TempDir;

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
}

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 5, hour, minute, 0).unwrap()
}

fn article(id: &str, url: &str, ts: DateTime<Utc>) -> Article {
    let mut article = Article::new(format!("headline {}", id), url, "test", ts);
    article.id = id.to_string();
    article
}

/// Open a partition file directly, bypassing `init()`.
async fn raw_pool(store: &TimelineStore) -> SqlitePool {
    let options = SqliteConnectOptions::new()
        .filename(store.path())
        .create_if_missing(true);
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap()
}

const LEGACY_TABLE: &str = r#"
CREATE TABLE articles (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    url TEXT UNIQUE,
    source TEXT NOT NULL,
    timestamp DATETIME NOT NULL,
    file_path TEXT,
    tags TEXT,
    entities TEXT,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
)
"#;

async fn column_names(pool: &SqlitePool) -> Vec<String> {
    sqlx::query_scalar("SELECT name FROM pragma_table_info('articles')")
        .fetch_all(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_round_trip_preserves_fields() {
    let tmp = TempDir::new().unwrap();
    let store = TimelineStore::new(tmp.path(), day());
    store.init().await.unwrap();

    let mut full = article("a1", "https://x/a1", at(8, 0));
    full.title = "马斯克宣布星舰最新发射计划".to_string();
    full.legend = Some("musk".to_string());
    full.file_path = Some("data/articles/2026/01/05/a1.md".to_string());
    full.tags = Some(json!(["space", "tesla"]));
    full.entities = Some(json!({"person": ["Elon Musk"]}));
    store.insert(&full).await.unwrap();

    let front = article("a2", "https://x/a2", at(9, 0));
    store.insert(&front).await.unwrap();

    assert_eq!(store.get("a1").await.unwrap(), Some(full));
    let stored_front = store.get("a2").await.unwrap().unwrap();
    assert_eq!(stored_front.legend, None);
    assert_eq!(stored_front, front);
    assert_eq!(store.get("missing").await.unwrap(), None);
}

#[tokio::test]
async fn test_init_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let store = TimelineStore::new(tmp.path(), day());

    store.init().await.unwrap();
    store.insert(&article("a1", "https://x/a1", at(8, 0))).await.unwrap();
    store.init().await.unwrap();
    store.init().await.unwrap();

    assert_eq!(store.count().await.unwrap(), 1);
    assert!(store.path().ends_with("timeline_2026-01-05.sqlite"));
}

#[tokio::test]
async fn test_init_adds_legend_to_old_partition() {
    let tmp = TempDir::new().unwrap();
    let store = TimelineStore::new(tmp.path(), day());

    // A partition written before the legend column existed.
    let pool = raw_pool(&store).await;
    sqlx::query(LEGACY_TABLE).execute(&pool).await.unwrap();
    sqlx::query(
        "INSERT INTO articles (id, title, url, source, timestamp, tags) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind("old")
    .bind("日经225指数低开0.2%")
    .bind("https://x/old")
    .bind("legacy")
    .bind("2026-01-05T07:15:00")
    .bind(r#"["markets"]"#)
    .execute(&pool)
    .await
    .unwrap();
    pool.close().await;

    store.init().await.unwrap();

    let old = store.get("old").await.unwrap().unwrap();
    assert_eq!(old.title, "日经225指数低开0.2%");
    assert_eq!(old.source, "legacy");
    assert_eq!(old.timestamp, at(7, 15));
    assert_eq!(old.tags, Some(json!(["markets"])));
    assert_eq!(old.legend, None);

    let mut new = article("new", "https://x/new", at(9, 0));
    new.legend = Some("musk".to_string());
    store.insert(&new).await.unwrap();
    assert_eq!(store.get("new").await.unwrap(), Some(new));

    // A second init finds nothing left to add.
    store.init().await.unwrap();
    assert_eq!(store.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_duplicate_url_under_new_id_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let store = TimelineStore::new(tmp.path(), day());
    store.init().await.unwrap();

    let first = article("a1", "https://x/same", at(8, 0));
    store.insert(&first).await.unwrap();

    let err = store
        .insert(&article("a2", "https://x/same", at(9, 0)))
        .await
        .unwrap_err();
    assert!(err.is_duplicate_url());
    assert!(matches!(err, StoreError::DuplicateUrl { ref url } if url == "https://x/same"));

    assert_eq!(store.get("a1").await.unwrap(), Some(first));
    assert_eq!(store.get("a2").await.unwrap(), None);
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_insert_same_id_overwrites() {
    let tmp = TempDir::new().unwrap();
    let store = TimelineStore::new(tmp.path(), day());

    let mut a = article("a1", "https://x/a1", at(8, 0));
    store.insert(&a).await.unwrap();
    a.title = "updated".to_string();
    a.legend = Some("huang".to_string());
    store.insert(&a).await.unwrap();

    assert_eq!(store.count().await.unwrap(), 1);
    assert_eq!(store.get("a1").await.unwrap(), Some(a));
}

#[tokio::test]
async fn test_clear_all_returns_exact_count() {
    let tmp = TempDir::new().unwrap();
    let store = TimelineStore::new(tmp.path(), day());
    store.init().await.unwrap();

    for i in 0..7 {
        store
            .insert(&article(&format!("a{}", i), &format!("https://x/{}", i), at(8, i)))
            .await
            .unwrap();
    }

    assert_eq!(store.clear_all().await.unwrap(), 7);
    assert!(store.list(100, 0).await.unwrap().is_empty());
    assert_eq!(store.clear_all().await.unwrap(), 0);
}

#[tokio::test]
async fn test_list_is_newest_first_and_paginates() {
    let tmp = TempDir::new().unwrap();
    let store = TimelineStore::new(tmp.path(), day());

    store.insert(&article("mid", "https://x/mid", at(12, 0))).await.unwrap();
    store.insert(&article("early", "https://x/early", at(6, 0))).await.unwrap();
    store.insert(&article("late", "https://x/late", at(20, 0))).await.unwrap();

    let ids = |articles: Vec<Article>| articles.into_iter().map(|a| a.id).collect::<Vec<_>>();

    assert_eq!(ids(store.list(10, 0).await.unwrap()), vec!["late", "mid", "early"]);
    assert_eq!(ids(store.list(1, 1).await.unwrap()), vec!["mid"]);
    assert!(store.list(10, 3).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_exists_by_url() {
    let tmp = TempDir::new().unwrap();
    let store = TimelineStore::new(tmp.path(), day());
    store.insert(&article("a1", "https://x/a1", at(8, 0))).await.unwrap();

    assert!(store.exists_by_url("https://x/a1").await.unwrap());
    assert!(!store.exists_by_url("https://x/other").await.unwrap());
}

#[tokio::test]
async fn test_reads_do_not_create_partition() {
    let tmp = TempDir::new().unwrap();
    let store = TimelineStore::new(tmp.path(), day());

    assert_eq!(store.get("a1").await.unwrap(), None);
    assert!(store.list(10, 0).await.unwrap().is_empty());
    assert!(!store.exists_by_url("https://x/a1").await.unwrap());
    assert_eq!(store.count().await.unwrap(), 0);
    assert_eq!(store.clear_all().await.unwrap(), 0);

    assert!(!store.exists());
    assert!(list_partitions(tmp.path()).unwrap().is_empty());
}

#[tokio::test]
async fn test_partitions_are_independent() {
    let tmp = TempDir::new().unwrap();
    let first = TimelineStore::new(tmp.path(), day());
    let second = TimelineStore::new(tmp.path(), day().succ_opt().unwrap());

    first.insert(&article("a1", "https://x/a1", at(8, 0))).await.unwrap();
    second.insert(&article("a1", "https://x/a1", at(8, 0))).await.unwrap();

    assert_eq!(first.clear_all().await.unwrap(), 1);
    assert_eq!(second.count().await.unwrap(), 1);
    assert_eq!(
        list_partitions(tmp.path()).unwrap(),
        vec![day(), day().succ_opt().unwrap()]
    );
}

#[tokio::test]
async fn test_old_partition_is_readable_without_init() {
    let tmp = TempDir::new().unwrap();
    let store = TimelineStore::new(tmp.path(), day());

    let pool = raw_pool(&store).await;
    sqlx::query(LEGACY_TABLE).execute(&pool).await.unwrap();
    sqlx::query("INSERT INTO articles (id, title, url, source, timestamp) VALUES (?, ?, ?, ?, ?)")
        .bind("old")
        .bind("黄仁勋谈AI芯片")
        .bind("https://x/old")
        .bind("legacy")
        .bind("2026-01-05T07:15:00")
        .execute(&pool)
        .await
        .unwrap();
    pool.close().await;

    let listed = store.list(10, 0).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].legend, None);

    let old = store.get("old").await.unwrap().unwrap();
    assert_eq!(old.title, "黄仁勋谈AI芯片");
    assert_eq!(old.legend, None);
    assert!(store.exists_by_url("https://x/old").await.unwrap());
    assert_eq!(store.count().await.unwrap(), 1);

    // Reading does not migrate.
    let pool = raw_pool(&store).await;
    assert!(!column_names(&pool).await.iter().any(|c| c == "legend"));
    pool.close().await;
}

#[tokio::test]
async fn test_failed_migration_leaves_partition_untouched() {
    let tmp = TempDir::new().unwrap();
    let store = TimelineStore::new(tmp.path(), day());

    // No `source` column: adding `legend` succeeds, indexing `source` fails.
    let pool = raw_pool(&store).await;
    sqlx::query("CREATE TABLE articles (id TEXT PRIMARY KEY, title TEXT NOT NULL, url TEXT UNIQUE, timestamp DATETIME NOT NULL)")
        .execute(&pool)
        .await
        .unwrap();
    pool.close().await;

    let err = store.init().await.unwrap_err();
    assert!(matches!(err, StoreError::Migration { .. }), "unexpected error: {}", err);

    let pool = raw_pool(&store).await;
    assert_eq!(column_names(&pool).await, vec!["id", "title", "url", "timestamp"]);
    let indexes: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name LIKE 'idx_articles_%'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(indexes, 0);
    pool.close().await;

    // The failure is repeatable, not a half-applied state.
    assert!(store.init().await.is_err());
}

#[tokio::test]
async fn test_list_orders_mixed_timestamp_formats_by_instant() {
    let tmp = TempDir::new().unwrap();
    let store = TimelineStore::new(tmp.path(), day());
    store.init().await.unwrap();

    // 10:00 at +08:00 is 02:00 UTC.
    let pool = raw_pool(&store).await;
    for (id, ts) in [("offset", "2026-01-05T10:00:00+08:00"), ("naive", "2026-01-05 04:00:00")] {
        sqlx::query("INSERT INTO articles (id, title, url, source, timestamp) VALUES (?, ?, ?, ?, ?)")
            .bind(id)
            .bind(id)
            .bind(format!("https://x/{}", id))
            .bind("legacy")
            .bind(ts)
            .execute(&pool)
            .await
            .unwrap();
    }
    pool.close().await;

    store.insert(&article("utc", "https://x/utc", at(3, 0))).await.unwrap();

    let ids: Vec<String> = store.list(10, 0).await.unwrap().into_iter().map(|a| a.id).collect();
    assert_eq!(ids, vec!["naive", "utc", "offset"]);
}
