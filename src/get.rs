//! Article retrieval for the `timeline get` and `timeline list` commands.

use anyhow::{bail, Result};
use chrono::{NaiveDate, Utc};

use crate::config::Config;
use crate::models::Article;
use crate::store::{list_partitions, TimelineStore};

/// Look up an article by id.
///
/// With a date only that partition is searched; otherwise every partition
/// is searched, newest first.
pub async fn find_article(config: &Config, id: &str, date: Option<NaiveDate>) -> Result<Option<Article>> {
    let dates = match date {
        Some(date) => vec![date],
        None => {
            let mut dates = list_partitions(&config.store.dir)?;
            dates.reverse();
            dates
        }
    };

    for date in dates {
        if let Some(article) = TimelineStore::new(&config.store.dir, date).get(id).await? {
            return Ok(Some(article));
        }
    }
    Ok(None)
}

pub async fn run_get(config: &Config, id: &str, date: Option<NaiveDate>, json: bool) -> Result<()> {
    let Some(article) = find_article(config, id, date).await? else {
        bail!("article not found: {}", id);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&article)?);
        return Ok(());
    }

    println!("--- Article ---");
    println!("id:        {}", article.id);
    println!("title:     {}", article.title);
    println!("url:       {}", article.url);
    println!("source:    {}", article.source);
    println!("timestamp: {}", article.timestamp.to_rfc3339());
    println!("legend:    {}", article.legend.as_deref().unwrap_or("(front)"));
    if let Some(ref path) = article.file_path {
        println!("file:      {}", path);
    }
    if let Some(ref tags) = article.tags {
        println!("tags:      {}", tags);
    }
    if let Some(ref entities) = article.entities {
        println!("entities:  {}", entities);
    }

    Ok(())
}

/// Print one page of a partition, newest first.
pub async fn run_list(
    config: &Config,
    date: Option<NaiveDate>,
    limit: u32,
    offset: u32,
    json: bool,
) -> Result<()> {
    let date = date.unwrap_or_else(|| Utc::now().date_naive());
    let articles = TimelineStore::new(&config.store.dir, date)
        .list(limit, offset)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&articles)?);
        return Ok(());
    }

    if articles.is_empty() {
        println!("No articles for {}.", date);
        return Ok(());
    }

    println!("{:<6} {:<12} {:<12} TITLE", "TIME", "SOURCE", "LEGEND");
    for article in &articles {
        println!(
            "{:<6} {:<12} {:<12} {}",
            article.timestamp.format("%H:%M"),
            article.source,
            article.legend.as_deref().unwrap_or("-"),
            article.title
        );
    }
    println!();
    println!("{} article(s) on {}", articles.len(), date);

    Ok(())
}
