//! Partition overview for `timeline partitions`.

use anyhow::Result;

use crate::config::Config;
use crate::store::{list_partitions, TimelineStore};

pub async fn run_partitions(config: &Config) -> Result<()> {
    let dates = list_partitions(&config.store.dir)?;
    if dates.is_empty() {
        println!("No partitions in {}.", config.store.dir.display());
        return Ok(());
    }

    println!("{:<12} {:>8} {:>10}", "DATE", "ARTICLES", "SIZE");
    let mut total = 0;
    for date in dates {
        let store = TimelineStore::new(&config.store.dir, date);
        let count = store.count().await?;
        let size = std::fs::metadata(store.path()).map(|m| m.len()).unwrap_or(0);
        total += count;
        println!("{:<12} {:>8} {:>10}", date, count, format_bytes(size));
    }
    println!();
    println!("{} article(s) total", total);

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
