use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub store: StoreConfig,
    pub keywords: KeywordsConfig,
    #[serde(default)]
    pub content: Option<ContentConfig>,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub sources: BTreeMap<String, SourceConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Directory holding one `timeline_YYYY-MM-DD.sqlite` file per day.
    pub dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KeywordsConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContentConfig {
    pub dir: PathBuf,
    #[serde(default = "default_fetch_content")]
    pub fetch: bool,
}

fn default_fetch_content() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct CrawlerConfig {
    #[serde(default = "default_news_batch_limit")]
    pub news_batch_limit: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            news_batch_limit: default_news_batch_limit(),
        }
    }
}

fn default_news_batch_limit() -> usize {
    20
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub kind: String,
    pub path: PathBuf,
    #[serde(default)]
    pub description: Option<String>,
}

pub const SOURCE_KINDS: &[&str] = &["json"];

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.store.dir.as_os_str().is_empty() {
        anyhow::bail!("store.dir must not be empty");
    }

    if config.crawler.news_batch_limit == 0 {
        anyhow::bail!("crawler.news_batch_limit must be > 0");
    }

    for (id, source) in &config.sources {
        if id == "all" {
            anyhow::bail!("'all' is reserved and can't be used as a source id");
        }
        if !SOURCE_KINDS.contains(&source.kind.as_str()) {
            anyhow::bail!(
                "Unknown kind '{}' for source '{}'. Must be one of: {}",
                source.kind,
                id,
                SOURCE_KINDS.join(", ")
            );
        }
    }

    Ok(())
}
