//! Two-tier keyword index.
//!
//! The keyword document is TOML with an optional top-level `front` list and
//! an optional `[legend]` table. Every entry is a list of *groups*, where a
//! group is either a single keyword or a list of keywords:
//!
//! ```toml
//! front = ["AGI", ["deepseek", "DeepSeek"]]
//!
//! [legend]
//! musk = [["马斯克", "Musk"], "特斯拉"]
//! huang = ["黄仁勋", "英伟达"]
//! ```
//!
//! Legend ids keep their declaration order; the classifier relies on it
//! for its priority rule.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum KeywordGroup {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Deserialize, Default)]
struct KeywordDocument {
    #[serde(default)]
    legend: toml::Table,
    #[serde(default)]
    front: Vec<KeywordGroup>,
}

/// Keywords of one tier: a lowercase set for matching and the original
/// spellings for display.
#[derive(Debug, Clone, Default)]
struct KeywordSet {
    lowercase: HashSet<String>,
    original: Vec<String>,
}

impl KeywordSet {
    fn from_groups(groups: Vec<KeywordGroup>) -> Self {
        let mut set = Self::default();
        for group in groups {
            match group {
                KeywordGroup::One(kw) => set.push(kw),
                KeywordGroup::Many(kws) => kws.into_iter().for_each(|kw| set.push(kw)),
            }
        }
        set
    }

    fn push(&mut self, keyword: String) {
        if keyword.trim().is_empty() {
            return;
        }
        if self.lowercase.insert(keyword.to_lowercase()) {
            self.original.push(keyword);
        }
    }

    fn matches(&self, text: &str) -> bool {
        self.lowercase.iter().any(|kw| text.contains(kw.as_str()))
    }
}

/// Immutable legend/front keyword lookup built from a keyword document.
#[derive(Debug, Clone, Default)]
pub struct KeywordIndex {
    legend: Vec<(String, KeywordSet)>,
    front: KeywordSet,
}

impl KeywordIndex {
    /// An index with no keywords. Classifies every title as rejected.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a keyword document. Malformed input is an error.
    pub fn parse(content: &str) -> Result<Self> {
        let doc: KeywordDocument =
            toml::from_str(content).context("Failed to parse keyword document")?;

        let mut legend = Vec::with_capacity(doc.legend.len());
        for (id, value) in doc.legend {
            let groups = value
                .try_into::<Vec<KeywordGroup>>()
                .with_context(|| format!("legend '{}' must be a list of keyword groups", id))?;
            legend.push((id, KeywordSet::from_groups(groups)));
        }

        Ok(Self {
            legend,
            front: KeywordSet::from_groups(doc.front),
        })
    }

    /// Read and parse a keyword document from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read keyword file: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Build the index from a file, falling back to the empty index when
    /// the file can't be loaded.
    pub fn build(path: &Path) -> Self {
        let index = match Self::load(path) {
            Ok(index) => index,
            Err(e) => {
                warn!(path = %path.display(), error = %format!("{:#}", e), "keyword index unavailable, rejecting all articles");
                Self::empty()
            }
        };
        info!(
            legends = index.legend.len(),
            legend_keywords = index.legend_keyword_count(),
            front_keywords = index.front_keyword_count(),
            "keyword index built"
        );
        index
    }

    /// Legend ids in declaration order.
    pub fn legend_ids(&self) -> impl Iterator<Item = &str> {
        self.legend.iter().map(|(id, _)| id.as_str())
    }

    pub fn is_legend(&self, id: &str) -> bool {
        self.legend.iter().any(|(legend_id, _)| legend_id == id)
    }

    /// First legend (in declaration order) with a keyword contained in
    /// `text`. `text` must already be lowercase.
    pub fn match_legend(&self, text: &str) -> Option<&str> {
        self.legend
            .iter()
            .find(|(_, set)| set.matches(text))
            .map(|(id, _)| id.as_str())
    }

    /// Whether any front keyword is contained in `text` (already lowercase).
    pub fn match_front(&self, text: &str) -> bool {
        self.front.matches(text)
    }

    pub fn is_empty(&self) -> bool {
        self.legend_keyword_count() == 0 && self.front_keyword_count() == 0
    }

    pub fn legend_keyword_count(&self) -> usize {
        self.legend.iter().map(|(_, set)| set.lowercase.len()).sum()
    }

    pub fn front_keyword_count(&self) -> usize {
        self.front.lowercase.len()
    }

    /// Original-case keywords of a legend, in document order.
    pub fn original_legend(&self, id: &str) -> Option<&[String]> {
        self.legend
            .iter()
            .find(|(legend_id, _)| legend_id == id)
            .map(|(_, set)| set.original.as_slice())
    }

    /// Original-case front keywords, in document order.
    pub fn original_front(&self) -> &[String] {
        &self.front.original
    }
}

/// Keyword index built on first use.
///
/// Concurrent first callers wait on the single build. [`reload`] replaces
/// the index with a fresh build from the same file.
///
/// [`reload`]: LazyKeywordIndex::reload
pub struct LazyKeywordIndex {
    path: PathBuf,
    cell: RwLock<Arc<OnceLock<Arc<KeywordIndex>>>>,
    builds: AtomicUsize,
}

impl LazyKeywordIndex {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cell: RwLock::new(Arc::new(OnceLock::new())),
            builds: AtomicUsize::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the index, building it if this is the first call.
    pub fn get(&self) -> Arc<KeywordIndex> {
        let cell = self.current_cell();
        cell.get_or_init(|| self.build_index()).clone()
    }

    /// Eagerly build the index (no-op when already built).
    pub fn build(&self) -> Arc<KeywordIndex> {
        self.get()
    }

    pub fn is_ready(&self) -> bool {
        self.current_cell().get().is_some()
    }

    /// Discard the current index and build a new one.
    pub fn reload(&self) -> Arc<KeywordIndex> {
        let fresh = Arc::new(OnceLock::new());
        let index = fresh.get_or_init(|| self.build_index()).clone();
        *self.cell.write().unwrap_or_else(PoisonError::into_inner) = fresh;
        index
    }

    /// Number of builds performed so far.
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    fn current_cell(&self) -> Arc<OnceLock<Arc<KeywordIndex>>> {
        self.cell
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn build_index(&self) -> Arc<KeywordIndex> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        Arc::new(KeywordIndex::build(&self.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
front = ["AGI", ["deepseek", "DeepSeek", "  "], "人形机器人", ""]

[legend]
musk = [["马斯克", "Musk"], "特斯拉"]
huang = ["黄仁勋", "英伟达"]
altman = ["OpenAI", ["奥特曼", "Altman"]]
"#;

    #[test]
    fn test_parse_flattens_groups() {
        let index = KeywordIndex::parse(DOC).unwrap();
        assert_eq!(
            index.original_legend("musk").unwrap(),
            &["马斯克".to_string(), "Musk".to_string(), "特斯拉".to_string()]
        );
        assert_eq!(index.legend_keyword_count(), 3 + 2 + 3);
        assert!(index.is_legend("altman"));
        assert!(!index.is_legend("front"));
    }

    #[test]
    fn test_legend_order_is_declaration_order() {
        let index = KeywordIndex::parse(DOC).unwrap();
        let ids: Vec<&str> = index.legend_ids().collect();
        assert_eq!(ids, vec!["musk", "huang", "altman"]);
    }

    #[test]
    fn test_blank_keywords_are_dropped() {
        let index = KeywordIndex::parse(DOC).unwrap();
        // "deepseek" and "DeepSeek" collapse to one lowercase keyword
        assert_eq!(index.front_keyword_count(), 3);
        assert_eq!(
            index.original_front(),
            &["AGI".to_string(), "deepseek".to_string(), "人形机器人".to_string()]
        );
        assert!(!index.match_front(" "));
    }

    #[test]
    fn test_match_is_lowercase_substring() {
        let index = KeywordIndex::parse(DOC).unwrap();
        assert_eq!(index.match_legend("musk says hi"), Some("musk"));
        assert_eq!(index.match_legend("openai devday"), Some("altman"));
        assert!(index.match_front("agi timeline"));
        assert!(!index.match_front("AGI timeline"));
    }

    #[test]
    fn test_missing_sections_are_empty() {
        let index = KeywordIndex::parse("").unwrap();
        assert!(index.is_empty());
        assert_eq!(index.legend_ids().count(), 0);
    }

    #[test]
    fn test_malformed_legend_is_error() {
        assert!(KeywordIndex::parse("[legend]\nmusk = 3\n").is_err());
        assert!(KeywordIndex::parse("front = [").is_err());
    }

    #[test]
    fn test_build_missing_file_fails_closed() {
        let index = KeywordIndex::build(Path::new("/nonexistent/keywords.toml"));
        assert!(index.is_empty());
    }

    #[test]
    fn test_lazy_index_builds_once() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("keywords.toml");
        std::fs::write(&path, DOC).unwrap();

        let lazy = Arc::new(LazyKeywordIndex::new(&path));
        assert!(!lazy.is_ready());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let lazy = lazy.clone();
                std::thread::spawn(move || lazy.get().legend_keyword_count())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 8);
        }

        assert!(lazy.is_ready());
        assert_eq!(lazy.build_count(), 1);
    }

    #[test]
    fn test_reload_picks_up_changes() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("keywords.toml");
        std::fs::write(&path, DOC).unwrap();

        let lazy = LazyKeywordIndex::new(&path);
        assert!(lazy.build().is_legend("musk"));

        std::fs::write(&path, "[legend]\nbezos = [\"贝索斯\"]\n").unwrap();
        assert!(lazy.get().is_legend("musk"));

        let reloaded = lazy.reload();
        assert!(reloaded.is_legend("bezos"));
        assert!(!lazy.get().is_legend("musk"));
        assert_eq!(lazy.build_count(), 2);
    }
}
