//! Session-scoped cache of URLs already seen by the ingest loop.
//!
//! This is an optimization only: it lives in memory, is lost on restart,
//! and the store's `url` uniqueness constraint remains the real guarantee.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use crate::models::derive_article_id;

#[derive(Debug, Default)]
struct Seen {
    urls: HashSet<String>,
    ids: HashSet<String>,
}

/// Set of seen URLs (and the article ids derived from them), shared
/// between concurrent fetch tasks.
#[derive(Debug, Default)]
pub struct DedupCache {
    seen: Mutex<Seen>,
}

impl DedupCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.lock().urls.contains(url)
    }

    /// Whether an article id derived from a seen URL is known.
    pub fn contains_id(&self, id: &str) -> bool {
        self.lock().ids.contains(id)
    }

    pub fn add(&self, url: &str) {
        let mut seen = self.lock();
        if seen.urls.insert(url.to_string()) {
            seen.ids.insert(derive_article_id(url));
        }
    }

    /// Record `url` and report whether it was seen for the first time.
    pub fn check_and_add(&self, url: &str) -> bool {
        let mut seen = self.lock();
        let fresh = seen.urls.insert(url.to_string());
        if fresh {
            seen.ids.insert(derive_article_id(url));
        }
        fresh
    }

    /// Forget `url`, so a later cycle processes it again. Returns whether
    /// it was present.
    pub fn remove(&self, url: &str) -> bool {
        let mut seen = self.lock();
        let present = seen.urls.remove(url);
        if present {
            seen.ids.remove(&derive_article_id(url));
        }
        present
    }

    /// Empty the cache, returning how many URLs it held.
    pub fn clear(&self) -> usize {
        let mut seen = self.lock();
        let previous = seen.urls.len();
        seen.urls.clear();
        seen.ids.clear();
        previous
    }

    pub fn size(&self) -> usize {
        self.lock().urls.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Seen> {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
