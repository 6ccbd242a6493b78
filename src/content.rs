//! Full article content persisted as markdown, one directory per day:
//! `<root>/YYYY/MM/DD/<id>.md`. Stored articles reference their file
//! through [`Article::file_path`](crate::models::Article::file_path).

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::PathBuf;

use crate::models::{derive_article_id, Article};

pub struct ArticleFiles {
    root: PathBuf,
}

impl ArticleFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn day_dir(&self, date: NaiveDate) -> PathBuf {
        self.root.join(date.format("%Y/%m/%d").to_string())
    }

    /// Write the content of `article` and return the file path.
    pub fn write(&self, article: &Article, content: &str) -> Result<PathBuf> {
        let dir = self.day_dir(article.partition_date());
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create content directory: {}", dir.display()))?;

        let path = dir.join(format!("{}.md", sanitize_file_stem(&article.id)));
        let body = format!(
            "# {}\n\n<{}>\n\n{}\n",
            article.title.trim(),
            article.url,
            content.trim()
        );
        std::fs::write(&path, body)
            .with_context(|| format!("Failed to write content file: {}", path.display()))?;
        Ok(path)
    }

    /// Delete every markdown file of one day, returning how many were removed.
    pub fn clear_day(&self, date: NaiveDate) -> Result<usize> {
        let dir = self.day_dir(date);
        if !dir.exists() {
            return Ok(0);
        }

        let mut deleted = 0;
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "md") {
                std::fs::remove_file(&path)
                    .with_context(|| format!("Failed to delete {}", path.display()))?;
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}

/// File stem for an article id. Ids that need replacing get a hash of the
/// original id appended, so distinct ids never share a file.
fn sanitize_file_stem(id: &str) -> String {
    let stem: String = id
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if stem == id {
        stem
    } else {
        format!("{}-{}", stem, &derive_article_id(id)[..8])
    }
}
