//! Legend/front classification of article titles.
//!
//! Priority is legend > front > reject, and among legends the one declared
//! first in the keyword document wins. Matching is plain substring
//! containment on the lowercased title, so a short keyword inside an
//! unrelated word still counts as a hit.

use serde::Serialize;
use tracing::{debug, info};

use crate::keywords::KeywordIndex;
use crate::models::Article;

/// How many rejected titles are kept in [`ClassifyStats::rejected_samples`].
pub const REJECT_SAMPLE_LIMIT: usize = 5;

const SAMPLE_TITLE_CHARS: usize = 50;

/// Result of classifying one article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Accepted under a legend id taken from the index.
    Legend(String),
    /// Accepted as front (no legend).
    Front,
    Rejected,
}

impl Outcome {
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Outcome::Rejected)
    }

    /// Value to store in [`Article::legend`], or `None` for front and
    /// rejected outcomes.
    pub fn legend(&self) -> Option<&str> {
        match self {
            Outcome::Legend(id) => Some(id),
            _ => None,
        }
    }
}

/// Classify a single article against the index.
pub fn classify(article: &Article, index: &KeywordIndex) -> Outcome {
    classify_title(&article.title, index)
}

/// Classify a bare title.
pub fn classify_title(title: &str, index: &KeywordIndex) -> Outcome {
    let text = title.to_lowercase();

    if let Some(id) = index.match_legend(&text) {
        return Outcome::Legend(id.to_string());
    }
    if index.match_front(&text) {
        return Outcome::Front;
    }
    Outcome::Rejected
}

/// Per-run counters. Diagnostic only.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClassifyStats {
    /// Hits per legend id, in declaration order (zero counts included).
    pub legend_hits: Vec<(String, usize)>,
    pub front_hits: usize,
    pub rejected: usize,
    /// First few rejected titles, truncated.
    pub rejected_samples: Vec<String>,
}

impl ClassifyStats {
    fn for_index(index: &KeywordIndex) -> Self {
        Self {
            legend_hits: index.legend_ids().map(|id| (id.to_string(), 0)).collect(),
            ..Default::default()
        }
    }

    pub fn accepted(&self) -> usize {
        self.legend_total() + self.front_hits
    }

    pub fn legend_total(&self) -> usize {
        self.legend_hits.iter().map(|(_, n)| n).sum()
    }

    pub fn legend_hits_for(&self, id: &str) -> usize {
        self.legend_hits
            .iter()
            .find(|(legend_id, _)| legend_id == id)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }

    /// Fold another run's counters into this one.
    pub fn merge(&mut self, other: &ClassifyStats) {
        for (id, n) in &other.legend_hits {
            match self.legend_hits.iter_mut().find(|(legend_id, _)| legend_id == id) {
                Some((_, total)) => *total += n,
                None => self.legend_hits.push((id.clone(), *n)),
            }
        }
        self.front_hits += other.front_hits;
        self.rejected += other.rejected;
        for sample in &other.rejected_samples {
            if self.rejected_samples.len() >= REJECT_SAMPLE_LIMIT {
                break;
            }
            self.rejected_samples.push(sample.clone());
        }
    }

    fn record(&mut self, outcome: &Outcome, title: &str) {
        match outcome {
            Outcome::Legend(id) => {
                if let Some((_, n)) = self.legend_hits.iter_mut().find(|(l, _)| l == id) {
                    *n += 1;
                }
            }
            Outcome::Front => self.front_hits += 1,
            Outcome::Rejected => {
                self.rejected += 1;
                if self.rejected_samples.len() < REJECT_SAMPLE_LIMIT {
                    let sample: String = title.chars().take(SAMPLE_TITLE_CHARS).collect();
                    debug!(title = %sample, "rejected");
                    self.rejected_samples.push(sample);
                }
            }
        }
    }
}

/// Accepted articles of a batch plus the run's counters.
#[derive(Debug, Clone, Default)]
pub struct Classification {
    /// Accepted articles in input order, with `legend` (re)assigned.
    pub accepted: Vec<Article>,
    pub stats: ClassifyStats,
}

/// Classify a batch. Rejected articles are dropped; every accepted
/// article's `legend` is overwritten with the computed outcome.
pub fn classify_batch(articles: Vec<Article>, index: &KeywordIndex) -> Classification {
    let total = articles.len();
    let mut stats = ClassifyStats::for_index(index);
    let mut accepted = Vec::with_capacity(total);

    for mut article in articles {
        let outcome = classify(&article, index);
        stats.record(&outcome, &article.title);
        if outcome.is_accepted() {
            article.legend = outcome.legend().map(str::to_string);
            accepted.push(article);
        }
    }

    info!(
        total,
        legend = stats.legend_total(),
        front = stats.front_hits,
        rejected = stats.rejected,
        "classified batch"
    );

    Classification { accepted, stats }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    const DOC: &str = r#"
front = ["AGI", "deepseek", "大模型", "人形机器人"]

[legend]
musk = [["马斯克", "Musk"], "特斯拉", "SpaceX"]
huang = ["黄仁勋", "英伟达"]
altman = ["OpenAI", "奥特曼"]
"#;

    fn index() -> KeywordIndex {
        KeywordIndex::parse(DOC).unwrap()
    }

    fn article(title: &str) -> Article {
        Article::new(title, format!("https://example.com/{}", title), "test", Utc::now())
    }

    #[test]
    fn test_legend_match() {
        let outcome = classify(&article("马斯克宣布星舰最新发射计划"), &index());
        assert_eq!(outcome, Outcome::Legend("musk".to_string()));
    }

    #[test]
    fn test_front_match_has_no_legend() {
        let outcome = classify(&article("中国大模型deepseek发布新版本"), &index());
        assert_eq!(outcome, Outcome::Front);
        assert_eq!(outcome.legend(), None);
    }

    #[test]
    fn test_no_match_is_rejected() {
        assert_eq!(classify(&article("日经225指数低开0.2%"), &index()), Outcome::Rejected);
    }

    #[test]
    fn test_legend_beats_front() {
        let outcome = classify(&article("马斯克谈大模型发展前景"), &index());
        assert_eq!(outcome, Outcome::Legend("musk".to_string()));
    }

    #[test]
    fn test_earlier_legend_wins() {
        // Both "英伟达" (huang) and "特斯拉" (musk) are present; musk is declared first.
        let outcome = classify_title("英伟达与特斯拉合作", &index());
        assert_eq!(outcome, Outcome::Legend("musk".to_string()));

        let reversed = KeywordIndex::parse(
            "[legend]\nhuang = [\"英伟达\"]\nmusk = [\"特斯拉\"]\n",
        )
        .unwrap();
        assert_eq!(
            classify_title("英伟达与特斯拉合作", &reversed),
            Outcome::Legend("huang".to_string())
        );
    }

    #[test]
    fn test_case_insensitive() {
        let index = index();
        for title in ["MUSK on mars", "musk on mars", "MuSk on mars"] {
            assert_eq!(classify_title(title, &index), Outcome::Legend("musk".to_string()));
        }
        for title in ["DEEPSEEK v4", "DeepSeek v4", "deepseek v4"] {
            assert_eq!(classify_title(title, &index), Outcome::Front);
        }
    }

    #[test]
    fn test_substring_false_positive_is_kept() {
        let index = KeywordIndex::parse("front = [\"AI\"]").unwrap();
        assert_eq!(classify_title("Thai cuisine week", &index), Outcome::Front);
    }

    #[test]
    fn test_empty_index_rejects_everything() {
        let empty = KeywordIndex::empty();
        assert_eq!(classify_title("马斯克", &empty), Outcome::Rejected);
        assert_eq!(classify_title("", &empty), Outcome::Rejected);
    }

    #[test]
    fn test_batch_filters_and_tags() {
        let mut stale = article("英伟达发布新一代AI芯片");
        stale.legend = Some("bogus".to_string());

        let batch = vec![
            article("马斯克宣布星舰最新发射计划"),
            article("日经225指数低开0.2%"),
            stale,
            article("中国大模型deepseek发布新版本"),
            article("现货黄金站上5500美元"),
        ];

        let index = index();
        let result = classify_batch(batch, &index);

        let titles: Vec<&str> = result.accepted.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "马斯克宣布星舰最新发射计划",
                "英伟达发布新一代AI芯片",
                "中国大模型deepseek发布新版本"
            ]
        );
        assert_eq!(result.accepted[0].legend.as_deref(), Some("musk"));
        assert_eq!(result.accepted[1].legend.as_deref(), Some("huang"));
        assert_eq!(result.accepted[2].legend, None);

        for a in &result.accepted {
            if let Some(legend) = &a.legend {
                assert!(index.is_legend(legend));
            }
        }

        assert_eq!(result.stats.legend_hits_for("musk"), 1);
        assert_eq!(result.stats.legend_hits_for("huang"), 1);
        assert_eq!(result.stats.legend_hits_for("altman"), 0);
        assert_eq!(result.stats.front_hits, 1);
        assert_eq!(result.stats.rejected, 2);
        assert_eq!(result.stats.accepted(), 3);
        assert_eq!(result.stats.rejected_samples.len(), 2);
    }

    #[test]
    fn test_reject_samples_are_capped() {
        let batch: Vec<Article> = (0..12).map(|i| article(&format!("无关新闻 {}", i))).collect();
        let result = classify_batch(batch, &index());
        assert!(result.accepted.is_empty());
        assert_eq!(result.stats.rejected, 12);
        assert_eq!(result.stats.rejected_samples.len(), REJECT_SAMPLE_LIMIT);
    }

    #[test]
    fn test_stats_merge() {
        let index = index();
        let mut total = classify_batch(vec![article("马斯克")], &index).stats;
        let other = classify_batch(vec![article("马斯克"), article("AGI")], &index).stats;
        total.merge(&other);
        assert_eq!(total.legend_hits_for("musk"), 2);
        assert_eq!(total.front_hits, 1);
        assert_eq!(total.accepted(), 3);
    }
}
