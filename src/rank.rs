// src/rank.rs
//! Composite scoring and deterministic top-N selection.
//!
//! The sort is a total order: composite descending, then recency descending,
//! then source name, then id. Re-ranking the same scored set always yields
//! the same sequence, noisy model scores included.

use crate::config::ScoreWeights;
use crate::score::{ScoreJudgment, ScoredArticle};

/// One ranked digest entry.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntry {
    pub scored: ScoredArticle,
    pub composite: f64,
}

impl RankedEntry {
    pub fn article(&self) -> &crate::normalize::Article {
        &self.scored.article
    }

    pub fn judgment(&self) -> &ScoreJudgment {
        &self.scored.judgment
    }
}

/// Weighted mean of the three dimensions, on the same 1..=10 scale.
pub fn composite_score(judgment: &ScoreJudgment, weights: &ScoreWeights) -> f64 {
    let weighted = f64::from(judgment.relevance) * weights.relevance
        + f64::from(judgment.quality) * weights.quality
        + f64::from(judgment.timeliness) * weights.timeliness;
    weighted / weights.sum()
}

/// Rank and truncate. `top_n == 0` yields an empty sequence; `top_n` beyond
/// the available articles yields all of them.
pub fn rank(scored: Vec<ScoredArticle>, weights: &ScoreWeights, top_n: usize) -> Vec<RankedEntry> {
    let mut entries: Vec<RankedEntry> = scored
        .into_iter()
        .map(|s| {
            let composite = composite_score(&s.judgment, weights);
            RankedEntry {
                scored: s,
                composite,
            }
        })
        .collect();

    entries.sort_by(|a, b| {
        b.composite
            .total_cmp(&a.composite)
            .then_with(|| {
                b.scored
                    .article
                    .published_at
                    .cmp(&a.scored.article.published_at)
            })
            .then_with(|| a.scored.article.source_name.cmp(&b.scored.article.source_name))
            .then_with(|| a.scored.article.id.cmp(&b.scored.article.id))
    });

    entries.truncate(top_n);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::Article;
    use crate::score::{Category, JudgmentOrigin};
    use chrono::{TimeZone, Utc};

    fn scored(id: &str, r: u8, q: u8, t: u8) -> ScoredArticle {
        ScoredArticle {
            article: Article {
                id: id.into(),
                title: format!("t-{id}"),
                link: format!("https://a.test/{id}"),
                source_name: "src".into(),
                source_url: "https://a.test".into(),
                published_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
                excerpt: String::new(),
            },
            judgment: ScoreJudgment {
                relevance: r,
                quality: q,
                timeliness: t,
                category: Category::Other,
                keywords: vec![],
                summary: String::new(),
                reason: String::new(),
            },
            origin: JudgmentOrigin::Model,
        }
    }

    #[test]
    fn composite_is_weighted_mean() {
        let j = scored("x", 8, 6, 10).judgment;
        let equal = ScoreWeights::default();
        assert!((composite_score(&j, &equal) - 8.0).abs() < 1e-9);

        let skewed = ScoreWeights {
            relevance: 2.0,
            quality: 1.0,
            timeliness: 1.0,
        };
        // (16 + 6 + 10) / 4
        assert!((composite_score(&j, &skewed) - 8.0).abs() < 1e-9);
    }

    #[test]
    fn sorts_descending_and_breaks_ties_by_id() {
        // Tied pair differs only by id; third article scores lower.
        let a = scored("a", 9, 9, 8);
        let b = scored("b", 9, 9, 8);
        let c = scored("c", 7, 7, 7);

        let w = ScoreWeights::default();
        let out1 = rank(vec![b.clone(), c.clone(), a.clone()], &w, 10);
        let out2 = rank(vec![a.clone(), b.clone(), c.clone()], &w, 10);

        let ids1: Vec<_> = out1.iter().map(|e| e.article().id.clone()).collect();
        let ids2: Vec<_> = out2.iter().map(|e| e.article().id.clone()).collect();
        assert_eq!(ids1, vec!["a", "b", "c"]);
        assert_eq!(ids1, ids2);
    }

    #[test]
    fn recency_beats_source_and_id_in_ties() {
        let mut old = scored("a", 8, 8, 8);
        old.article.published_at = Utc.with_ymd_and_hms(2025, 6, 1, 1, 0, 0).unwrap();
        let mut fresh = scored("z", 8, 8, 8);
        fresh.article.published_at = Utc.with_ymd_and_hms(2025, 6, 1, 11, 0, 0).unwrap();

        let out = rank(vec![old, fresh], &ScoreWeights::default(), 10);
        assert_eq!(out[0].article().id, "z");
    }

    #[test]
    fn truncation_edges() {
        let w = ScoreWeights::default();
        let items = vec![scored("a", 8, 8, 8), scored("b", 6, 6, 6)];

        assert!(rank(items.clone(), &w, 0).is_empty());
        assert_eq!(rank(items.clone(), &w, 100).len(), 2);
        assert_eq!(rank(Vec::new(), &w, 5).len(), 0);
    }
}
