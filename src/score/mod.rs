// src/score/mod.rs
//! Batched scoring against the external judgment service.
//!
//! One request per batch, at most `score_concurrency` requests in flight.
//! This stage never fails outward: every article comes back with exactly one
//! judgment, tagged with whether it came from the model or from the neutral
//! fallback.

pub mod client;
pub mod prompt;

use std::sync::Arc;

use metrics::counter;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::warn;

use crate::config::{DigestConfig, Lang};
use crate::normalize::Article;
use crate::score::client::AiClient;

/// Neutral constant substituted for each dimension when scoring fails.
pub const FALLBACK_SCORE: u8 = 5;

const FALLBACK_SUMMARY_CHARS: usize = 200;

/// Closed category set; anything the model invents maps to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    AiMl,
    Security,
    Engineering,
    Tools,
    Opinion,
    #[default]
    Other,
}

impl Category {
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "ai-ml" => Category::AiMl,
            "security" => Category::Security,
            "engineering" => Category::Engineering,
            "tools" => Category::Tools,
            "opinion" => Category::Opinion,
            _ => Category::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::AiMl => "ai-ml",
            Category::Security => "security",
            Category::Engineering => "engineering",
            Category::Tools => "tools",
            Category::Opinion => "opinion",
            Category::Other => "other",
        }
    }
}

/// The model's verdict on one article. All three dimensions are always
/// present and integral in [1,10].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreJudgment {
    pub relevance: u8,
    pub quality: u8,
    pub timeliness: u8,
    pub category: Category,
    pub keywords: Vec<String>,
    pub summary: String,
    pub reason: String,
}

/// Where a judgment came from. Coordinators only ever inspect this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JudgmentOrigin {
    Model,
    Fallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredArticle {
    pub article: Article,
    pub judgment: ScoreJudgment,
    pub origin: JudgmentOrigin,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreStats {
    pub batches_total: usize,
    /// Batches whose request failed entirely.
    pub batches_fallback: usize,
    /// Articles that received the fallback judgment (whole-batch failures
    /// included).
    pub articles_fallback: usize,
}

/// The wholesale neutral judgment. Never partial: either an article's row
/// parsed, or it gets all of this.
pub fn fallback_judgment(article: &Article) -> ScoreJudgment {
    ScoreJudgment {
        relevance: FALLBACK_SCORE,
        quality: FALLBACK_SCORE,
        timeliness: FALLBACK_SCORE,
        category: Category::Other,
        keywords: Vec::new(),
        summary: article.excerpt.chars().take(FALLBACK_SUMMARY_CHARS).collect(),
        reason: String::new(),
    }
}

/// Partition articles into fixed-size batches, input order preserved.
pub fn batch_articles(articles: &[Article], batch_size: usize) -> Vec<Vec<Article>> {
    assert!(batch_size >= 1, "batch_size validated upstream");
    articles
        .chunks(batch_size)
        .map(|c| c.to_vec())
        .collect()
}

/// Score one batch. Absorbs every failure mode into fallbacks; the returned
/// vec always has one entry per input article.
async fn score_batch(
    client: &dyn AiClient,
    batch: &[Article],
    lang: Lang,
) -> (Vec<ScoredArticle>, bool) {
    let prompt = prompt::build_scoring_prompt(batch, lang);

    let judgments = match client.complete(&prompt).await {
        Ok(text) => match prompt::parse_scoring_response(&text, batch.len()) {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, batch_len = batch.len(), "scoring response unparsable, using fallback");
                vec![None; batch.len()]
            }
        },
        Err(e) => {
            warn!(error = %e, batch_len = batch.len(), "scoring request failed, using fallback");
            vec![None; batch.len()]
        }
    };

    let whole_batch_fallback = judgments.iter().all(Option::is_none);
    let scored = batch
        .iter()
        .zip(judgments)
        .map(|(article, judgment)| match judgment {
            Some(judgment) => ScoredArticle {
                article: article.clone(),
                judgment,
                origin: JudgmentOrigin::Model,
            },
            None => ScoredArticle {
                article: article.clone(),
                judgment: fallback_judgment(article),
                origin: JudgmentOrigin::Fallback,
            },
        })
        .collect();
    (scored, whole_batch_fallback)
}

/// Score all articles under the scoring concurrency cap. Output preserves
/// input article order regardless of batch completion order.
pub async fn score_articles(
    client: Arc<dyn AiClient>,
    articles: &[Article],
    cfg: &DigestConfig,
) -> (Vec<ScoredArticle>, ScoreStats) {
    let batches = batch_articles(articles, cfg.batch_size);
    let mut stats = ScoreStats {
        batches_total: batches.len(),
        ..Default::default()
    };
    if batches.is_empty() {
        return (Vec::new(), stats);
    }

    // Scoring gets its own semaphore, never shared with fetching: the model
    // endpoint is rate- and cost-bound.
    let semaphore = Arc::new(Semaphore::new(cfg.score_concurrency));
    let lang = cfg.lang;
    let mut set: JoinSet<(usize, Vec<ScoredArticle>, bool)> = JoinSet::new();

    for (pos, batch) in batches.iter().cloned().enumerate() {
        let client = Arc::clone(&client);
        let semaphore = Arc::clone(&semaphore);
        set.spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
            let (scored, whole_fallback) = score_batch(client.as_ref(), &batch, lang).await;
            (pos, scored, whole_fallback)
        });
    }

    // Only this task touches the aggregate collection; workers hand results
    // back through the JoinSet.
    let mut slots: Vec<Option<Vec<ScoredArticle>>> = vec![None; stats.batches_total];
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((pos, scored, whole_fallback)) => {
                if whole_fallback {
                    stats.batches_fallback += 1;
                }
                stats.articles_fallback += scored
                    .iter()
                    .filter(|s| s.origin == JudgmentOrigin::Fallback)
                    .count();
                slots[pos] = Some(scored);
            }
            Err(e) => {
                // A panicked batch task loses its slot; the hole is refilled
                // with fallbacks below.
                warn!(error = %e, "scoring task join error");
            }
        }
    }

    counter!("digest_score_fallback_batches_total").increment(stats.batches_fallback as u64);

    let mut out = Vec::with_capacity(articles.len());
    for (pos, slot) in slots.into_iter().enumerate() {
        match slot {
            Some(mut scored) => out.append(&mut scored),
            None => {
                for article in &batches[pos] {
                    stats.articles_fallback += 1;
                    out.push(ScoredArticle {
                        article: article.clone(),
                        judgment: fallback_judgment(article),
                        origin: JudgmentOrigin::Fallback,
                    });
                }
            }
        }
    }
    (out, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn article(i: usize) -> Article {
        Article {
            id: format!("id{i}"),
            title: format!("Title {i}"),
            link: format!("https://a.test/{i}"),
            source_name: "a.test".into(),
            source_url: "https://a.test".into(),
            published_at: Utc::now(),
            excerpt: "Excerpt body".into(),
        }
    }

    #[test]
    fn batches_preserve_order_and_sizes() {
        let articles: Vec<_> = (0..23).map(article).collect();
        let batches = batch_articles(&articles, 10);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].len(), 10);
        assert_eq!(batches[2].len(), 3);
        assert_eq!(batches[1][0].id, "id10");
    }

    #[test]
    fn fallback_judgment_is_neutral_and_whole() {
        let a = article(0);
        let j = fallback_judgment(&a);
        assert_eq!(
            (j.relevance, j.quality, j.timeliness),
            (FALLBACK_SCORE, FALLBACK_SCORE, FALLBACK_SCORE)
        );
        assert_eq!(j.category, Category::Other);
        assert_eq!(j.summary, "Excerpt body");
    }

    #[test]
    fn category_roundtrip_and_unknowns() {
        assert_eq!(Category::parse("ai-ml"), Category::AiMl);
        assert_eq!(Category::parse(" tools "), Category::Tools);
        assert_eq!(Category::parse("blockchain"), Category::Other);
        assert_eq!(Category::AiMl.as_str(), "ai-ml");
    }
}
