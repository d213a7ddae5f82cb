// src/digest.rs
//! Final assembly: one overview call over the top-N, then the terminal
//! `DigestResult`.
//!
//! The overview is best-effort: any failure substitutes a fixed placeholder
//! instead of failing the digest. An empty top-N is a valid terminal state
//! here and only here — it produces a digest with no entries and no model
//! call.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::config::Lang;
use crate::error::SynthesisError;
use crate::fetch::FailedSource;
use crate::rank::RankedEntry;
use crate::score::client::AiClient;

const OVERVIEW_ENTRIES: usize = 10;
const OVERVIEW_SUMMARY_CHARS: usize = 100;

/// Aggregated run observability. Failures never abort a run; they end up
/// counted here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub sources_total: usize,
    pub sources_failed: usize,
    pub failed_sources: Vec<FailedSource>,
    pub items_fetched: usize,
    pub items_in_window: usize,
    pub items_undated: usize,
    pub items_duplicate: usize,
    pub batches_total: usize,
    pub batches_fallback: usize,
    pub articles_fallback: usize,
}

/// Terminal artifact handed to the renderer. The core never writes files.
#[derive(Debug, Clone, PartialEq)]
pub struct DigestResult {
    pub generated_at: DateTime<Utc>,
    pub lang: Lang,
    pub overview: String,
    pub entries: Vec<RankedEntry>,
    pub stats: RunStats,
}

/// Fixed neutral overview used when synthesis fails.
pub fn placeholder_overview(lang: Lang) -> &'static str {
    match lang {
        Lang::Zh => "（今日看点生成失败，以下为精选文章列表。）",
        Lang::En => "(Overview unavailable; today's top picks follow.)",
    }
}

/// Overview shown when no articles qualified at all.
pub fn empty_overview(lang: Lang) -> &'static str {
    match lang {
        Lang::Zh => "时间窗口内没有符合条件的文章。",
        Lang::En => "No qualifying articles in this time window.",
    }
}

fn build_overview_prompt(entries: &[RankedEntry], lang: Lang) -> String {
    let article_list = entries
        .iter()
        .take(OVERVIEW_ENTRIES)
        .enumerate()
        .map(|(i, e)| {
            let summary: String = e
                .judgment()
                .summary
                .chars()
                .take(OVERVIEW_SUMMARY_CHARS)
                .collect();
            format!(
                "{}. [{}] {} — {}",
                i + 1,
                e.judgment().category.as_str(),
                e.article().title,
                summary
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let lang_note = match lang {
        Lang::Zh => "用中文回答。",
        Lang::En => "Write in English.",
    };

    format!(
        r#"根据以下今日精选技术文章列表，写一段 3-5 句话的"今日看点"总结。
要求：
- 提炼出今天技术圈的 2-3 个主要趋势或话题
- 不要逐篇列举，要做宏观归纳
- 风格简洁有力，像新闻导语
{lang_note}

文章列表：
{article_list}

直接返回纯文本总结，不要 JSON，不要 markdown 格式。"#
    )
}

/// Request the thematic overview. The error is surfaced to the synthesizer
/// only; callers of [`synthesize`] never see it.
async fn request_overview(
    client: &dyn AiClient,
    entries: &[RankedEntry],
    lang: Lang,
) -> Result<String, SynthesisError> {
    let prompt = build_overview_prompt(entries, lang);
    let text = client
        .complete(&prompt)
        .await
        .map_err(|e| SynthesisError(e.to_string()))?;
    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(SynthesisError("empty overview".to_string()));
    }
    Ok(text)
}

/// Assemble the final digest from the ranked entries.
pub async fn synthesize(
    client: &dyn AiClient,
    entries: Vec<RankedEntry>,
    lang: Lang,
    stats: RunStats,
) -> DigestResult {
    let overview = if entries.is_empty() {
        empty_overview(lang).to_string()
    } else {
        match request_overview(client, &entries, lang).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "overview synthesis failed, using placeholder");
                placeholder_overview(lang).to_string()
            }
        }
    };

    DigestResult {
        generated_at: Utc::now(),
        lang,
        overview,
        entries,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::Article;
    use crate::score::{Category, JudgmentOrigin, ScoreJudgment, ScoredArticle};
    use async_trait::async_trait;
    use crate::error::ScoreServiceError;

    struct FixedClient(Option<&'static str>);

    #[async_trait]
    impl AiClient for FixedClient {
        async fn complete(&self, _prompt: &str) -> Result<String, ScoreServiceError> {
            match self.0 {
                Some(s) => Ok(s.to_string()),
                None => Err(ScoreServiceError::Request("down".into())),
            }
        }
        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    fn entry() -> RankedEntry {
        RankedEntry {
            scored: ScoredArticle {
                article: Article {
                    id: "a".into(),
                    title: "T".into(),
                    link: "https://a.test/1".into(),
                    source_name: "s".into(),
                    source_url: String::new(),
                    published_at: Utc::now(),
                    excerpt: String::new(),
                },
                judgment: ScoreJudgment {
                    relevance: 8,
                    quality: 8,
                    timeliness: 8,
                    category: Category::Engineering,
                    keywords: vec![],
                    summary: "sum".into(),
                    reason: String::new(),
                },
                origin: JudgmentOrigin::Model,
            },
            composite: 8.0,
        }
    }

    #[tokio::test]
    async fn uses_model_overview_when_available() {
        let d = synthesize(
            &FixedClient(Some("  今日看点\n")),
            vec![entry()],
            Lang::Zh,
            RunStats::default(),
        )
        .await;
        assert_eq!(d.overview, "今日看点");
        assert_eq!(d.entries.len(), 1);
    }

    #[tokio::test]
    async fn falls_back_to_placeholder_on_failure() {
        let d = synthesize(
            &FixedClient(None),
            vec![entry()],
            Lang::En,
            RunStats::default(),
        )
        .await;
        assert_eq!(d.overview, placeholder_overview(Lang::En));
    }

    #[tokio::test]
    async fn empty_top_n_is_valid_and_makes_no_call() {
        struct Panicking;
        #[async_trait]
        impl AiClient for Panicking {
            async fn complete(&self, _prompt: &str) -> Result<String, ScoreServiceError> {
                panic!("must not be called for an empty digest");
            }
            fn name(&self) -> &'static str {
                "panicking"
            }
        }

        let d = synthesize(&Panicking, Vec::new(), Lang::Zh, RunStats::default()).await;
        assert!(d.entries.is_empty());
        assert_eq!(d.overview, empty_overview(Lang::Zh));
    }

    #[test]
    fn overview_prompt_lists_entries() {
        let p = build_overview_prompt(&[entry()], Lang::Zh);
        assert!(p.contains("1. [engineering] T — sum"));
    }
}
