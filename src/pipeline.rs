// src/pipeline.rs
//! Run-once orchestration: sources -> fetch -> normalize -> score -> rank ->
//! digest.
//!
//! Data flows strictly left to right. The only fatal error is invalid
//! configuration, rejected before any network traffic; every runtime failure
//! degrades to a fallback and shows up in [`RunStats`].

use std::sync::Arc;

use chrono::Utc;
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use tracing::info;

use crate::config::DigestConfig;
use crate::digest::{self, DigestResult, RunStats};
use crate::error::ConfigError;
use crate::feed::FeedFetcher;
use crate::fetch;
use crate::normalize;
use crate::rank;
use crate::score::{self, client::AiClient};
use crate::sources::SourceEndpoint;

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("digest_feed_items_total", "Raw items parsed from feeds.");
        describe_counter!("digest_fetch_errors_total", "Feed fetch failures.");
        describe_counter!(
            "digest_articles_kept_total",
            "Articles kept after normalization + window filter."
        );
        describe_counter!(
            "digest_score_fallback_batches_total",
            "Scoring batches that fell back wholesale."
        );
        describe_gauge!("digest_last_run_ts", "Unix ts when the pipeline last ran.");
    });
}

/// Run the whole pipeline once.
///
/// `fetcher` and `ai` are injected so callers (and tests) control the I/O
/// edges; production wiring is `HttpFeedFetcher` + `OpenAiClient`.
pub async fn run(
    cfg: &DigestConfig,
    sources: &[SourceEndpoint],
    fetcher: Arc<dyn FeedFetcher>,
    ai: Arc<dyn AiClient>,
) -> Result<DigestResult, ConfigError> {
    cfg.validate()?;
    if sources.is_empty() {
        return Err(ConfigError::NoSources);
    }
    ensure_metrics_described();

    info!(
        sources = sources.len(),
        window_hours = cfg.window_hours,
        top_n = cfg.top_n,
        lang = cfg.lang.as_str(),
        "digest run starting"
    );

    // Stage 1: fetch everything under the fetch cap.
    let outcome = fetch::fetch_all(
        Arc::clone(&fetcher),
        sources,
        cfg.fetch_timeout,
        cfg.fetch_concurrency,
    )
    .await;

    // Stage 2: normalize + window filter.
    let now = Utc::now();
    let (articles, norm_stats) = normalize::normalize_items(outcome.items, now, cfg.window_hours);
    counter!("digest_articles_kept_total").increment(articles.len() as u64);
    info!(
        fetched = norm_stats.input,
        kept = norm_stats.kept,
        undated = norm_stats.undated,
        out_of_window = norm_stats.out_of_window,
        duplicate = norm_stats.duplicate,
        "normalization complete"
    );

    // Stage 3: batched scoring under the (smaller) scoring cap.
    let (scored, score_stats) = score::score_articles(Arc::clone(&ai), &articles, cfg).await;
    info!(
        batches = score_stats.batches_total,
        fallback_batches = score_stats.batches_fallback,
        fallback_articles = score_stats.articles_fallback,
        "scoring complete"
    );

    // Stage 4: deterministic ranking + selection.
    let ranked = rank::rank(scored, &cfg.weights, cfg.top_n);

    let stats = RunStats {
        sources_total: outcome.sources_total,
        sources_failed: outcome.failed.len(),
        failed_sources: outcome.failed,
        items_fetched: norm_stats.input,
        items_in_window: norm_stats.kept,
        items_undated: norm_stats.undated,
        items_duplicate: norm_stats.duplicate,
        batches_total: score_stats.batches_total,
        batches_fallback: score_stats.batches_fallback,
        articles_fallback: score_stats.articles_fallback,
    };

    // Stage 5: overview + assembly.
    let result = digest::synthesize(ai.as_ref(), ranked, cfg.lang, stats).await;

    gauge!("digest_last_run_ts").set(now.timestamp() as f64);
    info!(
        entries = result.entries.len(),
        sources_failed = result.stats.sources_failed,
        "digest run complete"
    );
    Ok(result)
}
