//! AI Daily Digest — binary entrypoint.
//!
//! Wires the CLI onto the pipeline: resolve sources, build the feed fetcher
//! and the model client, run once, render Markdown, write the report.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ai_daily_digest::score::client::OpenAiClient;
use ai_daily_digest::{pipeline, render, sources, DigestConfig, HttpFeedFetcher, Lang};

#[derive(Debug, Parser)]
#[command(
    name = "ai-daily",
    about = "AI-curated daily digest from RSS/Atom feeds",
    after_help = "Environment:\n  OPENAI_API_KEY   Required. Key for an OpenAI-compatible API.\n  OPENAI_API_BASE  Optional base URL.\n  OPENAI_MODEL     Optional model name."
)]
struct Cli {
    /// Recency window in hours.
    #[arg(long, default_value_t = 24, env = "DIGEST_WINDOW_HOURS")]
    hours: i64,

    /// Number of top articles to keep.
    #[arg(long = "top-n", default_value_t = 15, env = "DIGEST_TOP_N")]
    top_n: usize,

    /// Output language for summaries and the overview (zh|en).
    #[arg(long, default_value = "zh", env = "DIGEST_LANG")]
    lang: Lang,

    /// Source list file (TOML [[sources]] or JSON array); embedded defaults
    /// when omitted.
    #[arg(long, env = "DIGEST_SOURCES_PATH")]
    sources: Option<PathBuf>,

    /// Max concurrent feed fetches.
    #[arg(long, default_value_t = 10, env = "DIGEST_FETCH_CONCURRENCY")]
    fetch_concurrency: usize,

    /// Per-feed fetch timeout in seconds.
    #[arg(long, default_value_t = 15, env = "DIGEST_FETCH_TIMEOUT_SECS")]
    fetch_timeout: u64,

    /// Articles per scoring request.
    #[arg(long, default_value_t = 10, env = "DIGEST_BATCH_SIZE")]
    batch_size: usize,

    /// Max concurrent scoring requests.
    #[arg(long, default_value_t = 2, env = "DIGEST_SCORE_CONCURRENCY")]
    score_concurrency: usize,

    /// Report path (default: ./digest-YYYYMMDD.md).
    #[arg(long, short)]
    output: Option<PathBuf>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ai_daily_digest=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local runs; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();

    let cfg = DigestConfig {
        window_hours: cli.hours,
        top_n: cli.top_n,
        lang: cli.lang,
        fetch_concurrency: cli.fetch_concurrency,
        fetch_timeout: std::time::Duration::from_secs(cli.fetch_timeout),
        batch_size: cli.batch_size,
        score_concurrency: cli.score_concurrency,
        ..Default::default()
    };

    let source_list = sources::load_sources(cli.sources.as_deref())?;
    let ai = OpenAiClient::from_env().context("building model client")?;
    tracing::info!(
        model = ai.model(),
        api_base = ai.api_base(),
        sources = source_list.len(),
        "configured"
    );

    let digest = pipeline::run(
        &cfg,
        &source_list,
        Arc::new(HttpFeedFetcher::new()),
        Arc::new(ai),
    )
    .await?;

    let output = cli.output.unwrap_or_else(|| {
        PathBuf::from(format!(
            "digest-{}.md",
            digest.generated_at.format("%Y%m%d")
        ))
    });
    let report = render::render_markdown(&digest);
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    std::fs::write(&output, report).with_context(|| format!("writing {}", output.display()))?;

    println!(
        "done: {} entries ({} sources failed, {} fallback batches) -> {}",
        digest.entries.len(),
        digest.stats.sources_failed,
        digest.stats.batches_fallback,
        output.display()
    );
    Ok(())
}
