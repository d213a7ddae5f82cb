// src/fetch.rs
//! Fetch coordination: every source, bounded concurrency, per-fetch
//! deadline.
//!
//! At most `fetch_concurrency` fetches are in flight; as one finishes the
//! next queued endpoint starts, so worst-case wall clock is
//! `ceil(sources / limit) * timeout`, not `sources * timeout`. A failing or
//! hanging source costs only itself: it is recorded, contributes zero
//! items, and its permit is released the moment the timeout fires.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::feed::{FeedFetcher, RawItem};
use crate::sources::SourceEndpoint;

/// One endpoint that contributed nothing, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedSource {
    pub name: String,
    pub error: String,
}

/// Merged result of the fetch stage.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Concatenation of all successful item sequences. Order across sources
    /// is not significant.
    pub items: Vec<RawItem>,
    pub failed: Vec<FailedSource>,
    pub sources_total: usize,
}

impl FetchOutcome {
    pub fn sources_ok(&self) -> usize {
        self.sources_total - self.failed.len()
    }
}

/// Fetch all sources. The returned collections are owned and merged only by
/// this coordinating task; workers hand results back through the `JoinSet`.
pub async fn fetch_all(
    fetcher: Arc<dyn FeedFetcher>,
    sources: &[SourceEndpoint],
    timeout: Duration,
    concurrency: usize,
) -> FetchOutcome {
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut set: JoinSet<(String, Result<Vec<RawItem>, FetchError>)> = JoinSet::new();

    for source in sources.iter().cloned() {
        let fetcher = Arc::clone(&fetcher);
        let semaphore = Arc::clone(&semaphore);
        set.spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
            let result = match tokio::time::timeout(timeout, fetcher.fetch_items(&source)).await {
                Ok(r) => r,
                // The inner future is dropped here: a stuck fetch is
                // hard-cancelled and its permit freed for the next endpoint.
                Err(_) => Err(FetchError::TimedOut(timeout)),
            };
            (source.name, result)
        });
    }

    let mut outcome = FetchOutcome {
        sources_total: sources.len(),
        ..Default::default()
    };

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((name, Ok(mut items))) => {
                debug!(source = %name, items = items.len(), "feed fetched");
                outcome.items.append(&mut items);
            }
            Ok((name, Err(e))) => {
                warn!(source = %name, error = %e, "feed fetch failed");
                counter!("digest_fetch_errors_total").increment(1);
                outcome.failed.push(FailedSource {
                    name,
                    error: e.to_string(),
                });
            }
            Err(e) => {
                warn!(error = %e, "fetch task join error");
                counter!("digest_fetch_errors_total").increment(1);
                outcome.failed.push(FailedSource {
                    name: "<task>".to_string(),
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        sources = outcome.sources_total,
        ok = outcome.sources_ok(),
        failed = outcome.failed.len(),
        items = outcome.items.len(),
        "fetch stage complete"
    );
    outcome
}
