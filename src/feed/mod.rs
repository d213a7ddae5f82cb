// src/feed/mod.rs
//! Feed fetching: one endpoint in, raw items out.
//!
//! The [`FeedFetcher`] trait is the seam the coordinator (and tests) work
//! against; [`HttpFeedFetcher`] is the real implementation. A fetch is one
//! outbound GET plus a defensive RSS/Atom parse. An empty feed is a success
//! with an empty vec, never an error.

pub mod parse;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::sources::SourceEndpoint;

const USER_AGENT: &str = concat!("ai-daily-digest/", env!("CARGO_PKG_VERSION"), " (RSS Reader)");
const ACCEPT: &str = "application/rss+xml, application/atom+xml, application/xml, text/xml, */*";

/// One entry parsed out of a feed, before normalization. The publish
/// timestamp stays an unparsed string here; resolving it (and the policy for
/// when it can't be resolved) belongs to the normalizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawItem {
    pub title: String,
    pub link: String,
    /// Raw timestamp text from the feed, empty when the feed carried none.
    pub published: String,
    pub summary: String,
    pub source_name: String,
    pub source_url: String,
}

#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch_items(&self, source: &SourceEndpoint) -> Result<Vec<RawItem>, FetchError>;
}

/// Real fetcher: shared reqwest client, one GET per call.
pub struct HttpFeedFetcher {
    http: reqwest::Client,
}

impl HttpFeedFetcher {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(8))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .expect("reqwest client");
        Self { http }
    }
}

impl Default for HttpFeedFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch_items(&self, source: &SourceEndpoint) -> Result<Vec<RawItem>, FetchError> {
        let resp = self
            .http
            .get(&source.feed_url)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = resp.text().await?;
        parse::parse_feed(&body, source)
    }
}
