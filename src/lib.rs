// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod config;
pub mod digest;
pub mod error;
pub mod feed;
pub mod fetch;
pub mod normalize;
pub mod pipeline;
pub mod rank;
pub mod render;
pub mod score;
pub mod sources;

// ---- Re-exports for stable public API ----
pub use crate::config::{DigestConfig, Lang, ScoreWeights};
pub use crate::digest::{DigestResult, RunStats};
pub use crate::error::{ConfigError, FetchError, ScoreServiceError, SynthesisError};
pub use crate::feed::{FeedFetcher, HttpFeedFetcher, RawItem};
pub use crate::normalize::Article;
pub use crate::rank::RankedEntry;
pub use crate::score::client::{AiClient, OpenAiClient};
pub use crate::score::{Category, JudgmentOrigin, ScoreJudgment, ScoredArticle};
pub use crate::sources::SourceEndpoint;
