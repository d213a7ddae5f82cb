// src/error.rs
//! Error taxonomy for the digest pipeline.
//!
//! Only [`ConfigError`] is fatal, and only before the pipeline starts. The
//! runtime errors are per-unit: a `FetchError` costs one source, a
//! `ScoreServiceError` costs one batch its real judgments, a
//! `SynthesisError` costs the overview text. None of them aborts the run.

use std::time::Duration;

/// Invalid configuration, rejected before any stage runs.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("source list is empty")]
    NoSources,

    #[error("invalid {field}: {message}")]
    Invalid { field: &'static str, message: String },

    #[error("reading source list: {0}")]
    SourceList(String),
}

impl ConfigError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }
}

/// One feed endpoint failed. The coordinator records it and moves on.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),

    #[error("feed parse error: {0}")]
    Parse(String),

    #[error("timed out after {0:?}")]
    TimedOut(Duration),
}

/// One scoring batch failed; every article in it gets the fallback judgment.
#[derive(Debug, thiserror::Error)]
pub enum ScoreServiceError {
    #[error("model request failed: {0}")]
    Request(String),

    #[error("model returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("model response unusable: {0}")]
    Response(String),
}

/// The overview call failed; the digest falls back to placeholder text.
#[derive(Debug, thiserror::Error)]
#[error("overview synthesis failed: {0}")]
pub struct SynthesisError(pub String);
