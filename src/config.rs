// src/config.rs
//! Runtime configuration for a digest run.
//!
//! Everything here is a runtime parameter, not a compiled constant; the CLI
//! maps its flags onto this struct and `validate()` rejects nonsense before
//! the pipeline spends any network budget.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Output language for summaries, reasons and the overview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    #[default]
    Zh,
    En,
}

impl Lang {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lang::Zh => "zh",
            Lang::En => "en",
        }
    }
}

impl std::str::FromStr for Lang {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "zh" => Ok(Lang::Zh),
            "en" => Ok(Lang::En),
            other => Err(format!("unsupported language `{other}` (expected zh|en)")),
        }
    }
}

/// Fixed weights for the composite score. Not derived, not adaptive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub relevance: f64,
    pub quality: f64,
    pub timeliness: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            relevance: 1.0,
            quality: 1.0,
            timeliness: 1.0,
        }
    }
}

impl ScoreWeights {
    pub fn sum(&self) -> f64 {
        self.relevance + self.quality + self.timeliness
    }
}

/// Knobs for one digest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigestConfig {
    /// Recency window: articles older than `now - window_hours` are dropped.
    pub window_hours: i64,
    /// How many ranked entries the digest keeps.
    pub top_n: usize,
    /// Language for model-written text.
    pub lang: Lang,
    /// Max feed fetches in flight at once.
    pub fetch_concurrency: usize,
    /// Hard deadline per feed fetch.
    pub fetch_timeout: Duration,
    /// Articles per scoring request.
    pub batch_size: usize,
    /// Max scoring requests in flight at once. Kept independent of (and
    /// lower than) `fetch_concurrency`: the judgment service is rate- and
    /// cost-bound, feeds are only I/O-bound.
    pub score_concurrency: usize,
    pub weights: ScoreWeights,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            window_hours: 24,
            top_n: 15,
            lang: Lang::default(),
            fetch_concurrency: 10,
            fetch_timeout: Duration::from_secs(15),
            batch_size: 10,
            score_concurrency: 2,
            weights: ScoreWeights::default(),
        }
    }
}

impl DigestConfig {
    /// Fail-fast validation, distinct from runtime failures. `top_n == 0`
    /// is allowed (an empty digest is a valid terminal state).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_hours <= 0 {
            return Err(ConfigError::invalid(
                "window_hours",
                format!("must be positive, got {}", self.window_hours),
            ));
        }
        if self.fetch_concurrency == 0 {
            return Err(ConfigError::invalid("fetch_concurrency", "must be >= 1"));
        }
        if self.score_concurrency == 0 {
            return Err(ConfigError::invalid("score_concurrency", "must be >= 1"));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::invalid("batch_size", "must be >= 1"));
        }
        if self.fetch_timeout.is_zero() {
            return Err(ConfigError::invalid("fetch_timeout", "must be non-zero"));
        }
        let w = &self.weights;
        if !(w.relevance >= 0.0 && w.quality >= 0.0 && w.timeliness >= 0.0) {
            return Err(ConfigError::invalid("weights", "must be non-negative"));
        }
        if w.sum() <= 0.0 {
            return Err(ConfigError::invalid("weights", "must sum to > 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(DigestConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_top_n_is_valid() {
        let cfg = DigestConfig {
            top_n: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_zero_concurrency_and_batch() {
        let cfg = DigestConfig {
            fetch_concurrency: 0,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid { field: "fetch_concurrency", .. })
        ));

        let cfg = DigestConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = DigestConfig {
            score_concurrency: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_degenerate_weights() {
        let cfg = DigestConfig {
            weights: ScoreWeights {
                relevance: 0.0,
                quality: 0.0,
                timeliness: 0.0,
            },
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = DigestConfig {
            window_hours: -1,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn lang_parses_case_insensitively() {
        assert_eq!("ZH".parse::<Lang>().unwrap(), Lang::Zh);
        assert_eq!("en".parse::<Lang>().unwrap(), Lang::En);
        assert!("fr".parse::<Lang>().is_err());
    }
}
