// src/normalize.rs
//! Raw feed items -> canonical [`Article`]s.
//!
//! Pure and deterministic: the same `RawItem` always yields the same article
//! or the same exclusion. Policies fixed here:
//!
//! * timestamps that are absent or unparsable exclude the item (defaulting
//!   them to "now" would admit undated items into every window and make
//!   reruns drift);
//! * the recency window is `(now - window_hours, now]` — an item exactly at
//!   the cutoff is out, items newer than `now` are treated as clock skew and
//!   dropped;
//! * two items whose links canonicalize identically are the same article;
//!   the first occurrence wins within a run.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::OnceCell;
use sha2::{Digest, Sha256};
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

use crate::feed::RawItem;

const EXCERPT_MAX_CHARS: usize = 500;

/// Canonical unit flowing through scoring and ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    /// Short hex digest of the canonicalized link; stable and unique within
    /// a run.
    pub id: String,
    pub title: String,
    pub link: String,
    pub source_name: String,
    pub source_url: String,
    pub published_at: DateTime<Utc>,
    pub excerpt: String,
}

/// Exclusion counts for observability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    pub input: usize,
    pub kept: usize,
    /// Timestamp absent or unparsable.
    pub undated: usize,
    pub out_of_window: usize,
    pub duplicate: usize,
}

/// Normalize, window-filter and dedup raw items. `now` is passed in so the
/// transformation stays pure.
pub fn normalize_items(
    raw: Vec<RawItem>,
    now: DateTime<Utc>,
    window_hours: i64,
) -> (Vec<Article>, NormalizeStats) {
    let cutoff = now - chrono::Duration::hours(window_hours);
    let mut stats = NormalizeStats {
        input: raw.len(),
        ..Default::default()
    };

    let mut seen_ids = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(raw.len());

    for item in raw {
        let published_at = match parse_published(&item.published) {
            Some(ts) => ts,
            None => {
                stats.undated += 1;
                continue;
            }
        };
        if published_at <= cutoff || published_at > now {
            stats.out_of_window += 1;
            continue;
        }

        let link = canonical_link(&item.link);
        let title = normalize_text(&item.title);
        let id = if link.is_empty() {
            article_id(&format!("{}:{}", item.source_name, title))
        } else {
            article_id(&link)
        };
        if !seen_ids.insert(id.clone()) {
            stats.duplicate += 1;
            continue;
        }

        let mut excerpt = normalize_text(&item.summary);
        if excerpt.chars().count() > EXCERPT_MAX_CHARS {
            excerpt = excerpt.chars().take(EXCERPT_MAX_CHARS).collect();
        }

        out.push(Article {
            id,
            title,
            link,
            source_name: item.source_name,
            source_url: item.source_url,
            published_at,
            excerpt,
        });
    }

    stats.kept = out.len();
    (out, stats)
}

/// Normalize text: decode HTML entities, strip tags, straighten quotes,
/// collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();

    out.trim().to_string()
}

/// Multi-strategy timestamp parse: RFC 2822, RFC 3339, then the naive
/// formats some feeds emit. Naive values are taken as UTC.
pub fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = OffsetDateTime::parse(s, &Rfc2822) {
        return from_unix(dt.unix_timestamp());
    }
    if let Ok(dt) = OffsetDateTime::parse(s, &Rfc3339) {
        return from_unix(dt.unix_timestamp());
    }
    // chrono is more forgiving about RFC 2822 oddities (obsolete zone names).
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|n| n.and_utc());
    }
    None
}

fn from_unix(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

/// Canonicalize a link so cosmetic variants of the same resource share one
/// identity: trim, drop the fragment, drop a trailing slash on non-root
/// paths.
pub fn canonical_link(link: &str) -> String {
    let mut s = link.trim();
    if let Some(pos) = s.find('#') {
        s = &s[..pos];
    }
    let mut s = s.to_string();
    if s.ends_with('/') && s.matches('/').count() > 3 {
        s.pop();
    }
    s
}

/// Stable short id: first 12 hex chars of SHA-256.
pub fn article_id(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{b:02x}");
    }
    out
}
