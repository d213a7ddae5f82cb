// src/sources.rs
//! Feed source list: the static endpoints a run ingests from.
//!
//! Loaded once at startup and read-only afterwards. Supports TOML and JSON
//! list files plus an embedded default list (the curated blog set from the
//! Hacker News popularity contest) compiled in from `config/feeds.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const ENV_SOURCES_PATH: &str = "DIGEST_SOURCES_PATH";

const DEFAULT_FEEDS_TOML: &str = include_str!("../config/feeds.toml");

/// One feed endpoint. `feed_url` is fetched; `site_url` only decorates the
/// rendered report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEndpoint {
    pub name: String,
    // Aliases accept the original exported OPML-ish JSON field names.
    #[serde(alias = "xmlUrl")]
    pub feed_url: String,
    #[serde(alias = "htmlUrl", default)]
    pub site_url: String,
}

#[derive(Deserialize)]
struct SourceFile {
    sources: Vec<SourceEndpoint>,
}

/// The compiled-in default source list.
pub fn default_sources() -> Vec<SourceEndpoint> {
    static DEFAULTS: Lazy<Vec<SourceEndpoint>> = Lazy::new(|| {
        let f: SourceFile =
            toml::from_str(DEFAULT_FEEDS_TOML).expect("embedded config/feeds.toml is valid");
        clean_list(f.sources)
    });
    DEFAULTS.clone()
}

/// Load a source list from an explicit path. TOML (`[[sources]]` table) or a
/// JSON array of endpoints, chosen by extension with cross-format fallback.
pub fn load_sources_from(path: &Path) -> Result<Vec<SourceEndpoint>, ConfigError> {
    let content = fs::read_to_string(path)
        .map_err(|e| ConfigError::SourceList(format!("{}: {e}", path.display())))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_sources(&content, &ext)
        .map_err(|e| ConfigError::SourceList(format!("{}: {e}", path.display())))
}

/// Resolve the source list:
/// 1) explicit `path` argument
/// 2) `$DIGEST_SOURCES_PATH`
/// 3) embedded defaults
pub fn load_sources(path: Option<&Path>) -> Result<Vec<SourceEndpoint>, ConfigError> {
    if let Some(p) = path {
        return load_sources_from(p);
    }
    if let Ok(p) = std::env::var(ENV_SOURCES_PATH) {
        let pb = PathBuf::from(p);
        if !pb.exists() {
            return Err(ConfigError::SourceList(format!(
                "{ENV_SOURCES_PATH} points to non-existent path {}",
                pb.display()
            )));
        }
        return load_sources_from(&pb);
    }
    Ok(default_sources())
}

fn parse_sources(s: &str, hint_ext: &str) -> Result<Vec<SourceEndpoint>, String> {
    let try_toml = hint_ext == "toml" || s.contains("[[sources]]");
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err("unsupported source list format (expected TOML [[sources]] or JSON array)".to_string())
}

fn parse_toml(s: &str) -> Result<Vec<SourceEndpoint>, String> {
    let f: SourceFile = toml::from_str(s).map_err(|e| e.to_string())?;
    Ok(clean_list(f.sources))
}

fn parse_json(s: &str) -> Result<Vec<SourceEndpoint>, String> {
    let v: Vec<SourceEndpoint> = serde_json::from_str(s).map_err(|e| e.to_string())?;
    Ok(clean_list(v))
}

/// Trim fields, drop entries without a feed URL, dedup by feed URL keeping
/// first occurrence (input order is preserved, unlike a set).
fn clean_list(items: Vec<SourceEndpoint>) -> Vec<SourceEndpoint> {
    use std::collections::HashSet;
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for mut it in items {
        it.name = it.name.trim().to_string();
        it.feed_url = it.feed_url.trim().to_string();
        it.site_url = it.site_url.trim().to_string();
        if it.feed_url.is_empty() {
            continue;
        }
        if it.name.is_empty() {
            it.name = it.feed_url.clone();
        }
        if seen.insert(it.feed_url.clone()) {
            out.push(it);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults_parse_and_are_nonempty() {
        let feeds = default_sources();
        assert!(feeds.len() > 50);
        assert!(feeds.iter().all(|f| !f.feed_url.is_empty()));
        assert!(feeds.iter().all(|f| !f.name.is_empty()));
    }

    #[test]
    fn toml_and_json_formats_parse() {
        let toml_src = r#"
            [[sources]]
            name = " A "
            feed_url = "https://a.test/rss"
            site_url = "https://a.test"

            [[sources]]
            name = ""
            feed_url = "https://b.test/atom"
        "#;
        let out = parse_sources(toml_src, "toml").unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].name, "A");
        // Nameless entries fall back to the feed URL.
        assert_eq!(out[1].name, "https://b.test/atom");

        let json_src = r#"[
            {"name": "A", "xmlUrl": "https://a.test/rss", "htmlUrl": "https://a.test"},
            {"name": "A2", "xmlUrl": "https://a.test/rss"},
            {"name": "C", "xmlUrl": ""}
        ]"#;
        let out = parse_sources(json_src, "json").unwrap();
        // Duplicate feed URL dropped, empty feed URL dropped.
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].feed_url, "https://a.test/rss");
    }

    #[test]
    fn explicit_path_and_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("feeds.json");
        std::fs::write(&p, r#"[{"name":"X","xmlUrl":"https://x.test/rss"}]"#).unwrap();
        let v = load_sources(Some(&p)).unwrap();
        assert_eq!(v.len(), 1);

        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            load_sources(Some(&missing)),
            Err(ConfigError::SourceList(_))
        ));
    }
}
