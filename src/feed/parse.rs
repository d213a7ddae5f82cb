// src/feed/parse.rs
//! RSS 2.0 / Atom parsing via quick-xml serde.
//!
//! Feeds in the wild are messy: CDATA titles, bare HTML entities that are
//! not legal XML, `guid`-only links, `dc:date` instead of `pubDate`. Unknown
//! or missing fields degrade to empty strings; an item survives if it has a
//! title or a link.

use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::error::FetchError;
use crate::feed::RawItem;
use crate::sources::SourceEndpoint;

// ---------------------------------------------------------------------------
// RSS 2.0
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    guid: Option<Guid>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    // Dublin Core fallback used by some blog engines. quick-xml's serde
    // deserializer reports namespaced elements by local name only.
    #[serde(rename = "date")]
    dc_date: Option<String>,
    description: Option<Text>,
    #[serde(rename = "encoded")]
    content_encoded: Option<Text>,
}

/// `<guid isPermaLink="...">` carries an attribute, so it needs its own
/// struct to reach the text node.
#[derive(Debug, Deserialize)]
struct Guid {
    #[serde(rename = "$text")]
    value: Option<String>,
}

/// Element whose text may sit next to attributes (e.g. `type="html"`).
#[derive(Debug, Deserialize)]
struct Text {
    #[serde(rename = "$text")]
    value: Option<String>,
}

impl Text {
    fn into_string(self) -> String {
        self.value.unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Atom
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<Text>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    published: Option<String>,
    updated: Option<String>,
    summary: Option<Text>,
    content: Option<Text>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Parse a feed body, RSS or Atom, into raw items.
pub fn parse_feed(body: &str, source: &SourceEndpoint) -> Result<Vec<RawItem>, FetchError> {
    let t0 = std::time::Instant::now();
    let xml = scrub_html_entities_for_xml(body);

    let items = match root_element(&xml) {
        Some("feed") => parse_atom(&xml, source)?,
        _ => parse_rss(&xml, source)?,
    };

    histogram!("digest_feed_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    counter!("digest_feed_items_total").increment(items.len() as u64);
    Ok(items)
}

/// Local name of the document's root element, skipping prolog/comments.
fn root_element(xml: &str) -> Option<&str> {
    let mut rest = xml;
    loop {
        let lt = rest.find('<')?;
        let tag = &rest[lt + 1..];
        if tag.starts_with('?') || tag.starts_with('!') {
            let gt = tag.find('>')?;
            rest = &tag[gt + 1..];
            continue;
        }
        let end = tag.find(|c: char| c.is_whitespace() || c == '>' || c == '/')?;
        return Some(&tag[..end]);
    }
}

fn parse_rss(xml: &str, source: &SourceEndpoint) -> Result<Vec<RawItem>, FetchError> {
    let rss: Rss = from_str(xml).map_err(|e| FetchError::Parse(e.to_string()))?;

    let mut out = Vec::with_capacity(rss.channel.items.len());
    for it in rss.channel.items {
        let link = it
            .link
            .filter(|l| !l.trim().is_empty())
            .or_else(|| it.guid.and_then(|g| g.value))
            .unwrap_or_default();
        let published = it.pub_date.or(it.dc_date).unwrap_or_default();
        let summary = it
            .content_encoded
            .map(Text::into_string)
            .filter(|s| !s.trim().is_empty())
            .or_else(|| it.description.map(Text::into_string))
            .unwrap_or_default();

        push_item(
            &mut out,
            source,
            it.title.unwrap_or_default(),
            link,
            published,
            summary,
        );
    }
    Ok(out)
}

fn parse_atom(xml: &str, source: &SourceEndpoint) -> Result<Vec<RawItem>, FetchError> {
    let feed: AtomFeed = from_str(xml).map_err(|e| FetchError::Parse(e.to_string()))?;

    let mut out = Vec::with_capacity(feed.entries.len());
    for entry in feed.entries {
        // Prefer rel="alternate", accept a rel-less link, ignore the rest.
        let mut link = String::new();
        for l in &entry.links {
            let rel = l.rel.as_deref().unwrap_or("");
            if let Some(href) = l.href.as_deref() {
                if !href.is_empty() && (rel == "alternate" || rel.is_empty()) {
                    link = href.to_string();
                    break;
                }
            }
        }
        let published = entry.published.or(entry.updated).unwrap_or_default();
        let summary = entry
            .summary
            .map(Text::into_string)
            .filter(|s| !s.trim().is_empty())
            .or_else(|| entry.content.map(Text::into_string))
            .unwrap_or_default();

        push_item(
            &mut out,
            source,
            entry.title.map(Text::into_string).unwrap_or_default(),
            link,
            published,
            summary,
        );
    }
    Ok(out)
}

fn push_item(
    out: &mut Vec<RawItem>,
    source: &SourceEndpoint,
    title: String,
    link: String,
    published: String,
    summary: String,
) {
    if title.trim().is_empty() && link.trim().is_empty() {
        return;
    }
    out.push(RawItem {
        title,
        link,
        published: published.trim().to_string(),
        summary,
        source_name: source.name.clone(),
        source_url: source.site_url.clone(),
    });
}

/// Bare HTML entities are not valid XML; replace the usual offenders before
/// handing the document to quick-xml.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn src() -> SourceEndpoint {
        SourceEndpoint {
            name: "example.test".into(),
            feed_url: "https://example.test/rss".into(),
            site_url: "https://example.test".into(),
        }
    }

    #[test]
    fn root_element_skips_prolog_and_comments() {
        assert_eq!(
            root_element("<?xml version=\"1.0\"?>\n<!-- hi -->\n<feed xmlns=\"x\">"),
            Some("feed")
        );
        assert_eq!(root_element("<rss version=\"2.0\"><channel/></rss>"), Some("rss"));
        assert_eq!(root_element("no xml here"), None);
    }

    #[test]
    fn rss_guid_fallback_and_dc_date() {
        let xml = r#"<?xml version="1.0"?>
        <rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/">
          <channel>
            <title>c</title>
            <item>
              <title><![CDATA[Hello <b>World</b>]]></title>
              <guid isPermaLink="true">https://example.test/post/1</guid>
              <dc:date>2025-06-01T10:00:00Z</dc:date>
              <description>first</description>
            </item>
            <item>
              <title>No link at all</title>
            </item>
          </channel>
        </rss>"#;
        let items = parse_feed(xml, &src()).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].link, "https://example.test/post/1");
        assert_eq!(items[0].published, "2025-06-01T10:00:00Z");
        assert_eq!(items[1].link, "");
    }

    #[test]
    fn atom_prefers_alternate_link_and_published() {
        let xml = r#"<?xml version="1.0"?>
        <feed xmlns="http://www.w3.org/2005/Atom">
          <entry>
            <title type="html">Entry one</title>
            <link rel="self" href="https://example.test/feed"/>
            <link rel="alternate" href="https://example.test/a"/>
            <published>2025-06-01T10:00:00Z</published>
            <updated>2025-06-02T10:00:00Z</updated>
            <summary>sum</summary>
          </entry>
          <entry>
            <title>Entry two</title>
            <link href="https://example.test/b"/>
            <updated>2025-06-03T10:00:00Z</updated>
            <content type="html">&lt;p&gt;body&lt;/p&gt;</content>
          </entry>
        </feed>"#;
        let items = parse_feed(xml, &src()).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].link, "https://example.test/a");
        assert_eq!(items[0].published, "2025-06-01T10:00:00Z");
        assert_eq!(items[0].summary, "sum");
        assert_eq!(items[1].link, "https://example.test/b");
        // No <published>: falls back to <updated>.
        assert_eq!(items[1].published, "2025-06-03T10:00:00Z");
    }

    #[test]
    fn empty_feed_is_ok_and_garbage_is_parse_error() {
        let empty = r#"<rss version="2.0"><channel><title>c</title></channel></rss>"#;
        assert!(parse_feed(empty, &src()).unwrap().is_empty());

        let err = parse_feed("this is not xml", &src()).unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[test]
    fn scrubs_bare_html_entities() {
        let xml = r#"<rss version="2.0"><channel><item>
            <title>A&nbsp;&ndash;&nbsp;B</title>
            <link>https://example.test/x</link>
        </item></channel></rss>"#;
        let items = parse_feed(xml, &src()).unwrap();
        assert_eq!(items[0].title, "A - B");
    }
}
