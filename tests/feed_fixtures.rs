// tests/feed_fixtures.rs
// Realistic feed documents (CDATA, content:encoded, dc:date, Atom link
// rels) parsed end to end, then pushed through the normalizer.

use ai_daily_digest::feed::parse::parse_feed;
use ai_daily_digest::normalize::normalize_items;
use ai_daily_digest::SourceEndpoint;
use chrono::{TimeZone, Utc};

fn source(name: &str) -> SourceEndpoint {
    SourceEndpoint {
        name: name.to_string(),
        feed_url: format!("https://{name}/feed"),
        site_url: format!("https://{name}"),
    }
}

#[test]
fn rss_fixture_parses_all_items() {
    let xml = include_str!("fixtures/rss_sample.xml");
    let items = parse_feed(xml, &source("blog.example.test")).unwrap();
    assert_eq!(items.len(), 3);

    // CDATA title survives; description preferred only when content:encoded
    // is absent.
    assert_eq!(items[0].title, "Optimizing the <code>allocator</code> path");
    assert!(items[0].summary.contains("flame graphs"));
    assert_eq!(items[0].published, "Mon, 02 Jun 2025 08:30:00 GMT");

    // guid fallback link + dc:date fallback timestamp.
    assert_eq!(items[1].link, "https://blog.example.test/releases/3.2");
    assert_eq!(items[1].published, "2025-06-01T18:00:00Z");

    assert_eq!(items[2].published, "");
}

#[test]
fn atom_fixture_parses_links_and_dates() {
    let xml = include_str!("fixtures/atom_sample.xml");
    let items = parse_feed(xml, &source("weblog.example.test")).unwrap();
    assert_eq!(items.len(), 2);

    assert_eq!(items[0].link, "https://weblog.example.test/2025/scheduler");
    assert_eq!(items[0].published, "2025-06-02T07:15:00Z");
    assert_eq!(items[1].link, "https://weblog.example.test/2025/proptest");
    // No <published>: <updated> stands in.
    assert_eq!(items[1].published, "2025-06-01T22:00:00Z");
}

#[test]
fn fixture_items_normalize_with_window_and_undated_policy() {
    let now = Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap();
    let mut raw = parse_feed(
        include_str!("fixtures/rss_sample.xml"),
        &source("blog.example.test"),
    )
    .unwrap();
    raw.extend(
        parse_feed(
            include_str!("fixtures/atom_sample.xml"),
            &source("weblog.example.test"),
        )
        .unwrap(),
    );

    let (articles, stats) = normalize_items(raw, now, 24);

    // 4 dated items are inside the 24h window; the undated one is dropped.
    assert_eq!(stats.input, 5);
    assert_eq!(stats.undated, 1);
    assert_eq!(articles.len(), 4);

    let allocator = articles
        .iter()
        .find(|a| a.link == "https://blog.example.test/posts/allocator")
        .expect("trailing slash canonicalized away");
    assert_eq!(allocator.title, "Optimizing the allocator path");
    assert!(allocator.excerpt.contains("flame graphs"));
    assert_eq!(allocator.id.len(), 12);
}
