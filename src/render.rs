// src/render.rs
//! Markdown rendering of a [`DigestResult`].
//!
//! Pure string assembly; the binary decides where the report goes. Layout:
//! header, overview, top-3 showcase, then entries grouped by category
//! (largest group first).

use chrono::{DateTime, Utc};

use crate::config::Lang;
use crate::digest::DigestResult;
use crate::rank::RankedEntry;
use crate::score::Category;

fn category_meta(cat: Category, lang: Lang) -> (&'static str, &'static str) {
    match (cat, lang) {
        (Category::AiMl, _) => ("🤖", "AI / ML"),
        (Category::Security, Lang::Zh) => ("🔒", "安全"),
        (Category::Security, Lang::En) => ("🔒", "Security"),
        (Category::Engineering, Lang::Zh) => ("⚙️", "工程"),
        (Category::Engineering, Lang::En) => ("⚙️", "Engineering"),
        (Category::Tools, Lang::Zh) => ("🛠", "工具 / 开源"),
        (Category::Tools, Lang::En) => ("🛠", "Tools / OSS"),
        (Category::Opinion, Lang::Zh) => ("💡", "观点 / 杂谈"),
        (Category::Opinion, Lang::En) => ("💡", "Opinion"),
        (Category::Other, Lang::Zh) => ("📝", "其他"),
        (Category::Other, Lang::En) => ("📝", "Other"),
    }
}

/// Relative timestamp in the digest's language.
pub fn humanize_time(published_at: DateTime<Utc>, now: DateTime<Utc>, lang: Lang) -> String {
    let mins = (now - published_at).num_minutes().max(0);
    let hours = mins / 60;
    let days = hours / 24;
    match lang {
        Lang::Zh => {
            if mins < 60 {
                format!("{mins} 分钟前")
            } else if hours < 24 {
                format!("{hours} 小时前")
            } else if days < 7 {
                format!("{days} 天前")
            } else {
                published_at.format("%Y-%m-%d").to_string()
            }
        }
        Lang::En => {
            if mins < 60 {
                format!("{mins}m ago")
            } else if hours < 24 {
                format!("{hours}h ago")
            } else if days < 7 {
                format!("{days}d ago")
            } else {
                published_at.format("%Y-%m-%d").to_string()
            }
        }
    }
}

fn entry_line(e: &RankedEntry, now: DateTime<Utc>, lang: Lang) -> String {
    let a = e.article();
    let (emoji, label) = category_meta(e.judgment().category, lang);
    format!(
        "[{}]({}) — **{}** · {} · {} {} · ⭐ {:.1}/10",
        a.title,
        a.link,
        a.source_name,
        humanize_time(a.published_at, now, lang),
        emoji,
        label,
        e.composite
    )
}

/// Render the full Markdown report.
pub fn render_markdown(digest: &DigestResult) -> String {
    let lang = digest.lang;
    let now = digest.generated_at;
    let date = now.format("%Y-%m-%d");
    let s = &digest.stats;

    let mut out = String::new();

    match lang {
        Lang::Zh => {
            out.push_str(&format!("# 📰 AI 博客每日精选 — {date}\n\n"));
            out.push_str(&format!(
                "> 扫描 {} 个源（{} 个失败）→ {} 篇文章 → 窗口内 {} 篇 → 精选 {}\n\n",
                s.sources_total,
                s.sources_failed,
                s.items_fetched,
                s.items_in_window,
                digest.entries.len()
            ));
        }
        Lang::En => {
            out.push_str(&format!("# 📰 AI Blog Daily Digest — {date}\n\n"));
            out.push_str(&format!(
                "> Scanned {} sources ({} failed) → {} items → {} in window → top {}\n\n",
                s.sources_total,
                s.sources_failed,
                s.items_fetched,
                s.items_in_window,
                digest.entries.len()
            ));
        }
    }

    // Overview
    let overview_heading = match lang {
        Lang::Zh => "## 📝 今日看点\n\n",
        Lang::En => "## 📝 Today's Highlights\n\n",
    };
    out.push_str(overview_heading);
    out.push_str(&digest.overview);
    out.push_str("\n\n---\n\n");

    if digest.entries.is_empty() {
        return out;
    }

    // Top-3 showcase
    if digest.entries.len() >= 3 {
        out.push_str(match lang {
            Lang::Zh => "## 🏆 今日必读\n\n",
            Lang::En => "## 🏆 Must-Reads\n\n",
        });
        for (medal, e) in ["🥇", "🥈", "🥉"].iter().zip(&digest.entries) {
            out.push_str(&format!("{medal} **{}**\n\n", e.article().title));
            out.push_str(&entry_line(e, now, lang));
            out.push_str("\n\n");
            if !e.judgment().summary.is_empty() {
                out.push_str(&format!("> {}\n\n", e.judgment().summary));
            }
            if !e.judgment().reason.is_empty() {
                let why = match lang {
                    Lang::Zh => "💡 **为什么值得读**",
                    Lang::En => "💡 **Why read it**",
                };
                out.push_str(&format!("{why}: {}\n\n", e.judgment().reason));
            }
            if !e.judgment().keywords.is_empty() {
                out.push_str(&format!("🏷️ {}\n\n", e.judgment().keywords.join(", ")));
            }
        }
        out.push_str("---\n\n");
    }

    // Category-grouped entries, largest group first; ties by category label
    // for a stable layout.
    let mut groups: Vec<(Category, Vec<&RankedEntry>)> = Vec::new();
    for e in &digest.entries {
        let cat = e.judgment().category;
        match groups.iter_mut().find(|(c, _)| *c == cat) {
            Some((_, v)) => v.push(e),
            None => groups.push((cat, vec![e])),
        }
    }
    groups.sort_by(|a, b| {
        b.1.len()
            .cmp(&a.1.len())
            .then_with(|| a.0.as_str().cmp(b.0.as_str()))
    });

    let mut global_index = 0usize;
    for (cat, entries) in groups {
        let (emoji, label) = category_meta(cat, lang);
        out.push_str(&format!("## {emoji} {label}\n\n"));
        for e in entries {
            global_index += 1;
            out.push_str(&format!("### {global_index}. {}\n\n", e.article().title));
            out.push_str(&entry_line(e, now, lang));
            out.push_str("\n\n");
            if !e.judgment().summary.is_empty() {
                out.push_str(&format!("> {}\n\n", e.judgment().summary));
            }
            if !e.judgment().keywords.is_empty() {
                out.push_str(&format!("🏷️ {}\n\n", e.judgment().keywords.join(", ")));
            }
            out.push_str("---\n\n");
        }
    }

    out
}
