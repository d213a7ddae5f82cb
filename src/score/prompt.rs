// src/score/prompt.rs
//! Prompt construction and response parsing for batch scoring.
//!
//! The protocol disambiguates by explicit `index` within the batch: the
//! prompt numbers every article and the model must echo the number back.
//! Parsing is defensive — fenced JSON is unwrapped, scores clamped to
//! [1,10], unknown categories mapped to `other`, keywords capped at four.

use serde::Deserialize;

use crate::config::Lang;
use crate::normalize::Article;
use crate::score::{Category, ScoreJudgment, FALLBACK_SCORE};

const PROMPT_EXCERPT_CHARS: usize = 300;

/// Build the batch scoring prompt. Articles are numbered by their position
/// in `batch`.
pub fn build_scoring_prompt(batch: &[Article], lang: Lang) -> String {
    let articles_list = batch
        .iter()
        .enumerate()
        .map(|(i, a)| {
            let excerpt: String = a.excerpt.chars().take(PROMPT_EXCERPT_CHARS).collect();
            format!("Index {i}: [{}] {}\n{}", a.source_name, a.title, excerpt)
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n");

    let lang_instruction = match lang {
        Lang::Zh => "摘要 (summary) 和推荐理由 (reason) 请用中文撰写。如果原文是英文，请翻译为中文。",
        Lang::En => "Write the summary and reason in English.",
    };

    format!(
        r#"你是一个技术内容策展人，正在为一份面向技术爱好者的每日精选摘要筛选文章。

请对以下文章进行三个维度的评分（1-10 整数，10 分最高），为每篇文章分配一个分类标签、提取 2-4 个关键词，并撰写摘要和推荐理由。

## 评分维度

### 1. 相关性 (relevance) - 对技术/编程/AI/互联网从业者的价值
- 10: 所有技术人都应该知道的重大事件/突破
- 7-9: 对大部分技术从业者有价值
- 4-6: 对特定技术领域有价值
- 1-3: 与技术行业关联不大

### 2. 质量 (quality) - 文章本身的深度和写作质量
- 10: 深度分析，原创洞见，引用丰富
- 7-9: 有深度，观点独到
- 4-6: 信息准确，表达清晰
- 1-3: 浅尝辄止或纯转述

### 3. 时效性 (timeliness) - 当前是否值得阅读
- 10: 正在发生的重大事件/刚发布的重要工具
- 7-9: 近期热点相关
- 4-6: 常青内容，不过时
- 1-3: 过时或无时效价值

## 分类标签（必须从以下选一个）
- ai-ml: AI、机器学习、LLM、深度学习相关
- security: 安全、隐私、漏洞、加密相关
- engineering: 软件工程、架构、编程语言、系统设计
- tools: 开发工具、开源项目、新发布的库/框架
- opinion: 行业观点、个人思考、职业发展、文化评论
- other: 以上都不太适合的

## 关键词提取
提取 2-4 个最能代表文章主题的关键词（用英文，简短，如 "Rust", "LLM", "database", "performance"）

## 摘要与推荐理由
- summary: 2-4 句话的摘要，直接说重点，包含具体的技术名词、数据或观点。
- reason: 1 句话说明"为什么值得读"（摘要说"是什么"，推荐理由说"为什么"）。
{lang_instruction}

## 待评分文章

{articles_list}

请严格按 JSON 格式返回，不要包含 markdown 代码块或其他文字：
{{
  "results": [
    {{
      "index": 0,
      "relevance": 8,
      "quality": 7,
      "timeliness": 9,
      "category": "engineering",
      "keywords": ["Rust", "compiler", "performance"],
      "summary": "摘要内容...",
      "reason": "推荐理由..."
    }}
  ]
}}"#
    )
}

#[derive(Debug, Deserialize)]
struct ScoringResponse {
    #[serde(default)]
    results: Vec<ScoringRow>,
}

#[derive(Debug, Deserialize)]
struct ScoringRow {
    index: Option<i64>,
    relevance: Option<serde_json::Value>,
    quality: Option<serde_json::Value>,
    timeliness: Option<serde_json::Value>,
    category: Option<String>,
    keywords: Option<Vec<String>>,
    summary: Option<String>,
    reason: Option<String>,
}

/// Parse the model reply into per-position judgments for a batch of
/// `batch_len` articles. Positions without a usable row stay `None`; the
/// caller substitutes fallbacks so siblings that parsed keep their real
/// judgments.
pub fn parse_scoring_response(
    text: &str,
    batch_len: usize,
) -> Result<Vec<Option<ScoreJudgment>>, String> {
    let json = strip_code_fences(text);
    let parsed: ScoringResponse = serde_json::from_str(json).map_err(|e| e.to_string())?;

    let mut out: Vec<Option<ScoreJudgment>> = vec![None; batch_len];
    for row in parsed.results {
        let Some(idx) = row.index.and_then(|i| usize::try_from(i).ok()) else {
            continue;
        };
        if idx >= batch_len {
            continue;
        }
        out[idx] = Some(ScoreJudgment {
            relevance: clamp_score(row.relevance.as_ref()),
            quality: clamp_score(row.quality.as_ref()),
            timeliness: clamp_score(row.timeliness.as_ref()),
            category: row
                .category
                .as_deref()
                .map(Category::parse)
                .unwrap_or(Category::Other),
            keywords: row
                .keywords
                .unwrap_or_default()
                .into_iter()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .take(4)
                .collect(),
            summary: row.summary.unwrap_or_default().trim().to_string(),
            reason: row.reason.unwrap_or_default().trim().to_string(),
        });
    }
    Ok(out)
}

/// Clamp a JSON number (int or float) into [1,10]; missing/non-numeric
/// values get the neutral constant.
fn clamp_score(v: Option<&serde_json::Value>) -> u8 {
    let n = match v {
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(FALLBACK_SCORE as i64),
        _ => FALLBACK_SCORE as i64,
    };
    n.clamp(1, 10) as u8
}

/// Strip a surrounding markdown code fence (``` or ```json) if present.
pub fn strip_code_fences(text: &str) -> &str {
    let t = text.trim();
    let Some(rest) = t.strip_prefix("```") else {
        return t;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_prefix('\n').unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
