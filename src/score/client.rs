// src/score/client.rs
//! Chat-completion client for the external judgment service.
//!
//! The [`AiClient`] trait is the seam: the scorer and the digest synthesizer
//! only ever see `complete(prompt) -> text`, so tests swap in scripted mocks
//! and the wire protocol stays in one place.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ScoreServiceError;

pub const DEFAULT_API_BASE: &str = "https://open.bigmodel.cn/api/paas/v4/";
pub const DEFAULT_MODEL: &str = "glm-4.7";

#[async_trait]
pub trait AiClient: Send + Sync {
    /// One prompt in, the model's text reply out. Any transport, status or
    /// shape problem is a [`ScoreServiceError`]; callers decide the fallback.
    async fn complete(&self, prompt: &str) -> Result<String, ScoreServiceError>;

    /// Provider label for diagnostics.
    fn name(&self) -> &'static str;
}

/// OpenAI-compatible chat-completions client.
pub struct OpenAiClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(api_key: String, api_base: &str, model: String) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!("ai-daily-digest/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
            model,
        }
    }

    /// Build from `OPENAI_API_KEY` / `OPENAI_API_BASE` / `OPENAI_MODEL`.
    /// When no model is set, infers `deepseek-chat` for DeepSeek bases and
    /// falls back to [`DEFAULT_MODEL`] otherwise.
    pub fn from_env() -> Result<Self, ScoreServiceError> {
        let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
        if api_key.trim().is_empty() {
            return Err(ScoreServiceError::Request(
                "OPENAI_API_KEY is not set".to_string(),
            ));
        }
        let api_base = std::env::var("OPENAI_API_BASE")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let model = std::env::var("OPENAI_MODEL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| infer_model(&api_base).to_string());
        Ok(Self::new(api_key.trim().to_string(), &api_base, model))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }
}

fn infer_model(api_base: &str) -> &'static str {
    if api_base.to_ascii_lowercase().contains("deepseek") {
        "deepseek-chat"
    } else {
        DEFAULT_MODEL
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    top_p: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    // String for most providers; some return an array of typed parts.
    content: serde_json::Value,
}

/// Flatten `content` whether it is a plain string or `[{type:"text",text}]`.
fn content_text(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(parts) => parts
            .iter()
            .filter(|p| p.get("type").and_then(|t| t.as_str()) == Some("text"))
            .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

#[async_trait]
impl AiClient for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String, ScoreServiceError> {
        let req = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.3,
            top_p: 0.8,
        };

        let url = format!("{}/chat/completions", self.api_base);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| ScoreServiceError::Request(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ScoreServiceError::Status {
                status: status.as_u16(),
                body: body.chars().take(300).collect(),
            });
        }

        let body: ChatResponse = resp
            .json()
            .await
            .map_err(|e| ScoreServiceError::Response(e.to_string()))?;
        let text = body
            .choices
            .first()
            .map(|c| content_text(&c.message.content))
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(ScoreServiceError::Response("empty completion".to_string()));
        }
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "openai-compatible"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_text_handles_string_and_parts() {
        assert_eq!(content_text(&serde_json::json!("hi")), "hi");
        let parts = serde_json::json!([
            {"type": "text", "text": "a"},
            {"type": "image", "url": "x"},
            {"type": "text", "text": "b"}
        ]);
        assert_eq!(content_text(&parts), "a\nb");
        assert_eq!(content_text(&serde_json::json!(42)), "");
    }

    #[test]
    fn model_inference_from_base() {
        assert_eq!(infer_model("https://api.deepseek.com/v1"), "deepseek-chat");
        assert_eq!(infer_model(DEFAULT_API_BASE), DEFAULT_MODEL);
    }
}
