use crate::config::Config;
use crate::error::PipelineError;
use crate::{logi, logw};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

const MAX_PROMPT_CHARS: usize = 200_000;

/// Anything that turns a prompt into generated text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(client: Client, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
        }
    }

    pub fn from_config(client: Client, cfg: &Config) -> Result<Self> {
        let key = cfg.require_gemini_key()?;
        Ok(Self::new(client, key, &cfg.gemini_model).with_base_url(&cfg.gemini_base_url))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let prompt = trim_copy_utf8_safe(prompt, MAX_PROMPT_CHARS);
        let body = json!({
            "contents": [
                {"parts": [{"text": prompt}]}
            ]
        });

        logi(format!("Requesting {} ({} prompt chars)...", self.model, prompt.len()));
        let resp = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .timeout(Duration::from_secs(300))
            .send()
            .await
            .context("Gemini request failed")?;

        let status = resp.status();
        let raw = resp.text().await.unwrap_or_default();

        if !status.is_success() {
            let snippet = raw.chars().take(800).collect::<String>();
            logw(format!("Gemini HTTP {}", status.as_u16()));
            if let Some(message) = gemini_error_message(&raw) {
                return Err(PipelineError::Api {
                    service: "Gemini",
                    message,
                }
                .into());
            }
            return Err(PipelineError::Http {
                service: "Gemini",
                status: status.as_u16(),
                body: snippet,
            }
            .into());
        }

        extract_candidate_text(&raw)
    }
}

fn trim_copy_utf8_safe(input: &str, max_bytes: usize) -> &str {
    if input.len() <= max_bytes {
        return input;
    }
    let mut cut = max_bytes;
    while cut > 0 && !input.is_char_boundary(cut) {
        cut -= 1;
    }
    &input[..cut]
}

fn gemini_error_message(raw: &str) -> Option<String> {
    let root: serde_json::Value = serde_json::from_str(raw).ok()?;
    let err = root.get("error")?;
    let message = err.get("message").and_then(|v| v.as_str()).unwrap_or("unknown error");
    let status = err.get("status").and_then(|v| v.as_str());
    Some(match status {
        Some(status) => format!("{message} ({status})"),
        None => message.to_string(),
    })
}

/// Concatenates every text part of the first candidate.
pub fn extract_candidate_text(raw: &str) -> Result<String> {
    if let Some(message) = gemini_error_message(raw) {
        return Err(PipelineError::Api {
            service: "Gemini",
            message,
        }
        .into());
    }

    let root: serde_json::Value =
        serde_json::from_str(raw).context("Gemini response is not JSON")?;

    let parts = root
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array());

    let text: String = parts
        .into_iter()
        .flatten()
        .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
        .collect();

    if text.is_empty() {
        let reason = root
            .pointer("/promptFeedback/blockReason")
            .and_then(|v| v.as_str())
            .unwrap_or("no candidates returned");
        return Err(PipelineError::Api {
            service: "Gemini",
            message: reason.to_string(),
        }
        .into());
    }

    Ok(text)
}
