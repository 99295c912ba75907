use crate::config::Config;
use crate::topics::ScrapedItem;
use crate::{logi, logw};
use anyhow::{Context, Result};
use rand::Rng;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// How far back a trending query looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindow {
    PastDay,
    PastTwoDays,
}

impl TimeWindow {
    pub fn code(self) -> &'static str {
        match self {
            TimeWindow::PastDay => "d1",
            TimeWindow::PastTwoDays => "d2",
        }
    }

    pub fn days(self) -> u32 {
        match self {
            TimeWindow::PastDay => 1,
            TimeWindow::PastTwoDays => 2,
        }
    }

    pub fn random<R: Rng>(rng: &mut R) -> Self {
        if rng.gen_bool(0.5) {
            TimeWindow::PastDay
        } else {
            TimeWindow::PastTwoDays
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "d1" => Some(TimeWindow::PastDay),
            "d2" => Some(TimeWindow::PastTwoDays),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    q: &'a str,
    gl: &'a str,
    hl: &'a str,
    tbs: String,
    num: u32,
}

pub struct SerperClient {
    client: Client,
    api_key: String,
    url: String,
}

impl SerperClient {
    pub fn new(client: Client, api_key: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            url: url.into(),
        }
    }

    pub fn from_config(client: Client, cfg: &Config) -> Result<Self> {
        let key = cfg.require_serper_key()?;
        Ok(Self::new(client, key, &cfg.serper_url))
    }

    /// US/English results for `query` within `window`. Non-success responses
    /// are logged and produce an empty list.
    pub async fn trending_topics(
        &self,
        query: &str,
        window: TimeWindow,
        num_results: u32,
    ) -> Result<Vec<ScrapedItem>> {
        let body = SearchRequest {
            q: query,
            gl: "us",
            hl: "en",
            tbs: format!("qdr:{}", window.code()),
            num: num_results,
        };

        let resp = self
            .client
            .post(&self.url)
            .header("X-API-KEY", &self.api_key)
            .json(&body)
            .timeout(Duration::from_secs(60))
            .send()
            .await
            .context("Serper request failed")?;

        let status = resp.status();
        let raw = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            logw(format!("Serper HTTP {}", status.as_u16()));
            logw(raw.chars().take(800).collect::<String>());
            return Ok(Vec::new());
        }

        let results: Value = match serde_json::from_str(&raw) {
            Ok(v) => v,
            Err(err) => {
                logw(format!("Serper response parse failed: {}", err));
                return Ok(Vec::new());
            }
        };

        let topics = extract_topics(&results);
        logi(format!("Serper '{}' returned {} results", query, topics.len()));
        Ok(topics)
    }
}

/// Organic results first, then news results (which also carry a date).
pub fn extract_topics(results: &Value) -> Vec<ScrapedItem> {
    let field = |item: &Value, key: &str| -> String {
        item.get(key)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };

    let mut topics = Vec::new();

    if let Some(organic) = results.get("organic").and_then(|v| v.as_array()) {
        for item in organic {
            topics.push(ScrapedItem {
                title: field(item, "title"),
                snippet: field(item, "snippet"),
                link: field(item, "link"),
                source: field(item, "source"),
                date: None,
            });
        }
    }

    if let Some(news) = results.get("news").and_then(|v| v.as_array()) {
        for item in news {
            topics.push(ScrapedItem {
                title: field(item, "title"),
                snippet: field(item, "snippet"),
                link: field(item, "link"),
                source: field(item, "source"),
                date: Some(field(item, "date")),
            });
        }
    }

    topics
}
