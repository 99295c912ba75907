pub mod hacker_news;
pub mod quotes;

use anyhow::{Context, Result};
use scraper::{ElementRef, Selector};
use std::time::Duration;

pub use hacker_news::{ArticleContent, HackerNewsScraper, Story};
pub use quotes::QuoteScraper;

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Browser-like client shared by the scrapers.
pub fn scraping_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(15))
        .build()
        .context("failed to build reqwest client")
}

pub(crate) fn selector(css: &'static str) -> Result<Selector> {
    Selector::parse(css).map_err(|err| anyhow::anyhow!("invalid selector {css}: {err}"))
}

pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>()
}
