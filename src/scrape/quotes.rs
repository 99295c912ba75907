use super::{element_text, selector};
use crate::topics::{QuoteRecord, save_items};
use crate::{logok, logw};
use anyhow::{Context, Result};
use chrono::Local;
use once_cell::sync::OnceCell;
use regex::Regex;
use scraper::Html;
use std::path::Path;

const ATTRIBUTION_DASH: char = '―';

pub struct QuoteScraper {
    client: reqwest::Client,
    url: String,
    author: String,
}

impl QuoteScraper {
    pub fn new(client: reqwest::Client, url: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            author: author.into(),
        }
    }

    /// Scrapes the quotes page and persists the result to `out_path`.
    /// Failures are logged and yield an empty list.
    pub async fn scrape_to(&self, out_path: &Path) -> Vec<QuoteRecord> {
        match self.try_scrape(out_path).await {
            Ok(quotes) => quotes,
            Err(err) => {
                logw(format!("Error scraping quotes: {err:#}"));
                Vec::new()
            }
        }
    }

    async fn try_scrape(&self, out_path: &Path) -> Result<Vec<QuoteRecord>> {
        let page = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let today = Local::now().format("%Y-%m-%d").to_string();
        let quotes = parse_quotes(&page, &self.author, &today)?;
        save_items(out_path, &quotes).await?;
        logok(format!("Successfully scraped {} quotes from {}.", quotes.len(), self.author));
        Ok(quotes)
    }
}

/// Reads `.quoteText` blocks, dropping the attribution and quote marks.
pub fn parse_quotes(html: &str, author: &str, date: &str) -> Result<Vec<QuoteRecord>> {
    let doc = Html::parse_document(html);
    let quote_text = selector(".quoteText")?;

    let mut quotes = Vec::new();
    for el in doc.select(&quote_text) {
        let text = element_text(el);
        let quote = clean_quote(text.split(ATTRIBUTION_DASH).next().unwrap_or_default())?;
        if quote.is_empty() {
            continue;
        }
        quotes.push(QuoteRecord {
            quote,
            author: author.to_string(),
            source: "Goodreads".to_string(),
            date_scraped: date.to_string(),
        });
    }

    Ok(quotes)
}

fn clean_quote(raw: &str) -> Result<String> {
    let stripped = quote_marks_regex()?.replace_all(raw, "");
    Ok(whitespace_regex()?
        .replace_all(stripped.trim(), " ")
        .into_owned())
}

fn quote_marks_regex() -> Result<&'static Regex> {
    static QUOTE_MARKS_RE: OnceCell<Regex> = OnceCell::new();
    QUOTE_MARKS_RE.get_or_try_init(|| {
        Regex::new(r#"["“”]"#).context("failed to compile quote-mark regex")
    })
}

fn whitespace_regex() -> Result<&'static Regex> {
    static WHITESPACE_RE: OnceCell<Regex> = OnceCell::new();
    WHITESPACE_RE.get_or_try_init(|| {
        Regex::new(r"\s+").context("failed to compile whitespace regex")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_attribution_and_quote_marks() {
        let html = r#"<div class="quote"><div class="quoteText">
      “You have power over your mind - not outside events.
      Realize this, and you will find strength.”
    <br>  ―
    <span class="authorOrTitle">Marcus Aurelius,</span>
    </div></div>
    <div class="quoteText">   ―  <span>Nobody</span></div>
    <div class="quoteText">"The soul becomes dyed with the color of its thoughts." ― Marcus</div>"#;

        let quotes = parse_quotes(html, "Marcus Aurelius", "2026-10-19").unwrap();
        assert_eq!(quotes.len(), 2);
        assert_eq!(
            quotes[0].quote,
            "You have power over your mind - not outside events. Realize this, and you will find strength."
        );
        assert_eq!(quotes[0].source, "Goodreads");
        assert_eq!(quotes[0].date_scraped, "2026-10-19");
        assert_eq!(quotes[1].quote, "The soul becomes dyed with the color of its thoughts.");
    }

    #[test]
    fn page_without_quotes_is_empty() {
        assert!(parse_quotes("<html></html>", "a", "d").unwrap().is_empty());
    }
}
