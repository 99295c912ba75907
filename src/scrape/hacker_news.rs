use super::{element_text, selector};
use crate::topics::Linked;
use crate::{logi, logok, logw};
use anyhow::{Context, Result};
use chrono::Local;
use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

const ARTICLE_CONTENT_CHARS: usize = 1000;
const ARTICLE_TIMEOUT_SECS: u64 = 10;
const CONTENT_SELECTORS: &[&str] = &[
    "article",
    "main",
    ".article-content",
    ".post-content",
    ".entry-content",
    "#content",
    ".content",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArticleContent {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Story {
    pub id: String,
    pub title: String,
    pub link: String,
    pub points: String,
    pub author: String,
    pub comments: String,
    pub article_content: Option<ArticleContent>,
    pub scraped_at: String,
}

impl Linked for Story {
    fn link(&self) -> &str {
        &self.link
    }
}

pub struct HackerNewsScraper {
    client: reqwest::Client,
    base_url: String,
    delay: Duration,
}

impl HackerNewsScraper {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            delay: Duration::from_secs(1),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Top `limit` front-page stories with their linked article content.
    /// Any failure on the front page is logged and yields no stories.
    pub async fn get_top_stories(&self, limit: usize) -> Vec<Story> {
        match self.try_top_stories(limit).await {
            Ok(stories) => stories,
            Err(err) => {
                logw(format!("Error scraping Hacker News: {err:#}"));
                Vec::new()
            }
        }
    }

    async fn try_top_stories(&self, limit: usize) -> Result<Vec<Story>> {
        let page = self
            .client
            .get(&self.base_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let base = Url::parse(&self.base_url).context("invalid Hacker News base URL")?;
        let mut stories = parse_front_page(&page, &base, limit)?;
        logi(format!("Found {} stories on the front page", stories.len()));

        for (i, story) in stories.iter_mut().enumerate() {
            story.article_content = self.article_content(&story.link).await;
            story.scraped_at = Local::now().to_rfc3339();
            logok(format!("{}. {}", i + 1, story.title));

            tokio::time::sleep(self.delay).await;
        }

        Ok(stories)
    }

    async fn article_content(&self, url: &str) -> Option<ArticleContent> {
        if url.is_empty() {
            return None;
        }
        let fetched = async {
            self.client
                .get(url)
                .timeout(Duration::from_secs(ARTICLE_TIMEOUT_SECS))
                .send()
                .await?
                .error_for_status()?
                .text()
                .await
        };
        match fetched.await {
            Ok(html) => match extract_article(&html) {
                Ok(article) => Some(article),
                Err(err) => {
                    logw(format!("Error parsing article {url}: {err}"));
                    None
                }
            },
            Err(err) => {
                logw(format!("Error getting article content from {url}: {err}"));
                None
            }
        }
    }
}

/// Parses `.athing` rows and their detail rows. Article content and the
/// scrape timestamp are left empty.
pub fn parse_front_page(html: &str, base: &Url, limit: usize) -> Result<Vec<Story>> {
    let doc = Html::parse_document(html);
    let athing = selector(".athing")?;
    let title_link = selector(".titleline > a")?;
    let score = selector(".score")?;
    let user = selector(".hnuser")?;
    let item_link = selector("a[href*='item']")?;

    let mut stories = Vec::new();
    for row in doc.select(&athing).take(limit) {
        let Some(anchor) = row.select(&title_link).next() else {
            continue;
        };
        let title = element_text(anchor);
        let href = anchor.value().attr("href").unwrap_or_default();
        let link = absolutize(base, href);

        let Some(details) = next_row(row) else {
            continue;
        };

        let points = details
            .select(&score)
            .next()
            .map(element_text)
            .and_then(|t| t.split_whitespace().next().map(str::to_string))
            .unwrap_or_else(|| "0".to_string());
        let author = details
            .select(&user)
            .next()
            .map(element_text)
            .unwrap_or_else(|| "unknown".to_string());
        let comments = details
            .select(&item_link)
            .map(element_text)
            .find(|t| t.contains("comment"))
            .and_then(|t| t.split_whitespace().next().map(str::to_string))
            .unwrap_or_else(|| "0".to_string());

        stories.push(Story {
            id: row.value().attr("id").unwrap_or_default().to_string(),
            title,
            link,
            points,
            author,
            comments,
            article_content: None,
            scraped_at: String::new(),
        });
    }

    Ok(stories)
}

fn next_row(row: ElementRef<'_>) -> Option<ElementRef<'_>> {
    row.next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "tr")
}

fn absolutize(base: &Url, href: &str) -> String {
    if href.is_empty() || href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Page title, meta description and the paragraphs of the first recognised
/// content container (falling back to the whole body text).
pub fn extract_article(html: &str) -> Result<ArticleContent> {
    let doc = Html::parse_document(html);

    let title = doc
        .select(&selector("title")?)
        .next()
        .map(|t| element_text(t).trim().to_string())
        .filter(|t| !t.is_empty());

    let description = doc
        .select(&selector(r#"meta[name="description"]"#)?)
        .next()
        .and_then(|m| m.value().attr("content"))
        .map(str::to_string);

    let paragraph = selector("p")?;
    let mut content = None;
    for css in CONTENT_SELECTORS {
        let container = selector(css)?;
        if let Some(el) = doc.select(&container).next() {
            let paragraphs: Vec<String> = el
                .select(&paragraph)
                .map(|p| element_text(p).trim().to_string())
                .filter(|p| !p.is_empty())
                .collect();
            if !paragraphs.is_empty() {
                content = Some(paragraphs.join("\n\n"));
                break;
            }
        }
    }

    if content.is_none() {
        content = doc
            .select(&selector("body")?)
            .next()
            .map(|b| element_text(b).trim().to_string())
            .filter(|b| !b.is_empty());
    }

    Ok(ArticleContent {
        title,
        description,
        content: content.map(|c| c.chars().take(ARTICLE_CONTENT_CHARS).collect()),
    })
}
