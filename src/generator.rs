use crate::api::gemini::{GeminiClient, TextGenerator};
use crate::api::serper::{SerperClient, TimeWindow};
use crate::audio::synthesize_to_wav;
use crate::config::Config;
use crate::narration::{clean_script_file, narration_for_audio};
use crate::scrape::{self, HackerNewsScraper, QuoteScraper, Story};
use crate::script::{self, ContentDomain, OutputLayout};
use crate::topics::{self, QuoteRecord, ScrapedItem, dedup_by_link};
use crate::tts::{KokoroClient, SpeechSynthesizer};
use crate::{logi, logok, logw};
use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use rand::seq::SliceRandom;
use reqwest::Client;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const TECH_STORY_LIMIT: usize = 5;
pub const TRENDING_TOPIC_LIMIT: usize = 5;
const SEARCH_RESULTS_PER_QUERY: u32 = 5;

pub const TRENDING_QUERIES: &[&str] = &[
    "trending news today",
    "viral stories now",
    "trending topics social media",
    "what's happening today",
    "breaking news today",
];

/// Files produced by one end-to-end run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    pub script: PathBuf,
    pub clean_script: PathBuf,
    pub voiceover: Option<PathBuf>,
}

pub struct Generator {
    cfg: Config,
    client: Client,
    text: Arc<dyn TextGenerator>,
    speech: Option<Arc<dyn SpeechSynthesizer>>,
    date: NaiveDate,
}

impl Generator {
    pub fn new(
        cfg: Config,
        client: Client,
        text: Arc<dyn TextGenerator>,
        speech: Option<Arc<dyn SpeechSynthesizer>>,
        date: NaiveDate,
    ) -> Self {
        Self {
            cfg,
            client,
            text,
            speech,
            date,
        }
    }

    /// Gemini for text, Kokoro for speech unless `with_audio` is false.
    pub fn from_config(cfg: Config, with_audio: bool) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .build()
            .context("Failed to build HTTP client")?;
        let text: Arc<dyn TextGenerator> = Arc::new(GeminiClient::from_config(client.clone(), &cfg)?);
        let speech: Option<Arc<dyn SpeechSynthesizer>> = if with_audio {
            Some(Arc::new(KokoroClient::from_config(client.clone(), &cfg)))
        } else {
            None
        };
        Ok(Self::new(cfg, client, text, speech, Local::now().date_naive()))
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    fn layout(&self, domain: ContentDomain) -> OutputLayout {
        OutputLayout::new(&self.cfg.output_root, domain, self.date)
    }

    pub async fn run_tech(&self) -> Result<RunOutput> {
        let stories_path = self.cfg.tech_stories_path();
        if !topics::has_data(&stories_path).await {
            logi("No stored stories. Running Hacker News scraper...");
            scrape_tech(&self.cfg, TECH_STORY_LIMIT).await?;
        }

        let stories: Vec<Story> = topics::load_items_limited(&stories_path, TECH_STORY_LIMIT).await;
        if stories.is_empty() {
            bail!("No news items found in {}", stories_path.display());
        }

        let raw = self.text.generate(&script::tech_news_prompt(&stories)).await?;
        self.finish(ContentDomain::Tech, &raw).await
    }

    pub async fn run_stoic(&self) -> Result<RunOutput> {
        let quotes_path = self.cfg.quotes_path();
        if !topics::has_data(&quotes_path).await {
            logi("No quotes found. Running scraper...");
            scrape_quotes(&self.cfg).await?;
        } else {
            logi("Quotes file already exists. Skipping scraping.");
        }

        let quotes: Vec<QuoteRecord> = topics::load_items(&quotes_path).await;
        let selected = quotes
            .choose(&mut rand::thread_rng())
            .with_context(|| format!("No quotes found in {}", quotes_path.display()))?;
        logi(format!("Selected quote: {} - {}", selected.quote, selected.author));

        let raw = self.text.generate(&script::stoic_quote_prompt(selected)).await?;
        self.finish(ContentDomain::Stoic, &raw).await
    }

    /// Scripts the stored trending topics, querying fresh ones if the store
    /// is missing or holds an empty list.
    pub async fn run_trending(&self) -> Result<RunOutput> {
        let topics_path = self.cfg.trending_path();
        let mut items: Vec<ScrapedItem> =
            topics::load_items_limited(&topics_path, TRENDING_TOPIC_LIMIT).await;
        if items.is_empty() {
            logi("No stored trending topics. Querying Serper...");
            items = collect_trending(&self.cfg, &self.client, None).await?;
            items.truncate(TRENDING_TOPIC_LIMIT);
        }
        if items.is_empty() {
            bail!("No trending topics found in {}", topics_path.display());
        }

        let raw = self.text.generate(&script::trending_prompt(&items)).await?;
        self.finish(ContentDomain::Trending, &raw).await
    }

    pub async fn run_research(&self, topic: &str) -> Result<RunOutput> {
        let topic = topic.trim();
        if topic.is_empty() {
            bail!("Research topic is empty");
        }

        let layout = self.layout(ContentDomain::Research);
        logi(format!("Researching: {topic}"));
        let research = self.text.generate(topic).await?;
        script::write_text(&layout.research(), &research).await?;

        logi("Generating script from research...");
        let raw = self
            .text
            .generate(&script::short_form_script_prompt(&research))
            .await?;
        self.finish(ContentDomain::Research, &raw).await
    }

    async fn finish(&self, domain: ContentDomain, raw_script: &str) -> Result<RunOutput> {
        let layout = self.layout(domain);
        let script_path = script::write_text(&layout.script(), raw_script).await?;

        let clean_path = layout.clean_script();
        let clean = clean_script_file(&script_path, &clean_path).await;
        let spoken = if clean.is_empty() {
            // Unlabelled scripts are narration already.
            narration_for_audio(raw_script)
        } else {
            clean
        };
        if spoken.is_empty() {
            bail!("Cleaning produced no narration for {}", script_path.display());
        }

        let voiceover = match &self.speech {
            Some(speech) => {
                let out = layout.voiceover();
                synthesize_to_wav(speech.as_ref(), &spoken, &out, self.cfg.sample_rate).await?;
                Some(out)
            }
            None => {
                logi("Audio generation skipped.");
                None
            }
        };

        logok(format!("Content generation complete: {}", layout.dir().display()));
        Ok(RunOutput {
            script: script_path,
            clean_script: clean_path,
            voiceover,
        })
    }
}

pub async fn scrape_tech(cfg: &Config, limit: usize) -> Result<Vec<Story>> {
    let scraper = HackerNewsScraper::new(scrape::scraping_client()?, &cfg.hacker_news_url)
        .with_delay(Duration::from_millis(cfg.scrape_delay_ms));
    logi(format!("Scraping top {limit} stories from Hacker News..."));
    let stories = scraper.get_top_stories(limit).await;
    if stories.is_empty() {
        logw("Failed to scrape any stories");
        return Ok(stories);
    }
    topics::save_items(&cfg.tech_stories_path(), &stories).await?;
    Ok(stories)
}

pub async fn scrape_quotes(cfg: &Config) -> Result<Vec<QuoteRecord>> {
    let scraper = QuoteScraper::new(scrape::scraping_client()?, &cfg.quotes_url, &cfg.quotes_author);
    Ok(scraper.scrape_to(&cfg.quotes_path()).await)
}

/// Runs every trending query, dedups by link and persists a non-empty result.
pub async fn collect_trending(
    cfg: &Config,
    client: &Client,
    window: Option<TimeWindow>,
) -> Result<Vec<ScrapedItem>> {
    let serper = SerperClient::from_config(client.clone(), cfg)?;
    let window = window.unwrap_or_else(|| TimeWindow::random(&mut rand::thread_rng()));

    let mut all = Vec::new();
    for query in TRENDING_QUERIES {
        logi(format!("Searching for: {} (past {} days)", query, window.days()));
        all.extend(
            serper
                .trending_topics(query, window, SEARCH_RESULTS_PER_QUERY)
                .await?,
        );
    }

    let unique = dedup_by_link(all);
    if unique.is_empty() {
        logw("No trending topics found");
        return Ok(unique);
    }
    logok(format!("Found {} unique trending topics", unique.len()));
    topics::save_items(&cfg.trending_path(), &unique).await?;
    Ok(unique)
}

pub fn topic_summary(items: &[ScrapedItem]) -> String {
    let mut out = String::new();
    for (i, topic) in items.iter().enumerate() {
        let source = if topic.source.is_empty() { "Unknown" } else { topic.source.as_str() };
        let _ = writeln!(out, "\n{}. {}", i + 1, topic.title);
        let _ = writeln!(out, "   {}", topic.snippet);
        let _ = writeln!(out, "   Source: {source}");
        let _ = writeln!(out, "   Link: {}", topic.link);
        if let Some(date) = &topic.date {
            let _ = writeln!(out, "   Date: {date}");
        }
    }
    out
}

/// Standalone narration stage: script file (raw or cleaned) to WAV.
pub async fn voice_file(
    speech: &dyn SpeechSynthesizer,
    input: &Path,
    output: &Path,
    sample_rate: u32,
) -> Result<usize> {
    let text = tokio::fs::read_to_string(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;
    synthesize_to_wav(speech, &narration_for_audio(&text), output, sample_rate).await
}
