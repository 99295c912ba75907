use crate::error::PipelineError;
use crate::logi;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

pub const DEFAULT_CONFIG_PATH: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,

    pub serper_api_key: String,
    pub serper_url: String,

    pub tts_url: String,
    pub tts_model: String,
    pub tts_voice: String,
    pub tts_lang_code: String,
    pub sample_rate: u32,

    pub client_secrets_file: PathBuf,
    pub token_file: PathBuf,
    pub oauth_redirect_port: u16,
    pub youtube_base_url: String,

    pub upload_folder: PathBuf,
    pub web_bind: String,
    pub web_port: u16,

    pub hacker_news_url: String,
    pub quotes_url: String,
    pub quotes_author: String,
    pub scrape_delay_ms: u64,

    pub output_root: PathBuf,
    pub data_root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini_api_key: String::new(),
            gemini_model: "gemini-2.0-flash".to_string(),
            gemini_base_url: "https://generativelanguage.googleapis.com".to_string(),
            serper_api_key: String::new(),
            serper_url: "https://google.serper.dev/search".to_string(),
            tts_url: "http://localhost:8880/v1/audio/speech".to_string(),
            tts_model: "kokoro".to_string(),
            tts_voice: "af_heart".to_string(),
            tts_lang_code: "a".to_string(),
            sample_rate: crate::audio::SAMPLE_RATE,
            client_secrets_file: PathBuf::from("client_secret.json"),
            token_file: PathBuf::from("token.json"),
            oauth_redirect_port: 8090,
            youtube_base_url: "https://www.googleapis.com".to_string(),
            upload_folder: PathBuf::from("uploads"),
            web_bind: "0.0.0.0".to_string(),
            web_port: 5000,
            hacker_news_url: "https://news.ycombinator.com/".to_string(),
            quotes_url: "https://www.goodreads.com/author/quotes/17212.Marcus_Aurelius".to_string(),
            quotes_author: "Marcus Aurelius".to_string(),
            scrape_delay_ms: 1_000,
            output_root: PathBuf::from("output"),
            data_root: PathBuf::from("data"),
        }
    }
}

impl Config {
    /// Reads `path` if present, otherwise starts from defaults. Secrets left
    /// empty in the file are taken from the environment.
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut config = match fs::read_to_string(path).await {
            Ok(content) => serde_json::from_str::<Config>(&content)
                .with_context(|| format!("Failed to parse config: {}", path.display()))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                logi(format!("No config at {}; using defaults", path.display()));
                Config::default()
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("Failed to read config: {}", path.display()));
            }
        };
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if self.gemini_api_key.is_empty() {
            if let Ok(key) = std::env::var("GEMINI_API_KEY") {
                self.gemini_api_key = key;
            }
        }
        if self.serper_api_key.is_empty() {
            if let Ok(key) = std::env::var("SERPER_API_KEY") {
                self.serper_api_key = key;
            }
        }
    }

    pub fn require_gemini_key(&self) -> Result<&str, PipelineError> {
        if self.gemini_api_key.is_empty() {
            return Err(PipelineError::MissingApiKey("gemini_api_key"));
        }
        Ok(&self.gemini_api_key)
    }

    pub fn require_serper_key(&self) -> Result<&str, PipelineError> {
        if self.serper_api_key.is_empty() {
            return Err(PipelineError::MissingApiKey("serper_api_key"));
        }
        Ok(&self.serper_api_key)
    }

    pub fn tech_stories_path(&self) -> PathBuf {
        self.data_root.join("tech").join("hacker_news_stories.json")
    }

    pub fn quotes_path(&self) -> PathBuf {
        self.data_root.join("quotes").join("marcus_aurelius_quotes.json")
    }

    pub fn trending_path(&self) -> PathBuf {
        self.data_root.join("trending").join("trending_topics.json")
    }
}
