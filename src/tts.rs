use crate::config::Config;
use crate::error::PipelineError;
use crate::logw;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

/// Longest chunk handed to the synthesizer in one request.
pub const MAX_CHUNK_CHARS: usize = 400;

/// Converts one chunk of text into mono samples in `[-1.0, 1.0]`.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<f32>>;
}

/// Kokoro served behind an OpenAI-compatible `/v1/audio/speech` endpoint,
/// asked for raw 16-bit little-endian PCM.
pub struct KokoroClient {
    client: Client,
    url: String,
    model: String,
    voice: String,
    lang_code: String,
}

impl KokoroClient {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            model: "kokoro".to_string(),
            voice: "af_heart".to_string(),
            lang_code: "a".to_string(),
        }
    }

    pub fn from_config(client: Client, cfg: &Config) -> Self {
        Self {
            model: cfg.tts_model.clone(),
            lang_code: cfg.tts_lang_code.clone(),
            ..Self::new(client, &cfg.tts_url).with_voice(&cfg.tts_voice)
        }
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }
}

#[async_trait]
impl SpeechSynthesizer for KokoroClient {
    async fn synthesize(&self, text: &str) -> Result<Vec<f32>> {
        let body = json!({
            "model": self.model,
            "input": text,
            "voice": self.voice,
            "lang_code": self.lang_code,
            "response_format": "pcm",
            "stream": false,
        });

        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .timeout(Duration::from_secs(300))
            .send()
            .await
            .context("TTS request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let raw = resp.text().await.unwrap_or_default();
            logw(format!("TTS failed HTTP {}", status.as_u16()));
            return Err(PipelineError::Http {
                service: "TTS",
                status: status.as_u16(),
                body: raw.chars().take(400).collect(),
            }
            .into());
        }

        let bytes = resp.bytes().await.context("TTS response read failed")?;
        Ok(pcm16le_to_f32(&bytes))
    }
}

pub fn pcm16le_to_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32_768.0)
        .collect()
}

/// Packs whole sentences into chunks of at most `max_chars` characters.
/// A single sentence longer than the limit is split on word boundaries.
pub fn split_into_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for sentence in sentences(text) {
        for piece in fit_words(&sentence, max_chars) {
            let extra = if current.is_empty() { 0 } else { 1 };
            if !current.is_empty() && current.chars().count() + extra + piece.chars().count() > max_chars {
                chunks.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&piece);
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn sentences(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\n' {
            flush_sentence(&mut out, &mut current);
            continue;
        }
        current.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().is_none_or(|n| n.is_whitespace()) {
            flush_sentence(&mut out, &mut current);
        }
    }
    flush_sentence(&mut out, &mut current);
    out
}

fn flush_sentence(out: &mut Vec<String>, current: &mut String) {
    let sentence = current.split_whitespace().collect::<Vec<_>>().join(" ");
    if !sentence.is_empty() {
        out.push(sentence);
    }
    current.clear();
}

fn fit_words(sentence: &str, max_chars: usize) -> Vec<String> {
    if sentence.chars().count() <= max_chars {
        return vec![sentence.to_string()];
    }
    let mut pieces = Vec::new();
    let mut current = String::new();
    for word in sentence.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > max_chars {
            pieces.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}
