use crate::{logok, logw};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tokio::fs;

/// A search or news result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapedItem {
    pub title: String,
    pub snippet: String,
    pub link: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoteRecord {
    pub quote: String,
    pub author: String,
    pub source: String,
    pub date_scraped: String,
}

/// Anything that is identified by the URL it was scraped from.
pub trait Linked {
    fn link(&self) -> &str;
}

impl Linked for ScrapedItem {
    fn link(&self) -> &str {
        &self.link
    }
}

/// Drops later items whose link was already seen, keeping first-seen order.
pub fn dedup_by_link<T: Linked>(items: Vec<T>) -> Vec<T> {
    let mut seen: HashSet<String> = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.link().to_string()))
        .collect()
}

pub async fn save_items<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create dir {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(items).context("Failed to serialize items")?;
    fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    logok(format!("Saved {} items to {}", items.len(), path.display()));
    Ok(())
}

/// Missing, empty or malformed files all load as an empty list.
pub async fn load_items<T: DeserializeOwned>(path: &Path) -> Vec<T> {
    let text = match fs::read_to_string(path).await {
        Ok(text) => text,
        Err(err) => {
            logw(format!("Error loading {}: {}", path.display(), err));
            return Vec::new();
        }
    };
    if text.trim().is_empty() {
        logw(format!("{} is empty", path.display()));
        return Vec::new();
    }
    match serde_json::from_str::<Vec<T>>(&text) {
        Ok(items) => items,
        Err(err) => {
            logw(format!("Error parsing {}: {}", path.display(), err));
            Vec::new()
        }
    }
}

pub async fn load_items_limited<T: DeserializeOwned>(path: &Path, limit: usize) -> Vec<T> {
    let mut items = load_items(path).await;
    items.truncate(limit);
    items
}

/// True when `path` exists and holds at least one byte.
pub async fn has_data(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}
