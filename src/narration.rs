//! Narrator dialogue extraction.
//!
//! Generated scripts mix spoken lines with production notes:
//!
//! ```text
//! **[Visual: city skyline]**
//!
//! **Narrator:** Ever wondered why the sky is blue?
//!
//! **Narrator:** It comes down to scattering.
//! ```
//!
//! Only the text following the narrator label is kept for the voice track.

use crate::{logi, logok, logw};
use std::path::Path;
use tokio::fs;

pub const NARRATOR_LABEL: &str = "**Narrator:**";

#[derive(Debug, Clone)]
pub struct NarratorExtractor {
    label: String,
}

impl Default for NarratorExtractor {
    fn default() -> Self {
        Self::new(NARRATOR_LABEL)
    }
}

impl NarratorExtractor {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    /// Returns every narrator segment joined by single spaces, or an empty
    /// string when the script carries no label at all.
    pub fn extract(&self, script: &str) -> String {
        let mut segments = self.labelled_segments(script);
        if segments.is_empty() {
            segments = self.labelled_lines(script);
        }
        segments.retain(|s| !s.is_empty());
        segments.join(" ").trim().to_string()
    }

    /// A segment starts after `label` plus one space and runs to the first
    /// blank line, the next `\n**` marker, or end of input.
    fn labelled_segments(&self, script: &str) -> Vec<String> {
        let opener = format!("{} ", self.label);
        let mut out = Vec::new();
        let mut pos = 0;

        while let Some(rel) = script[pos..].find(&opener) {
            let start = pos + rel + opener.len();
            let rest = &script[start..];
            let end = [rest.find("\n\n"), rest.find("\n**")]
                .into_iter()
                .flatten()
                .min()
                .unwrap_or(rest.len());
            out.push(rest[..end].trim().to_string());
            pos = start + end;
        }

        out
    }

    fn labelled_lines(&self, script: &str) -> Vec<String> {
        script
            .lines()
            .filter_map(|line| {
                line.rsplit_once(self.label.as_str())
                    .map(|(_, dialogue)| dialogue.trim().to_string())
            })
            .collect()
    }
}

pub fn extract_narrator_lines(script: &str) -> String {
    NarratorExtractor::default().extract(script)
}

/// Text to hand to the synthesizer. Scripts generated without speaker labels
/// are already narrator-only, so they are spoken as-is.
pub fn narration_for_audio(script: &str) -> String {
    let clean = extract_narrator_lines(script);
    if clean.is_empty() {
        logw("No narrator labels found; using the script text unchanged.");
        return script.trim().to_string();
    }
    clean
}

/// Reads a raw script, writes the narrator-only version next to it and
/// returns it. A script without narrator labels produces an empty file.
/// Failures are logged and yield an empty string.
pub async fn clean_script_file(input: &Path, output: &Path) -> String {
    let script = match fs::read_to_string(input).await {
        Ok(text) => text,
        Err(err) => {
            logw(format!("Error cleaning script {}: {}", input.display(), err));
            return String::new();
        }
    };

    let clean = extract_narrator_lines(&script);
    if clean.is_empty() {
        logw(format!("No narrator lines found in {}", input.display()));
    }

    if let Some(parent) = output.parent() {
        if let Err(err) = fs::create_dir_all(parent).await {
            logw(format!("Error creating {}: {}", parent.display(), err));
            return String::new();
        }
    }
    if let Err(err) = fs::write(output, clean.as_bytes()).await {
        logw(format!("Error writing clean script {}: {}", output.display(), err));
        return String::new();
    }

    logok(format!("Script cleaned for audio: {}", output.display()));
    logi(format!("Clean script: {} chars", clean.len()));
    clean
}
