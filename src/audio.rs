use crate::error::PipelineError;
use crate::tts::{MAX_CHUNK_CHARS, SpeechSynthesizer, split_into_chunks};
use crate::{logi, logok};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub const SAMPLE_RATE: u32 = 24_000;

/// Synthesized chunks in speaking order.
#[derive(Debug, Default, Clone)]
pub struct AudioBuffer {
    chunks: Vec<Vec<f32>>,
}

impl AudioBuffer {
    pub fn push(&mut self, chunk: Vec<f32>) {
        self.chunks.push(chunk);
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn concat(&self) -> Vec<f32> {
        self.chunks.iter().flatten().copied().collect()
    }
}

/// Writes 16-bit PCM mono.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create dir {}", parent.display()))?;
        }
    }

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for &s in samples {
        let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
        writer.write_sample(v)?;
    }
    writer.finalize().context("Failed to finalize WAV")?;
    Ok(())
}

/// Speaks `text` chunk by chunk and writes the concatenated result. Returns
/// the number of samples written.
pub async fn synthesize_to_wav(
    synth: &dyn SpeechSynthesizer,
    text: &str,
    out_path: &Path,
    sample_rate: u32,
) -> Result<usize> {
    let chunks = split_into_chunks(text, MAX_CHUNK_CHARS);
    if chunks.is_empty() {
        return Err(PipelineError::EmptyScript.into());
    }

    let mut buffer = AudioBuffer::default();
    for (i, chunk) in chunks.iter().enumerate() {
        logi(format!("Processing chunk {} ({} chars)", i, chunk.chars().count()));
        let samples = synth
            .synthesize(chunk)
            .await
            .with_context(|| format!("TTS failed on chunk {i}"))?;
        buffer.push(samples);
    }

    let combined = buffer.concat();
    let path: PathBuf = out_path.to_path_buf();
    let total = combined.len();
    tokio::task::spawn_blocking(move || write_wav(&path, &combined, sample_rate))
        .await
        .context("WAV writer task panicked")??;

    logok(format!(
        "Audio saved to {} ({:.1}s from {} chunks)",
        out_path.display(),
        total as f64 / sample_rate as f64,
        buffer.chunk_count()
    ));
    Ok(total)
}
