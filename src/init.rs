use crate::config::Config;
use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::fs;
use tracing_subscriber::EnvFilter;

pub fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("build log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("initialize tracing subscriber: {err}"))?;

    Ok(())
}

fn required_dirs(cfg: &Config) -> Vec<PathBuf> {
    vec![
        cfg.output_root.clone(),
        cfg.data_root.join("quotes"),
        cfg.data_root.join("tech"),
        cfg.data_root.join("trending"),
        cfg.upload_folder.clone(),
    ]
}

pub async fn ensure_directories(cfg: &Config) -> Result<()> {
    for dir in required_dirs(cfg) {
        if !fs::try_exists(&dir).await.unwrap_or(false) {
            fs::create_dir_all(&dir)
                .await
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            tracing::info!("Created directory: {}", dir.display());
        }
    }
    Ok(())
}
