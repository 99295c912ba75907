use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Parser;
use shorts_pipeline::config::{Config, DEFAULT_CONFIG_PATH};
use shorts_pipeline::init;
use shorts_pipeline::upload::YouTubePublisher;
use shorts_pipeline::web::{self, AppState};

/// Local web interface for authenticating with YouTube and uploading videos.
#[derive(Debug, Parser)]
#[command(name = "shorts-studio", author, version, about)]
struct Args {
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Overrides `web_bind` from the config.
    #[arg(long)]
    bind: Option<String>,

    /// Overrides `web_port` from the config.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn try_main() -> Result<()> {
    init::init_tracing().context("init logging")?;
    let args = Args::parse();

    let cfg = Config::load(&args.config).await.context("load config")?;
    init::ensure_directories(&cfg).await?;

    let bind = args.bind.unwrap_or_else(|| cfg.web_bind.clone());
    let port = args.port.unwrap_or(cfg.web_port);
    let addr: SocketAddr = format!("{bind}:{port}")
        .parse()
        .with_context(|| format!("invalid bind address {bind}:{port}"))?;

    let client = reqwest::Client::builder()
        .build()
        .context("build HTTP client")?;
    let publisher = Arc::new(YouTubePublisher::from_config(client, &cfg));
    let app = web::router(AppState::new(publisher, cfg.upload_folder.clone()));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    tracing::info!(%addr, "shorts-studio listening");
    axum::serve(listener, app).await.context("serve")?;
    Ok(())
}
