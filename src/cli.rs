use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::{Args, Parser, Subcommand};
use shorts_pipeline::api::serper::TimeWindow;
use shorts_pipeline::api::youtube::{PrivacyStatus, VideoMetadata, default_tags};
use shorts_pipeline::config::{Config, DEFAULT_CONFIG_PATH};
use shorts_pipeline::generator::{self, Generator, RunOutput};
use shorts_pipeline::narration::clean_script_file;
use shorts_pipeline::tts::KokoroClient;
use shorts_pipeline::upload::{VideoPublisher, YouTubePublisher};
use shorts_pipeline::init;

#[derive(Debug, Parser)]
#[command(name = "shorts-cli", author, version, about)]
struct Cli {
    /// Path to the JSON config file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Scrape the Hacker News front page into the tech data file.
    ScrapeTech {
        #[arg(long, default_value_t = generator::TECH_STORY_LIMIT)]
        limit: usize,
    },
    /// Scrape quotes into the quotes data file.
    ScrapeQuotes,
    /// Search trending topics and print a summary.
    Trending {
        /// d1 (past day) or d2 (past two days); random when omitted.
        #[arg(long, value_parser = parse_window)]
        window: Option<TimeWindow>,
    },
    /// Tech news script from stored (or freshly scraped) stories.
    Tech(GenerateArgs),
    /// Stoic quote script.
    Stoic(GenerateArgs),
    /// Script about the most viral stored trending topic.
    TrendingScript(GenerateArgs),
    /// Research a topic, then script it.
    Research {
        #[arg(long)]
        prompt: String,

        #[command(flatten)]
        args: GenerateArgs,
    },
    /// Extract narrator lines from a raw script.
    Clean {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
    /// Narrate a script file into a WAV.
    Audio {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
    Upload(UploadArgs),
    /// Discard the stored token and run the consent flow.
    Auth,
}

#[derive(Debug, Args)]
struct GenerateArgs {
    /// Stop after the cleaned script.
    #[arg(long)]
    no_audio: bool,
}

/// Upload a finished video to YouTube.
#[derive(Debug, Args)]
struct UploadArgs {
    #[arg(long)]
    file: PathBuf,

    #[arg(long, default_value = "Untitled Video")]
    title: String,

    #[arg(long, default_value = "")]
    description: String,

    /// Comma separated.
    #[arg(long, value_delimiter = ',')]
    tags: Vec<String>,

    #[arg(long, default_value = shorts_pipeline::api::youtube::DEFAULT_CATEGORY_ID)]
    category: String,

    #[arg(long, default_value = "unlisted")]
    privacy: PrivacyStatus,
}

fn parse_window(code: &str) -> Result<TimeWindow, String> {
    TimeWindow::parse(code).ok_or_else(|| format!("expected d1 or d2, got {code}"))
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

    let cli = Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    let cfg = Config::load(&cli.config).await.context("load config")?;
    init::ensure_directories(&cfg).await?;

    match cli.command {
        Command::ScrapeTech { limit } => {
            let stories = generator::scrape_tech(&cfg, limit).await?;
            println!("Scraped {} stories", stories.len());
        }
        Command::ScrapeQuotes => {
            let quotes = generator::scrape_quotes(&cfg).await?;
            println!("Scraped {} quotes", quotes.len());
        }
        Command::Trending { window } => {
            let client = reqwest::Client::new();
            let items = generator::collect_trending(&cfg, &client, window).await?;
            println!("{}", generator::topic_summary(&items));
        }
        Command::Tech(args) => {
            let generator = Generator::from_config(cfg, !args.no_audio)?;
            report(generator.run_tech().await.context("tech pipeline")?);
        }
        Command::Stoic(args) => {
            let generator = Generator::from_config(cfg, !args.no_audio)?;
            report(generator.run_stoic().await.context("stoic pipeline")?);
        }
        Command::TrendingScript(args) => {
            let generator = Generator::from_config(cfg, !args.no_audio)?;
            report(generator.run_trending().await.context("trending pipeline")?);
        }
        Command::Research { prompt, args } => {
            let generator = Generator::from_config(cfg, !args.no_audio)?;
            report(
                generator
                    .run_research(&prompt)
                    .await
                    .context("research pipeline")?,
            );
        }
        Command::Clean { input, output } => {
            let clean = clean_script_file(&input, &output).await;
            if clean.is_empty() {
                anyhow::bail!("no narration extracted from {}", input.display());
            }
            println!("{clean}");
        }
        Command::Audio { input, output } => {
            let speech = KokoroClient::from_config(reqwest::Client::new(), &cfg);
            let samples = generator::voice_file(&speech, &input, &output, cfg.sample_rate).await?;
            println!("Wrote {} ({samples} samples)", output.display());
        }
        Command::Upload(args) => {
            let publisher = YouTubePublisher::from_config(reqwest::Client::new(), &cfg);
            let meta = VideoMetadata {
                tags: if args.tags.is_empty() {
                    default_tags()
                } else {
                    args.tags
                },
                category_id: args.category,
                privacy: args.privacy,
                ..VideoMetadata::new(args.title, args.description)
            };
            let video = publisher.publish(&args.file, &meta).await.context("upload")?;
            println!("Video uploaded successfully! URL: {}", video.video_url);
        }
        Command::Auth => {
            let publisher = YouTubePublisher::from_config(reqwest::Client::new(), &cfg);
            publisher.reauthenticate().await.context("authenticate")?;
            println!(
                "Authentication successful; token saved to {}",
                cfg.token_file.display()
            );
        }
    }

    Ok(())
}

fn report(output: RunOutput) {
    println!("Script: {}", output.script.display());
    println!("Clean script: {}", output.clean_script.display());
    match output.voiceover {
        Some(path) => println!("Voiceover: {}", path.display()),
        None => println!("Voiceover: skipped"),
    }
}
