//! Command-line entry: parse arguments, load config, run the conversion.

use anyhow::{bail, Context, Result};
use clap::Parser;
use srt_extract::api::ApiTranscriber;
use srt_extract::config::AppConfig;
use srt_extract::scanner::{self, JobOptions};
use srt_extract::{JsonFileTranscriber, Transcriber, TranscriptionError};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Transcribe video or audio files into SRT subtitles.
#[derive(Parser, Debug)]
#[command(name = "srt-extract", version, about, long_about = None)]
struct Cli {
    /// Input video/audio file (e.g. .mp4, .wav), or a directory to scan
    input: PathBuf,

    /// Transcription model name sent to the API (e.g. whisper-1, small, large-v3)
    #[arg(short, long)]
    model: Option<String>,

    /// Force language code (e.g. en, es); auto-detected when omitted
    #[arg(short, long)]
    language: Option<String>,

    /// Maximum words per SRT caption chunk [default: 10]
    #[arg(short = 'w', long, value_parser = clap::value_parser!(u32).range(1..))]
    max_words: Option<u32>,

    /// Output .srt path (default: <input>.<model>.srt)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Read segments from a Whisper JSON dump instead of calling the API
    #[arg(long, value_name = "PATH")]
    segments_json: Option<PathBuf>,

    /// Transcription endpoint URL
    #[arg(long)]
    api_url: Option<String>,

    /// Config file (default: platform config dir)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Re-transcribe files that already have subtitles (directory input)
    #[arg(long)]
    force: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    let model = cli.model.unwrap_or(config.model);
    let options = JobOptions {
        model: model.clone(),
        language: cli.language.or(config.language),
        max_words: cli.max_words.map_or(config.max_words, |w| w as usize),
        output: cli.output,
        force: cli.force,
    };

    let transcriber: Box<dyn Transcriber> = match cli.segments_json {
        Some(dump) => Box::new(JsonFileTranscriber::new(dump)),
        None if config.api_key.trim().is_empty() => bail!(TranscriptionError::MissingApiKey),
        None => Box::new(ApiTranscriber::new(
            config.api_key,
            cli.api_url.unwrap_or(config.api_url),
            model,
            Duration::from_secs(config.timeout_secs),
        )),
    };

    let summary = scanner::run(&cli.input, transcriber.as_ref(), &options).await?;
    info!(
        written = summary.written.len(),
        skipped = summary.skipped,
        "all done"
    );
    Ok(())
}
